//! Core types used throughout the Ember engine

use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for anything that occupies the combat world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new random entity ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an entity ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first group is plenty to tell combatants apart in logs
        let simple = self.0.simple().to_string();
        write!(f, "{}", &simple[..8])
    }
}

/// Position and facing of an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform at `position` whose forward vector points along `direction`.
    ///
    /// A zero direction keeps the default facing.
    pub fn facing(position: Vec3, direction: Vec3) -> Self {
        let mut transform = Self::from_position(position);
        transform.face(direction);
        transform
    }

    /// Get the forward direction (negative Z in local space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get the right direction (positive X in local space)
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Translate by the given offset
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Turn to face along `direction`. Degenerate directions are ignored.
    pub fn face(&mut self, direction: Vec3) {
        let Some(dir) = direction.try_normalize() else {
            return;
        };
        self.rotation = Quat::from_rotation_arc(-Vec3::Z, dir);
    }

    /// Turn to face a target position
    pub fn look_at(&mut self, target: Vec3) {
        self.face(target - self.position);
    }

    /// Distance between this transform and a point
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_forward_is_negative_z() {
        let transform = Transform::default();
        assert!((transform.forward() - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_facing_points_forward_along_direction() {
        let transform = Transform::facing(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0));
        assert!((transform.forward() - Vec3::X).length() < 1e-5);

        let behind = Transform::facing(Vec3::ZERO, Vec3::Z);
        assert!((behind.forward() - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_face_ignores_zero_direction() {
        let mut transform = Transform::facing(Vec3::ZERO, Vec3::X);
        transform.face(Vec3::ZERO);
        assert!((transform.forward() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_look_at() {
        let mut transform = Transform::from_position(Vec3::new(1.0, 0.0, 1.0));
        transform.look_at(Vec3::new(1.0, 0.0, 5.0));
        assert!((transform.forward() - Vec3::Z).length() < 1e-5);
        assert_eq!(transform.distance_to(Vec3::new(1.0, 0.0, 5.0)), 4.0);
    }

    #[test]
    fn test_entity_ids_are_unique() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 8);
    }
}
