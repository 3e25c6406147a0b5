//! Query shapes and narrow-phase overlap tests

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A collision body tracked by the scene index: a sphere around the entity's position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Vec3,
    pub radius: f32,
}

impl Body {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self {
            position,
            radius: radius.max(0.0),
        }
    }
}

/// Region of space that a query selects bodies from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Everything touching a ball
    Sphere { center: Vec3, radius: f32 },
    /// Everything in front of `apex` within `range`, at most `half_angle` radians off `forward`.
    /// A body's radius extends the reach but not the opening: its center must
    /// lie inside the angle.
    Cone {
        apex: Vec3,
        forward: Vec3,
        range: f32,
        half_angle: f32,
    },
    /// A swept sphere between two points (used for moving projectiles)
    Capsule { start: Vec3, end: Vec3, radius: f32 },
}

impl Shape {
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::Sphere { center, radius }
    }

    /// Cone from an apex; `angle` is the full opening angle in degrees
    pub fn cone(apex: Vec3, forward: Vec3, range: f32, angle_degrees: f32) -> Self {
        Self::Cone {
            apex,
            forward: forward.normalize_or_zero(),
            range,
            half_angle: (angle_degrees * 0.5).to_radians(),
        }
    }

    pub fn capsule(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self::Capsule { start, end, radius }
    }

    /// Point that query results are ordered by distance from
    pub fn origin(&self) -> Vec3 {
        match *self {
            Self::Sphere { center, .. } => center,
            Self::Cone { apex, .. } => apex,
            Self::Capsule { start, .. } => start,
        }
    }

    /// Axis-aligned bounds (min, max) of the shape
    pub fn bounds(&self) -> (Vec3, Vec3) {
        match *self {
            Self::Sphere { center, radius } => (center - Vec3::splat(radius), center + Vec3::splat(radius)),
            Self::Cone { apex, range, .. } => (apex - Vec3::splat(range), apex + Vec3::splat(range)),
            Self::Capsule { start, end, radius } => (
                start.min(end) - Vec3::splat(radius),
                start.max(end) + Vec3::splat(radius),
            ),
        }
    }

    /// Narrow-phase test against a single body
    pub fn overlaps(&self, body: &Body) -> bool {
        match *self {
            Self::Sphere { center, radius } => center.distance(body.position) <= radius + body.radius,
            Self::Cone {
                apex,
                forward,
                range,
                half_angle,
            } => {
                let offset = body.position - apex;
                let distance = offset.length();
                if distance > range + body.radius {
                    return false;
                }
                if distance <= f32::EPSILON || half_angle >= std::f32::consts::PI {
                    return true;
                }
                if forward == Vec3::ZERO {
                    return false;
                }
                let cos = (offset / distance).dot(forward).clamp(-1.0, 1.0);
                cos >= half_angle.cos()
            }
            Self::Capsule { start, end, radius } => {
                distance_to_segment(body.position, start, end) <= radius + body.radius
            }
        }
    }
}

/// Shortest distance from `point` to the segment `a`-`b`
pub fn distance_to_segment(point: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_counts_body_radius() {
        let shape = Shape::sphere(Vec3::ZERO, 2.0);
        assert!(shape.overlaps(&Body::new(Vec3::new(2.4, 0.0, 0.0), 0.5)));
        assert!(!shape.overlaps(&Body::new(Vec3::new(2.6, 0.0, 0.0), 0.5)));
    }

    #[test]
    fn test_cone_angle_and_range() {
        // 90 degree cone looking down +X, 5 units long
        let shape = Shape::cone(Vec3::ZERO, Vec3::X, 5.0, 90.0);
        assert!(shape.overlaps(&Body::new(Vec3::new(3.0, 0.0, 1.0), 0.0)));
        // 60 degrees off axis: outside the 45 degree half angle
        assert!(!shape.overlaps(&Body::new(Vec3::new(1.0, 0.0, 1.8), 0.0)));
        // Behind the apex
        assert!(!shape.overlaps(&Body::new(Vec3::new(-2.0, 0.0, 0.0), 0.0)));
        // Too far
        assert!(!shape.overlaps(&Body::new(Vec3::new(6.0, 0.0, 0.0), 0.0)));
    }

    #[test]
    fn test_cone_pads_reach_but_not_angle() {
        let shape = Shape::cone(Vec3::ZERO, Vec3::X, 5.0, 90.0);
        // Center past the range, surface inside it
        assert!(shape.overlaps(&Body::new(Vec3::new(5.4, 0.0, 0.0), 0.5)));
        // Center 50 degrees off axis; the surface pokes inside 45 but the center decides
        let off_axis = Vec3::new(50f32.to_radians().cos(), 0.0, 50f32.to_radians().sin()) * 3.0;
        assert!(!shape.overlaps(&Body::new(off_axis, 1.0)));
    }

    #[test]
    fn test_capsule_catches_bodies_along_the_path() {
        let shape = Shape::capsule(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 0.25);
        assert!(shape.overlaps(&Body::new(Vec3::new(5.0, 0.0, 0.5), 0.5)));
        assert!(!shape.overlaps(&Body::new(Vec3::new(12.0, 0.0, 0.0), 0.5)));
    }

    #[test]
    fn test_degenerate_segment() {
        let d = distance_to_segment(Vec3::new(0.0, 3.0, 4.0), Vec3::ZERO, Vec3::ZERO);
        assert_eq!(d, 5.0);
    }
}
