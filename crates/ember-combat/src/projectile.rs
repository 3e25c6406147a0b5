//! Projectile flight: homing, pierce budget, and range
//!
//! A projectile carries a snapshot of its caster's offensive stats, so hits
//! still resolve after the caster dies or leaves the world.

use std::collections::HashSet;
use std::fmt;

use ember_core::EntityId;
use glam::Vec3;
use serde::Serialize;

use crate::combatant::Side;
use crate::damage::{AttackerProfile, DamageParams};
use crate::skill::{ProjectileParams, SkillId};

/// Identifier of a live projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ProjectileId(pub u64);

impl fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projectile-{}", self.0)
    }
}

/// A projectile in flight
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: ProjectileId,
    pub skill: SkillId,
    pub owner: EntityId,
    /// Owner's side at launch
    pub side: Side,
    pub attacker: AttackerProfile,
    pub damage: DamageParams,
    pub level_scale: f32,
    pub position: Vec3,
    /// Unit heading
    pub direction: Vec3,
    pub speed: f32,
    pub traveled: f32,
    pub max_range: f32,
    pub collision_radius: f32,
    pub pierce: bool,
    /// Hits left before the projectile is destroyed
    pub hits_remaining: u32,
    pub homing_target: Option<EntityId>,
    pub homing_strength: f32,
    hit: HashSet<EntityId>,
}

/// Everything a projectile needs from its caster at launch
#[derive(Debug, Clone, Copy)]
pub struct LaunchInfo {
    pub id: ProjectileId,
    pub skill: SkillId,
    pub owner: EntityId,
    pub side: Side,
    pub attacker: AttackerProfile,
    pub level_scale: f32,
    pub origin: Vec3,
    /// Fallback heading when the aim point is degenerate
    pub forward: Vec3,
}

impl Projectile {
    /// Spawn a projectile aimed at `aim` (or along the caster's forward)
    pub fn launch(info: LaunchInfo, params: &ProjectileParams, aim: Option<Vec3>, homing_target: Option<EntityId>) -> Self {
        let direction = aim
            .and_then(|point| (point - info.origin).try_normalize())
            .or_else(|| info.forward.try_normalize())
            .unwrap_or(Vec3::NEG_Z);
        Self {
            id: info.id,
            skill: info.skill,
            owner: info.owner,
            side: info.side,
            attacker: info.attacker,
            damage: params.damage.clone(),
            level_scale: info.level_scale,
            position: info.origin,
            direction,
            speed: params.speed,
            traveled: 0.0,
            max_range: params.range,
            collision_radius: params.collision_radius,
            pierce: params.pierce,
            hits_remaining: if params.pierce { params.pierce_count.max(1) } else { 1 },
            homing_target: if params.homing { homing_target } else { None },
            homing_strength: params.homing_strength,
            hit: HashSet::new(),
        }
    }

    /// Blend the heading toward a live target
    pub fn steer(&mut self, target_position: Vec3, dt: f32) {
        let Some(to_target) = (target_position - self.position).try_normalize() else {
            return;
        };
        let blend = (self.homing_strength * dt).clamp(0.0, 1.0);
        let blended = self.direction + (to_target - self.direction) * blend;
        if let Some(direction) = blended.try_normalize() {
            self.direction = direction;
        }
    }

    /// Move forward one step. Returns the swept segment.
    pub fn advance(&mut self, dt: f32) -> (Vec3, Vec3) {
        let start = self.position;
        let step = self.speed * dt;
        self.position += self.direction * step;
        self.traveled += step;
        (start, self.position)
    }

    /// Whether `target` was already hit by this projectile
    pub fn has_hit(&self, target: EntityId) -> bool {
        self.hit.contains(&target)
    }

    /// Record a hit. Returns true when the projectile is spent.
    pub fn register_hit(&mut self, target: EntityId) -> bool {
        if !self.hit.insert(target) {
            return self.hits_remaining == 0;
        }
        self.hits_remaining = self.hits_remaining.saturating_sub(1);
        self.hits_remaining == 0
    }

    pub fn hit_count(&self) -> usize {
        self.hit.len()
    }

    pub fn out_of_range(&self) -> bool {
        self.traveled > self.max_range
    }
}
