//! Fire-and-forget notifications for visual and audio hooks

use ember_core::EntityId;
use glam::Vec3;
use serde::Serialize;

use crate::effects::EffectKind;
use crate::projectile::ProjectileId;
use crate::skill::{SkillId, SkillInstanceId};

/// Why a summoned creature left the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DespawnReason {
    Killed,
    Expired,
    /// Pushed out by a newer summon at the cap
    Evicted,
    /// The summoning skill was unequipped
    Unequipped,
}

/// Why a projectile stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileEnd {
    /// Pierce budget used up
    Spent,
    OutOfRange,
}

/// Something observable happened in combat
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    CastStarted {
        caster: EntityId,
        skill: SkillId,
        instance: SkillInstanceId,
        duration: f32,
    },
    CastCancelled {
        caster: EntityId,
        instance: SkillInstanceId,
    },
    CastInterrupted {
        caster: EntityId,
        instance: SkillInstanceId,
        reason: String,
    },
    SkillExecuted {
        caster: EntityId,
        skill: SkillId,
        instance: SkillInstanceId,
        level: u32,
    },
    Damaged {
        attacker: Option<EntityId>,
        target: EntityId,
        amount: f32,
        is_crit: bool,
    },
    Healed {
        target: EntityId,
        hp: f32,
        mp: f32,
    },
    Killed {
        killer: Option<EntityId>,
        target: EntityId,
    },
    EffectApplied {
        source: EntityId,
        target: EntityId,
        kind: EffectKind,
        magnitude: f32,
        duration: f32,
    },
    EffectExpired {
        target: EntityId,
        kind: EffectKind,
    },
    ProjectileLaunched {
        projectile: ProjectileId,
        owner: EntityId,
        position: Vec3,
        direction: Vec3,
    },
    ProjectileImpact {
        projectile: ProjectileId,
        target: EntityId,
        position: Vec3,
    },
    ProjectileDestroyed {
        projectile: ProjectileId,
        position: Vec3,
        reason: ProjectileEnd,
    },
    Summoned {
        owner: EntityId,
        creature: EntityId,
        name: String,
    },
    SummonDespawned {
        owner: EntityId,
        creature: EntityId,
        reason: DespawnReason,
    },
    UltimateActivated {
        caster: EntityId,
        gauge_spent: f32,
    },
    TransformationStarted {
        caster: EntityId,
        duration: f32,
    },
    TransformationEnded {
        caster: EntityId,
        early: bool,
    },
}

impl CombatEvent {
    /// Short event name for logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::CastStarted { .. } => "cast_started",
            Self::CastCancelled { .. } => "cast_cancelled",
            Self::CastInterrupted { .. } => "cast_interrupted",
            Self::SkillExecuted { .. } => "skill_executed",
            Self::Damaged { .. } => "damaged",
            Self::Healed { .. } => "healed",
            Self::Killed { .. } => "killed",
            Self::EffectApplied { .. } => "effect_applied",
            Self::EffectExpired { .. } => "effect_expired",
            Self::ProjectileLaunched { .. } => "projectile_launched",
            Self::ProjectileImpact { .. } => "projectile_impact",
            Self::ProjectileDestroyed { .. } => "projectile_destroyed",
            Self::Summoned { .. } => "summoned",
            Self::SummonDespawned { .. } => "summon_despawned",
            Self::UltimateActivated { .. } => "ultimate_activated",
            Self::TransformationStarted { .. } => "transformation_started",
            Self::TransformationEnded { .. } => "transformation_ended",
        }
    }
}
