//! Ember Combat - skill execution and combat resolution
//!
//! Turns a skill activation into a timed cast, resolved targets, damage and
//! heal magnitudes, timed status effects, projectiles, summoned creatures and
//! gauge-gated ultimates. Everything advances through [`CombatEngine::tick`].

pub mod cast;
pub mod catalog;
pub mod combatant;
pub mod config;
pub mod damage;
pub mod effects;
pub mod engine;
pub mod error;
pub mod events;
pub mod execute;
pub mod projectile;
pub mod skill;
pub mod state;
pub mod stats;
pub mod summon;
pub mod targeting;
pub mod ultimate;

pub use cast::{CastState, SkillTarget, UseOutcome};
pub use catalog::SkillCatalog;
pub use combatant::{CombatWorld, Combatant, EntityTag, Side};
pub use config::CombatConfig;
pub use damage::{AttackerProfile, DamageParams, DamageRoll, HealKind};
pub use effects::{EffectKind, EffectSpec, EffectTracker, TimedEffect};
pub use engine::CombatEngine;
pub use error::{CatalogError, SkillError};
pub use events::{CombatEvent, DespawnReason, ProjectileEnd};
pub use projectile::{Projectile, ProjectileId};
pub use skill::{
    AoeParams, BuffParams, Cooldown, DebuffParams, HealParams, MeleeParams, PassiveModifier,
    PassiveParams, ProjectileParams, SkillDefinition, SkillId, SkillInstance, SkillInstanceId,
    SkillKind, SkillVariant, SummonParams, UltimateParams,
};
pub use state::CombatState;
pub use stats::{BaseStats, CharacterStats, Condition, ModifierOp, ModifierSource, Stat, StatModifier, StatSnapshot};
pub use summon::{SummonBehavior, SummonRoster, SummonedCreature};
pub use ultimate::{GaugeConfig, Transformation, TransformationParams, UltimateGauge};
