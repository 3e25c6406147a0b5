//! Error types for skill activation and catalog loading

use ember_core::EntityId;

use crate::skill::{SkillId, SkillInstanceId};
use crate::stats::Condition;

/// Why a skill could not be used. Every variant is a precondition failure:
/// nothing was consumed and the caller may retry later.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkillError {
    #[error("skill instance {0} does not exist")]
    UnknownSkill(SkillInstanceId),

    #[error("caster {0} is not in the world")]
    CasterMissing(EntityId),

    #[error("caster is dead")]
    CasterDead,

    #[error("caster is {0}")]
    Incapacitated(Condition),

    #[error("passive skills cannot be activated")]
    Passive,

    #[error("already casting")]
    AlreadyCasting,

    #[error("on cooldown for another {remaining:.2}s")]
    OnCooldown { remaining: f32 },

    #[error("needs {required} mana, has {available}")]
    InsufficientMana { required: f32, available: f32 },

    #[error("needs {required} gauge, has {available}")]
    InsufficientGauge { required: f32, available: f32 },

    #[error("no valid target")]
    NoTarget,
}

/// Errors raised while loading a skill catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read skill catalog {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to parse skill catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate skill id {0}")]
    DuplicateId(SkillId),

    #[error("skill {id} ({name}) is invalid: {reason}")]
    Invalid {
        id: SkillId,
        name: String,
        reason: String,
    },
}
