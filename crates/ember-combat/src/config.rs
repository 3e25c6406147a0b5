//! Combat tunables

use ember_physics::SpatialConfig;
use serde::{Deserialize, Serialize};

use crate::ultimate::GaugeConfig;

/// Numbers shared by every skill. Defaults match the shipped balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Search radius around a just-hit target when chaining melee hits
    pub chain_radius: f32,
    /// Damage multiplier applied per chain link
    pub chain_falloff: f32,
    /// Tick interval for damage/heal over time when a skill sets none
    pub default_tick_interval: f32,
    /// Per-level growth of timed effect magnitudes
    pub effect_level_scaling: f32,
    /// Per-level growth of flat heals
    pub heal_level_scaling: f32,
    /// Per-caster-level growth of summoned creature stats
    pub summon_level_scaling: f32,
    /// `k` in `defense / (defense + k)`
    pub mitigation_constant: f32,
    /// Raw damage multiplier on a critical hit
    pub crit_multiplier: f32,
    /// Share of a dual heal that goes to MP
    pub mp_heal_fraction: f32,
    /// Collision radius given to summoned creatures
    pub summon_body_radius: f32,
    /// Undrained events kept before the oldest are shed (0 = unbounded)
    pub event_capacity: usize,
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
    /// Scene index layout
    pub spatial: SpatialConfig,
    /// Gauge given to characters that equip an ultimate without one
    pub gauge: GaugeConfig,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            chain_radius: 5.0,
            chain_falloff: 0.8,
            default_tick_interval: 1.0,
            effect_level_scaling: 0.15,
            heal_level_scaling: 0.2,
            summon_level_scaling: 0.1,
            mitigation_constant: 100.0,
            crit_multiplier: 2.0,
            mp_heal_fraction: 0.5,
            summon_body_radius: 0.5,
            event_capacity: 10_000,
            seed: None,
            spatial: SpatialConfig::default(),
            gauge: GaugeConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: CombatConfig = toml::from_str("chain_radius = 7.5\nseed = 42\n").unwrap();
        assert_eq!(config.chain_radius, 7.5);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.chain_falloff, 0.8);
        assert_eq!(config.mitigation_constant, 100.0);
        assert_eq!(config.spatial.cell_size, 8.0);
        assert_eq!(config.gauge.max, 100.0);
        assert_eq!(config.event_capacity, 10_000);
    }
}
