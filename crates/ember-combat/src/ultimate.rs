//! Ultimate gauge and transformation overlay

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::skill::SkillInstanceId;
use crate::stats::{CharacterStats, ModifierSource, StatModifier, StatSnapshot};

/// Gauge capacity and gain rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeConfig {
    pub max: f32,
    pub per_hit: f32,
    pub per_kill: f32,
    /// Gauge gained per point of damage received
    pub damage_ratio: f32,
    /// Gauge lost per second (0 = no decay)
    pub decay_per_second: f32,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            max: 100.0,
            per_hit: 2.0,
            per_kill: 10.0,
            damage_ratio: 0.5,
            decay_per_second: 0.0,
        }
    }
}

/// One character's ultimate resource
#[derive(Debug, Clone, PartialEq)]
pub struct UltimateGauge {
    pub config: GaugeConfig,
    current: f32,
}

impl UltimateGauge {
    pub fn new(config: GaugeConfig) -> Self {
        Self { config, current: 0.0 }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.config.max
    }

    /// Fill as a 0.0-1.0 fraction
    pub fn fraction(&self) -> f32 {
        if self.config.max <= 0.0 {
            return 0.0;
        }
        (self.current / self.config.max).clamp(0.0, 1.0)
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.config.max
    }

    /// Add gauge, clamped to `[0, max]`
    pub fn add(&mut self, amount: f32) {
        self.current = (self.current + amount).clamp(0.0, self.config.max.max(0.0));
    }

    pub fn on_hit(&mut self) {
        self.add(self.config.per_hit);
    }

    pub fn on_kill(&mut self) {
        self.add(self.config.per_kill);
    }

    pub fn on_damage_received(&mut self, damage: f32) {
        self.add(damage.max(0.0) * self.config.damage_ratio);
    }

    pub fn decay(&mut self, dt: f32) {
        if self.config.decay_per_second > 0.0 {
            self.add(-self.config.decay_per_second * dt);
        }
    }

    pub fn can_afford(&self, cost: f32) -> bool {
        self.current >= cost
    }

    /// Spend `cost`. Returns false and leaves the gauge untouched if it is short.
    pub fn drain(&mut self, cost: f32) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.current = (self.current - cost.max(0.0)).max(0.0);
        true
    }

    /// Empty the gauge. Returns what was in it.
    pub fn drain_all(&mut self) -> f32 {
        std::mem::take(&mut self.current)
    }
}

/// Stat overlay applied while transformed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationParams {
    /// Seconds
    pub duration: f32,
    #[serde(default)]
    pub modifiers: Vec<StatModifier>,
}

/// An active transformation on one character
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    pub skill: SkillInstanceId,
    /// Stats before the overlay
    pub snapshot: StatSnapshot,
    pub duration: f32,
    pub remaining: f32,
}

impl Transformation {
    /// Snapshot `stats` and apply the overlay
    pub fn begin(stats: &mut CharacterStats, skill: SkillInstanceId, params: &TransformationParams) -> Self {
        let snapshot = stats.snapshot();
        stats.apply_modifiers(ModifierSource::Transformation(skill), params.modifiers.iter().copied());
        Self {
            skill,
            snapshot,
            duration: params.duration,
            remaining: params.duration,
        }
    }

    /// Count down. Returns true once expired.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.remaining -= dt;
        self.remaining <= 0.0
    }

    /// Remove the overlay. Returns whether the stats match the snapshot
    /// afterwards; they differ when other effects changed during the
    /// transformation.
    pub fn end(&self, stats: &mut CharacterStats) -> bool {
        stats.remove_source(ModifierSource::Transformation(self.skill));
        let restored = stats.snapshot() == self.snapshot;
        if !restored {
            debug!(
                "Stats after transformation {:?} differ from snapshot {:?}",
                stats.snapshot(),
                self.snapshot
            );
        }
        restored
    }
}
