//! Timed effects: buffs, debuffs, and damage/heal over time
//!
//! Each skill instance owns one tracker. A tracker holds at most one effect
//! per target; reapplying replaces the previous one. Stat changes go through
//! the target's modifier stack under the skill's [`ModifierSource`], so
//! expiry and dispel restore the stat exactly.

use std::collections::HashMap;

use ember_core::EntityId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combatant::CombatWorld;
use crate::config::CombatConfig;
use crate::damage::level_scale;
use crate::skill::SkillInstanceId;
use crate::stats::{Condition, ModifierSource, Stat, StatModifier};

/// Shortest pulse interval a periodic effect runs at; shorter ones are raised to it
pub const MIN_TICK_INTERVAL: f32 = 0.05;

/// What a timed effect does while active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Raise a stat by the magnitude
    Buff(Stat),
    /// Lower a stat by the magnitude
    Debuff(Stat),
    Stun,
    Silence,
    Blind,
    /// Lose the magnitude in HP over the duration
    DamageOverTime,
    /// Regain the magnitude in HP over the duration
    HealOverTime,
}

impl EffectKind {
    /// Whether this kind pulses on a tick interval
    pub fn is_periodic(self) -> bool {
        matches!(self, Self::DamageOverTime | Self::HealOverTime)
    }

    /// The condition this kind attaches, if any
    pub fn condition(self) -> Option<Condition> {
        match self {
            Self::Stun => Some(Condition::Stunned),
            Self::Silence => Some(Condition::Silenced),
            Self::Blind => Some(Condition::Blinded),
            _ => None,
        }
    }

    /// The stat modifier this kind contributes at `magnitude`, if any
    pub fn modifier(self, magnitude: f32) -> Option<StatModifier> {
        match self {
            Self::Buff(stat) => Some(StatModifier::additive(stat, magnitude)),
            Self::Debuff(stat) => Some(StatModifier::additive(stat, -magnitude)),
            _ => None,
        }
    }
}

/// Skill-defined parameters of a timed effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub kind: EffectKind,
    /// Magnitude at level 1 (stat delta, or total HP over the duration)
    #[serde(default)]
    pub base_value: f32,
    /// Seconds
    pub duration: f32,
    /// Seconds between pulses for periodic kinds (default from config)
    #[serde(default)]
    pub tick_interval: Option<f32>,
}

/// A timed effect currently held by one target
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEffect {
    pub kind: EffectKind,
    pub magnitude: f32,
    pub duration: f32,
    pub remaining: f32,
    /// Who applied the effect
    pub source: EntityId,
    /// Pulse interval for periodic kinds
    pub tick_interval: Option<f32>,
    /// Time until the next pulse
    pub tick_countdown: f32,
    pub ticks_total: u32,
    pub ticks_done: u32,
}

impl TimedEffect {
    /// HP delta of one pulse (positive heals, negative damages)
    pub fn per_tick(&self) -> f32 {
        let share = self.magnitude / self.ticks_total.max(1) as f32;
        match self.kind {
            EffectKind::DamageOverTime => -share,
            _ => share,
        }
    }
}

/// One HP change produced by a periodic effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectPulse {
    pub source: EntityId,
    pub target: EntityId,
    pub kind: EffectKind,
    /// Positive heals, negative damages
    pub amount: f32,
}

/// What happened during one tracker tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectTickReport {
    pub pulses: Vec<EffectPulse>,
    pub expired: Vec<(EntityId, EffectKind)>,
}

/// Timed effects applied by one skill instance, keyed by target
#[derive(Debug, Clone)]
pub struct EffectTracker {
    skill: SkillInstanceId,
    effects: HashMap<EntityId, TimedEffect>,
}

impl EffectTracker {
    pub fn new(skill: SkillInstanceId) -> Self {
        Self {
            skill,
            effects: HashMap::new(),
        }
    }

    fn modifier_source(&self) -> ModifierSource {
        ModifierSource::Effect(self.skill)
    }

    /// Apply `spec` at `level` to `target`, replacing any effect this tracker
    /// already holds on it. Returns the magnitude, or `None` if the target is
    /// not in the world.
    pub fn apply(
        &mut self,
        world: &mut CombatWorld,
        source: EntityId,
        target: EntityId,
        spec: &EffectSpec,
        level: u32,
        config: &CombatConfig,
    ) -> Option<f32> {
        let modifier_source = self.modifier_source();
        let stats = world.stats_mut(target)?;

        if self.effects.remove(&target).is_some() {
            stats.remove_source(modifier_source);
        }

        let magnitude = spec.base_value * level_scale(level, config.effect_level_scaling);
        if let Some(modifier) = spec.kind.modifier(magnitude) {
            stats.apply_modifiers(modifier_source, [modifier]);
        }
        if let Some(condition) = spec.kind.condition() {
            stats.add_condition(modifier_source, condition);
        }

        let duration = spec.duration.max(0.0);
        let (tick_interval, ticks_total) = if spec.kind.is_periodic() {
            let interval = spec
                .tick_interval
                .filter(|i| *i > 0.0)
                .unwrap_or(config.default_tick_interval)
                .max(MIN_TICK_INTERVAL);
            let ticks = ((duration / interval).round() as u32).max(1);
            (Some(interval), ticks)
        } else {
            (None, 0)
        };

        self.effects.insert(
            target,
            TimedEffect {
                kind: spec.kind,
                magnitude,
                duration,
                remaining: duration,
                source,
                tick_interval,
                tick_countdown: tick_interval.unwrap_or(0.0),
                ticks_total,
                ticks_done: 0,
            },
        );
        debug!("{:?} x{:.2} applied to {} for {:.1}s", spec.kind, magnitude, target, duration);
        Some(magnitude)
    }

    /// Advance every effect by `dt`. Periodic effects emit their pulses and
    /// expired effects are reversed and removed. Effects whose target left
    /// the world are dropped without a report.
    pub fn tick(&mut self, dt: f32, world: &mut CombatWorld) -> EffectTickReport {
        let mut report = EffectTickReport::default();
        let modifier_source = self.modifier_source();

        let mut targets: Vec<EntityId> = self.effects.keys().copied().collect();
        targets.sort();

        for target in targets {
            if !world.contains(target) {
                self.effects.remove(&target);
                continue;
            }
            let Some(effect) = self.effects.get_mut(&target) else {
                continue;
            };

            effect.remaining -= dt;
            if let Some(interval) = effect.tick_interval {
                effect.tick_countdown -= dt;
                while effect.tick_countdown <= 0.0 && effect.ticks_done < effect.ticks_total {
                    report.pulses.push(pulse(effect, target));
                    effect.ticks_done += 1;
                    effect.tick_countdown += interval;
                }
            }

            if effect.remaining <= 0.0 {
                // Outstanding pulses land before expiry so totals stay exact
                while effect.ticks_done < effect.ticks_total {
                    report.pulses.push(pulse(effect, target));
                    effect.ticks_done += 1;
                }
                let kind = effect.kind;
                self.effects.remove(&target);
                if let Some(stats) = world.stats_mut(target) {
                    stats.remove_source(modifier_source);
                }
                report.expired.push((target, kind));
            }
        }

        report
    }

    /// Remove the effect on `target` early (dispel). Outstanding pulses are
    /// discarded. Returns false if there was none.
    pub fn remove(&mut self, target: EntityId, world: &mut CombatWorld) -> bool {
        if self.effects.remove(&target).is_none() {
            return false;
        }
        if let Some(stats) = world.stats_mut(target) {
            stats.remove_source(self.modifier_source());
        }
        true
    }

    /// Remove every effect, reversing their contributions
    pub fn clear(&mut self, world: &mut CombatWorld) {
        let source = self.modifier_source();
        for (target, _) in self.effects.drain() {
            if let Some(stats) = world.stats_mut(target) {
                stats.remove_source(source);
            }
        }
    }

    pub fn get(&self, target: EntityId) -> Option<&TimedEffect> {
        self.effects.get(&target)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

fn pulse(effect: &TimedEffect, target: EntityId) -> EffectPulse {
    EffectPulse {
        source: effect.source,
        target,
        kind: effect.kind,
        amount: effect.per_tick(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::Combatant;
    use crate::stats::BaseStats;
    use glam::Vec3;

    fn setup() -> (CombatWorld, EntityId, EntityId) {
        let mut world = CombatWorld::new();
        let caster = world.spawn(Combatant::player("Cleric", Vec3::ZERO, BaseStats::default()));
        let target = world.spawn(Combatant::player("Knight", Vec3::X, BaseStats::default()));
        (world, caster, target)
    }

    fn spec(kind: EffectKind, base_value: f32, duration: f32) -> EffectSpec {
        EffectSpec {
            kind,
            base_value,
            duration,
            tick_interval: None,
        }
    }

    #[test]
    fn test_reapply_does_not_stack() {
        let (mut world, caster, target) = setup();
        let config = CombatConfig::default();
        let mut tracker = EffectTracker::new(SkillInstanceId(1));
        let baseline = world.get(target).unwrap().stats.attack_power();

        let buff = spec(EffectKind::Buff(Stat::AttackPower), 10.0, 5.0);
        tracker.apply(&mut world, caster, target, &buff, 1, &config);
        let magnitude = tracker.apply(&mut world, caster, target, &buff, 3, &config).unwrap();

        assert!((magnitude - 13.0).abs() < 1e-4);
        assert_eq!(world.get(target).unwrap().stats.attack_power(), baseline + magnitude);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_expiry_restores_exactly() {
        let (mut world, caster, target) = setup();
        let config = CombatConfig::default();
        let mut tracker = EffectTracker::new(SkillInstanceId(1));
        let baseline = world.get(target).unwrap().stats.defense();

        let debuff = spec(EffectKind::Debuff(Stat::Defense), 3.7, 2.0);
        tracker.apply(&mut world, caster, target, &debuff, 4, &config);
        assert!(world.get(target).unwrap().stats.defense() < baseline);

        let report = tracker.tick(1.0, &mut world);
        assert!(report.expired.is_empty());
        let report = tracker.tick(1.0, &mut world);
        assert_eq!(report.expired, vec![(target, debuff.kind)]);
        assert_eq!(world.get(target).unwrap().stats.defense(), baseline);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_hot_pulses_evenly() {
        let (mut world, caster, target) = setup();
        let config = CombatConfig::default();
        let mut tracker = EffectTracker::new(SkillInstanceId(1));

        let hot = EffectSpec {
            tick_interval: Some(1.0),
            ..spec(EffectKind::HealOverTime, 100.0, 10.0)
        };
        tracker.apply(&mut world, caster, target, &hot, 1, &config);

        let mut total = 0.0;
        for tick in 0..10 {
            let report = tracker.tick(1.0, &mut world);
            assert_eq!(report.pulses.len(), 1, "tick {tick}");
            assert_eq!(report.pulses[0].amount, 10.0);
            total += report.pulses[0].amount;
        }
        assert_eq!(total, 100.0);
        assert!(tracker.is_empty());
        assert!(tracker.tick(1.0, &mut world).pulses.is_empty());
    }

    #[test]
    fn test_expiry_flushes_missed_pulses() {
        let (mut world, caster, target) = setup();
        let config = CombatConfig::default();
        let mut tracker = EffectTracker::new(SkillInstanceId(1));

        let dot = spec(EffectKind::DamageOverTime, 30.0, 3.0);
        tracker.apply(&mut world, caster, target, &dot, 1, &config);

        let mut total = 0.0;
        for _ in 0..31 {
            let report = tracker.tick(0.1, &mut world);
            total += report.pulses.iter().map(|p| p.amount).sum::<f32>();
        }
        assert!((total + 30.0).abs() < 1e-4);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_tiny_interval_is_raised_to_floor() {
        let (mut world, caster, target) = setup();
        let config = CombatConfig::default();
        let mut tracker = EffectTracker::new(SkillInstanceId(1));

        let dot = EffectSpec {
            tick_interval: Some(1e-6),
            ..spec(EffectKind::DamageOverTime, 20.0, 2.0)
        };
        tracker.apply(&mut world, caster, target, &dot, 1, &config);
        let effect = tracker.get(target).unwrap();
        assert_eq!(effect.tick_interval, Some(MIN_TICK_INTERVAL));
        assert_eq!(effect.ticks_total, 40);

        let report = tracker.tick(5.0, &mut world);
        assert_eq!(report.pulses.len(), 40);
        let total: f32 = report.pulses.iter().map(|p| p.amount).sum();
        assert!((total + 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_conditions_and_dispel() {
        let (mut world, caster, target) = setup();
        let config = CombatConfig::default();
        let mut tracker = EffectTracker::new(SkillInstanceId(9));

        tracker.apply(&mut world, caster, target, &spec(EffectKind::Stun, 0.0, 3.0), 1, &config);
        assert!(world.get(target).unwrap().stats.has_condition(Condition::Stunned));

        assert!(tracker.remove(target, &mut world));
        assert!(!world.get(target).unwrap().stats.has_condition(Condition::Stunned));
        assert!(!tracker.remove(target, &mut world));
    }

    #[test]
    fn test_trackers_are_isolated() {
        let (mut world, caster, target) = setup();
        let config = CombatConfig::default();
        let mut first = EffectTracker::new(SkillInstanceId(1));
        let mut second = EffectTracker::new(SkillInstanceId(2));
        let baseline = world.get(target).unwrap().stats.attack_power();

        let buff = spec(EffectKind::Buff(Stat::AttackPower), 5.0, 5.0);
        first.apply(&mut world, caster, target, &buff, 1, &config);
        second.apply(&mut world, caster, target, &buff, 1, &config);
        assert_eq!(world.get(target).unwrap().stats.attack_power(), baseline + 10.0);

        first.clear(&mut world);
        assert_eq!(world.get(target).unwrap().stats.attack_power(), baseline + 5.0);
    }

    #[test]
    fn test_departed_targets_are_dropped() {
        let (mut world, caster, target) = setup();
        let config = CombatConfig::default();
        let mut tracker = EffectTracker::new(SkillInstanceId(1));

        tracker.apply(&mut world, caster, target, &spec(EffectKind::HealOverTime, 10.0, 5.0), 1, &config);
        world.despawn(target);
        let report = tracker.tick(1.0, &mut world);
        assert!(report.pulses.is_empty());
        assert!(report.expired.is_empty());
        assert!(tracker.is_empty());
    }
}
