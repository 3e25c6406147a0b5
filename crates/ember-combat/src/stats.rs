//! Character stats and the per-stat modifier stack
//!
//! Base values never change while effects run. Buffs, debuffs, passives and
//! transformations each contribute tagged modifiers, and effective values are
//! recomputed from base + active modifiers on every read. Removing a source
//! therefore restores the previous value exactly, no matter how many other
//! sources are active.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::skill::SkillInstanceId;

/// A stat the combat engine reads or modifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    AttackPower,
    Defense,
    CritRate,
    MaxHp,
    MaxMp,
    Strength,
    Energy,
    Agility,
}

impl Stat {
    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Self::AttackPower => "Attack Power",
            Self::Defense => "Defense",
            Self::CritRate => "Crit Rate",
            Self::MaxHp => "Max HP",
            Self::MaxMp => "Max MP",
            Self::Strength => "Strength",
            Self::Energy => "Energy",
            Self::Agility => "Agility",
        }
    }
}

/// How a modifier combines with the base value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierOp {
    /// Added to the base before multipliers
    Additive,
    /// Multiplies the summed value
    Multiplicative,
}

/// Who contributed a modifier. A source owns at most one set of modifiers per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModifierSource {
    /// A timed effect applied by a skill instance
    Effect(SkillInstanceId),
    /// An ultimate's transformation overlay
    Transformation(SkillInstanceId),
    /// A passive skill held by the character
    Passive(SkillInstanceId),
}

/// A single contribution to one stat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: Stat,
    pub op: ModifierOp,
    pub amount: f32,
}

impl StatModifier {
    pub fn additive(stat: Stat, amount: f32) -> Self {
        Self {
            stat,
            op: ModifierOp::Additive,
            amount,
        }
    }

    pub fn multiplicative(stat: Stat, factor: f32) -> Self {
        Self {
            stat,
            op: ModifierOp::Multiplicative,
            amount: factor,
        }
    }
}

/// Non-numeric debuffs that gate other systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Cannot act, move, or cast
    Stunned,
    /// Cannot use skills
    Silenced,
    /// Attacks miss
    Blinded,
}

impl Condition {
    pub fn name(self) -> &'static str {
        match self {
            Self::Stunned => "stunned",
            Self::Silenced => "silenced",
            Self::Blinded => "blinded",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unmodified stat values for a character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseStats {
    pub attack_power: f32,
    pub defense: f32,
    /// Critical hit chance (0.0 - 1.0)
    pub crit_rate: f32,
    pub max_hp: f32,
    pub max_mp: f32,
    pub strength: f32,
    pub energy: f32,
    pub agility: f32,
}

impl Default for BaseStats {
    fn default() -> Self {
        Self {
            attack_power: 10.0,
            defense: 5.0,
            crit_rate: 0.05,
            max_hp: 100.0,
            max_mp: 100.0,
            strength: 10.0,
            energy: 10.0,
            agility: 10.0,
        }
    }
}

impl BaseStats {
    pub fn get(&self, stat: Stat) -> f32 {
        match stat {
            Stat::AttackPower => self.attack_power,
            Stat::Defense => self.defense,
            Stat::CritRate => self.crit_rate,
            Stat::MaxHp => self.max_hp,
            Stat::MaxMp => self.max_mp,
            Stat::Strength => self.strength,
            Stat::Energy => self.energy,
            Stat::Agility => self.agility,
        }
    }
}

/// The stats a transformation captures before applying its overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatSnapshot {
    pub attack_power: f32,
    pub defense: f32,
    pub crit_rate: f32,
}

/// Combat stats for a character: base values, resources, and active modifiers
#[derive(Debug, Clone)]
pub struct CharacterStats {
    pub base: BaseStats,
    current_hp: f32,
    current_mp: f32,
    modifiers: Vec<(ModifierSource, StatModifier)>,
    conditions: Vec<(ModifierSource, Condition)>,
}

impl Default for CharacterStats {
    fn default() -> Self {
        Self::new(BaseStats::default())
    }
}

impl CharacterStats {
    /// Create stats with full HP and MP
    pub fn new(base: BaseStats) -> Self {
        Self {
            current_hp: base.max_hp,
            current_mp: base.max_mp,
            base,
            modifiers: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Effective value of a stat: `(base + additive) * multipliers`
    pub fn effective(&self, stat: Stat) -> f32 {
        let mut additive = 0.0;
        let mut factor = 1.0;
        for (_, modifier) in self.modifiers.iter().filter(|(_, m)| m.stat == stat) {
            match modifier.op {
                ModifierOp::Additive => additive += modifier.amount,
                ModifierOp::Multiplicative => factor *= modifier.amount,
            }
        }
        let value = (self.base.get(stat) + additive) * factor;
        match stat {
            Stat::CritRate => value.clamp(0.0, 1.0),
            Stat::MaxHp | Stat::MaxMp => value.max(0.0),
            _ => value,
        }
    }

    pub fn attack_power(&self) -> f32 {
        self.effective(Stat::AttackPower)
    }

    pub fn defense(&self) -> f32 {
        self.effective(Stat::Defense)
    }

    pub fn crit_rate(&self) -> f32 {
        self.effective(Stat::CritRate)
    }

    pub fn max_hp(&self) -> f32 {
        self.effective(Stat::MaxHp)
    }

    pub fn max_mp(&self) -> f32 {
        self.effective(Stat::MaxMp)
    }

    pub fn current_hp(&self) -> f32 {
        self.current_hp
    }

    pub fn current_mp(&self) -> f32 {
        self.current_mp
    }

    /// Snapshot of the stats a transformation overlays
    pub fn snapshot(&self) -> StatSnapshot {
        StatSnapshot {
            attack_power: self.attack_power(),
            defense: self.defense(),
            crit_rate: self.crit_rate(),
        }
    }

    /// Replace whatever `source` contributed with `modifiers`.
    ///
    /// Applying the same source twice never stacks.
    pub fn apply_modifiers(
        &mut self,
        source: ModifierSource,
        modifiers: impl IntoIterator<Item = StatModifier>,
    ) {
        self.modifiers.retain(|(s, _)| *s != source);
        self.modifiers
            .extend(modifiers.into_iter().map(|modifier| (source, modifier)));
        self.clamp_resources();
    }

    /// Attach a condition on behalf of `source`
    pub fn add_condition(&mut self, source: ModifierSource, condition: Condition) {
        if !self.conditions.contains(&(source, condition)) {
            self.conditions.push((source, condition));
        }
    }

    /// Remove every modifier and condition contributed by `source`.
    /// Returns false if the source had contributed nothing.
    pub fn remove_source(&mut self, source: ModifierSource) -> bool {
        let before = self.modifiers.len() + self.conditions.len();
        self.modifiers.retain(|(s, _)| *s != source);
        self.conditions.retain(|(s, _)| *s != source);
        let removed = before != self.modifiers.len() + self.conditions.len();
        if removed {
            self.clamp_resources();
        }
        removed
    }

    /// Whether `source` currently contributes anything
    pub fn has_source(&self, source: ModifierSource) -> bool {
        self.modifiers.iter().any(|(s, _)| *s == source)
            || self.conditions.iter().any(|(s, _)| *s == source)
    }

    /// Number of active modifiers
    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
    }

    pub fn has_condition(&self, condition: Condition) -> bool {
        self.conditions.iter().any(|(_, c)| *c == condition)
    }

    /// The condition that stops this character from using skills, if any
    pub fn skill_lockout(&self) -> Option<Condition> {
        [Condition::Stunned, Condition::Silenced]
            .into_iter()
            .find(|c| self.has_condition(*c))
    }

    /// Whether this character is alive
    pub fn is_alive(&self) -> bool {
        self.current_hp > 0.0
    }

    pub fn hp_full(&self) -> bool {
        self.current_hp >= self.max_hp()
    }

    pub fn mp_full(&self) -> bool {
        self.current_mp >= self.max_mp()
    }

    /// HP as a 0.0-1.0 fraction
    pub fn hp_fraction(&self) -> f32 {
        let max = self.max_hp();
        if max <= 0.0 {
            return 0.0;
        }
        (self.current_hp / max).clamp(0.0, 1.0)
    }

    /// Lose HP. Returns the amount actually lost.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        let lost = amount.max(0.0).min(self.current_hp);
        self.current_hp -= lost;
        lost
    }

    /// Restore HP up to the effective maximum. Returns the amount restored.
    pub fn heal_hp(&mut self, amount: f32) -> f32 {
        let restored = amount.max(0.0).min((self.max_hp() - self.current_hp).max(0.0));
        self.current_hp += restored;
        restored
    }

    /// Restore MP up to the effective maximum. Returns the amount restored.
    pub fn heal_mp(&mut self, amount: f32) -> f32 {
        let restored = amount.max(0.0).min((self.max_mp() - self.current_mp).max(0.0));
        self.current_mp += restored;
        restored
    }

    /// Try to spend mana. Returns false if insufficient.
    pub fn spend_mp(&mut self, cost: f32) -> bool {
        if self.current_mp >= cost {
            self.current_mp -= cost.max(0.0);
            true
        } else {
            false
        }
    }

    fn clamp_resources(&mut self) {
        self.current_hp = self.current_hp.min(self.max_hp());
        self.current_mp = self.current_mp.min(self.max_mp());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUFF: ModifierSource = ModifierSource::Effect(SkillInstanceId(1));
    const OTHER: ModifierSource = ModifierSource::Effect(SkillInstanceId(2));

    #[test]
    fn test_reapplying_a_source_replaces_it() {
        let mut stats = CharacterStats::default();
        stats.apply_modifiers(BUFF, [StatModifier::additive(Stat::AttackPower, 5.0)]);
        stats.apply_modifiers(BUFF, [StatModifier::additive(Stat::AttackPower, 7.0)]);
        assert_eq!(stats.attack_power(), 17.0);
        assert_eq!(stats.modifier_count(), 1);
    }

    #[test]
    fn test_sources_compose_and_remove_exactly() {
        let mut stats = CharacterStats::default();
        let baseline = stats.defense();
        stats.apply_modifiers(BUFF, [StatModifier::additive(Stat::Defense, 0.3)]);
        stats.apply_modifiers(OTHER, [StatModifier::additive(Stat::Defense, -0.7)]);
        stats.apply_modifiers(
            ModifierSource::Transformation(SkillInstanceId(3)),
            [StatModifier::multiplicative(Stat::Defense, 1.37)],
        );
        assert!(stats.remove_source(OTHER));
        assert!(stats.remove_source(ModifierSource::Transformation(SkillInstanceId(3))));
        assert!(stats.remove_source(BUFF));
        assert_eq!(stats.defense(), baseline);
        assert!(!stats.remove_source(BUFF));
    }

    #[test]
    fn test_multiplier_applies_after_additive() {
        let mut stats = CharacterStats::default();
        stats.apply_modifiers(BUFF, [StatModifier::additive(Stat::AttackPower, 10.0)]);
        stats.apply_modifiers(OTHER, [StatModifier::multiplicative(Stat::AttackPower, 1.5)]);
        assert_eq!(stats.attack_power(), 30.0);
    }

    #[test]
    fn test_crit_rate_is_clamped() {
        let mut stats = CharacterStats::default();
        stats.apply_modifiers(BUFF, [StatModifier::additive(Stat::CritRate, 3.0)]);
        assert_eq!(stats.crit_rate(), 1.0);
        stats.apply_modifiers(BUFF, [StatModifier::additive(Stat::CritRate, -3.0)]);
        assert_eq!(stats.crit_rate(), 0.0);
    }

    #[test]
    fn test_losing_max_hp_clamps_current() {
        let mut stats = CharacterStats::default();
        stats.apply_modifiers(BUFF, [StatModifier::additive(Stat::MaxHp, 50.0)]);
        stats.heal_hp(50.0);
        assert_eq!(stats.current_hp(), 150.0);
        stats.remove_source(BUFF);
        assert_eq!(stats.current_hp(), 100.0);
    }

    #[test]
    fn test_conditions_follow_their_source() {
        let mut stats = CharacterStats::default();
        stats.add_condition(BUFF, Condition::Silenced);
        assert_eq!(stats.skill_lockout(), Some(Condition::Silenced));
        stats.add_condition(OTHER, Condition::Stunned);
        assert_eq!(stats.skill_lockout(), Some(Condition::Stunned));
        stats.remove_source(OTHER);
        assert!(!stats.has_condition(Condition::Stunned));
        assert!(stats.remove_source(BUFF));
        assert_eq!(stats.skill_lockout(), None);
    }

    #[test]
    fn test_damage_and_heal_are_bounded() {
        let mut stats = CharacterStats::default();
        assert_eq!(stats.take_damage(130.0), 100.0);
        assert!(!stats.is_alive());
        assert_eq!(stats.heal_hp(40.0), 40.0);
        assert_eq!(stats.heal_hp(100.0), 60.0);
        assert!(stats.hp_full());
    }

    #[test]
    fn test_spend_mp() {
        let mut stats = CharacterStats::default();
        assert!(stats.spend_mp(60.0));
        assert!(!stats.spend_mp(60.0));
        assert_eq!(stats.current_mp(), 40.0);
    }
}
