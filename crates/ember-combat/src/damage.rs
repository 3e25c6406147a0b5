//! Damage and heal formulas
//!
//! Pipeline: base * level scale + weighted STR/ENE/AGI + attack power
//!           -> crit (x2) -> defense mitigation -> floor at 1.0

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::CombatConfig;
use crate::stats::{CharacterStats, Stat};

/// Skill-defined damage inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageParams {
    pub base_damage: f32,
    pub str_ratio: f32,
    pub ene_ratio: f32,
    pub agi_ratio: f32,
    pub can_crit: bool,
    /// Skip defense mitigation entirely
    pub pierce_armor: bool,
    /// Distance targets are pushed on hit (0 = none)
    pub knockback: f32,
}

impl Default for DamageParams {
    fn default() -> Self {
        Self {
            base_damage: 0.0,
            str_ratio: 0.0,
            ene_ratio: 0.0,
            agi_ratio: 0.0,
            can_crit: true,
            pierce_armor: false,
            knockback: 0.0,
        }
    }
}

/// The attacker's offensive stats at the moment of the attack
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AttackerProfile {
    pub attack_power: f32,
    pub strength: f32,
    pub energy: f32,
    pub agility: f32,
    pub crit_rate: f32,
}

impl AttackerProfile {
    pub fn from_stats(stats: &CharacterStats) -> Self {
        Self {
            attack_power: stats.attack_power(),
            strength: stats.effective(Stat::Strength),
            energy: stats.effective(Stat::Energy),
            agility: stats.effective(Stat::Agility),
            crit_rate: stats.crit_rate(),
        }
    }
}

/// Result of a damage calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DamageRoll {
    /// Damage before crit and defense
    pub raw: f32,
    /// Damage after crit, mitigation, and the 1.0 floor
    pub final_amount: f32,
    pub is_crit: bool,
}

/// `1 + per_level * (level - 1)`
pub fn level_scale(level: u32, per_level: f32) -> f32 {
    1.0 + per_level * level.saturating_sub(1) as f32
}

/// Damage before crit and mitigation
pub fn raw_damage(params: &DamageParams, level_scale: f32, attacker: &AttackerProfile) -> f32 {
    params.base_damage * level_scale
        + attacker.strength * params.str_ratio
        + attacker.energy * params.ene_ratio
        + attacker.agility * params.agi_ratio
        + attacker.attack_power
}

/// Apply defense mitigation, floored at 1.0.
///
/// Negative defense is treated as zero.
pub fn mitigate(raw: f32, defense: f32, pierce_armor: bool, constant: f32) -> f32 {
    let damage = if pierce_armor {
        raw
    } else {
        let defense = defense.max(0.0);
        raw * (1.0 - defense / (defense + constant))
    };
    damage.max(1.0)
}

/// Full damage roll of a skill hit against a defender
pub fn roll_damage(
    params: &DamageParams,
    level_scale: f32,
    attacker: &AttackerProfile,
    defender_defense: f32,
    config: &CombatConfig,
    rng: &mut impl Rng,
) -> DamageRoll {
    let raw = raw_damage(params, level_scale, attacker);
    let is_crit = params.can_crit && rng.gen::<f32>() < attacker.crit_rate;
    let amount = if is_crit { raw * config.crit_multiplier } else { raw };
    DamageRoll {
        raw,
        final_amount: mitigate(amount, defender_defense, params.pierce_armor, config.mitigation_constant),
        is_crit,
    }
}

/// Which resource a heal restores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealKind {
    #[default]
    Hp,
    Mp,
    /// HP in full plus a share of the amount as MP
    Both,
}

/// Amounts to restore on one target
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HealAmount {
    pub hp: f32,
    pub mp: f32,
}

/// Heal magnitude for one target.
///
/// A configured percentage overrides the flat amount and is taken of the
/// target's own maximum for each restored resource.
pub fn heal_amount(
    base_heal: f32,
    level: u32,
    percentage: Option<f32>,
    kind: HealKind,
    target: &CharacterStats,
    config: &CombatConfig,
) -> HealAmount {
    let flat = base_heal * level_scale(level, config.heal_level_scaling);
    let hp = || percentage.map_or(flat, |p| target.max_hp() * p);
    let mp = || percentage.map_or(flat, |p| target.max_mp() * p);
    match kind {
        HealKind::Hp => HealAmount { hp: hp(), mp: 0.0 },
        HealKind::Mp => HealAmount { hp: 0.0, mp: mp() },
        HealKind::Both => HealAmount {
            hp: hp(),
            mp: mp() * config.mp_heal_fraction,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::stats::BaseStats;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn attacker(strength: f32, attack_power: f32, crit_rate: f32) -> AttackerProfile {
        AttackerProfile {
            attack_power,
            strength,
            crit_rate,
            ..Default::default()
        }
    }

    #[test]
    fn test_worked_example() {
        let params = DamageParams {
            base_damage: 50.0,
            str_ratio: 1.0,
            can_crit: false,
            ..Default::default()
        };
        let roll = roll_damage(&params, 1.0, &attacker(30.0, 10.0, 0.0), 50.0, &CombatConfig::default(), &mut rng());
        assert_eq!(roll.raw, 90.0);
        assert!((roll.final_amount - 60.0).abs() < 1e-4);
        assert!(!roll.is_crit);
    }

    #[test]
    fn test_zero_defense_is_unmitigated() {
        assert_eq!(mitigate(90.0, 0.0, false, 100.0), 90.0);
    }

    #[test]
    fn test_pierce_armor_skips_mitigation() {
        assert_eq!(mitigate(90.0, 500.0, true, 100.0), 90.0);
    }

    #[test]
    fn test_damage_floor() {
        assert_eq!(mitigate(0.5, 0.0, false, 100.0), 1.0);
        assert_eq!(mitigate(1.5, 10_000.0, false, 100.0), 1.0);
        assert_eq!(mitigate(0.0, 0.0, true, 100.0), 1.0);
    }

    #[test]
    fn test_negative_defense_treated_as_zero() {
        assert_eq!(mitigate(40.0, -25.0, false, 100.0), 40.0);
    }

    #[test]
    fn test_forced_crit_doubles_raw() {
        let params = DamageParams {
            base_damage: 20.0,
            ..Default::default()
        };
        let mut rng = rng();
        for _ in 0..20 {
            let roll = roll_damage(&params, 1.0, &attacker(0.0, 5.0, 1.0), 0.0, &CombatConfig::default(), &mut rng);
            assert!(roll.is_crit);
            assert_eq!(roll.final_amount, 2.0 * roll.raw);
        }
    }

    #[test]
    fn test_crit_needs_flag_and_rate() {
        let mut rng = rng();
        let no_flag = DamageParams {
            base_damage: 20.0,
            can_crit: false,
            ..Default::default()
        };
        let flagged = DamageParams {
            base_damage: 20.0,
            ..Default::default()
        };
        for _ in 0..20 {
            let config = CombatConfig::default();
            assert!(!roll_damage(&no_flag, 1.0, &attacker(0.0, 0.0, 1.0), 0.0, &config, &mut rng).is_crit);
            assert!(!roll_damage(&flagged, 1.0, &attacker(0.0, 0.0, 0.0), 0.0, &config, &mut rng).is_crit);
        }
    }

    #[test]
    fn test_level_scale() {
        assert_eq!(level_scale(1, 0.1), 1.0);
        assert!((level_scale(6, 0.2) - 2.0).abs() < 1e-6);
        assert_eq!(level_scale(0, 0.2), 1.0);
    }

    #[test]
    fn test_raw_damage_weights_stats() {
        let params = DamageParams {
            base_damage: 10.0,
            str_ratio: 0.5,
            ene_ratio: 2.0,
            agi_ratio: 1.0,
            ..Default::default()
        };
        let attacker = AttackerProfile {
            attack_power: 4.0,
            strength: 10.0,
            energy: 3.0,
            agility: 2.0,
            crit_rate: 0.0,
        };
        // 10*1.5 + 5 + 6 + 2 + 4
        assert_eq!(raw_damage(&params, 1.5, &attacker), 32.0);
    }

    #[test]
    fn test_heal_amounts() {
        let config = CombatConfig::default();
        let target = CharacterStats::new(BaseStats {
            max_hp: 200.0,
            max_mp: 80.0,
            ..Default::default()
        });

        let flat = heal_amount(30.0, 3, None, HealKind::Hp, &target, &config);
        assert!((flat.hp - 42.0).abs() < 1e-4);
        assert_eq!(flat.mp, 0.0);

        let percent = heal_amount(30.0, 3, Some(0.25), HealKind::Both, &target, &config);
        assert_eq!(percent.hp, 50.0);
        assert_eq!(percent.mp, 10.0);

        let mana = heal_amount(30.0, 1, None, HealKind::Mp, &target, &config);
        assert_eq!(mana, HealAmount { hp: 0.0, mp: 30.0 });
    }
}
