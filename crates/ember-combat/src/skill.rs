//! Skill definitions and equipped skill instances
//!
//! A [`SkillDefinition`] is immutable data shared by every character that
//! equips it. Its [`SkillKind`] carries the variant-specific parameters.
//! A [`SkillInstance`] is one character's copy: level, cooldown, cast state,
//! and the effects and summons it currently owns.

use std::fmt;
use std::sync::Arc;

use ember_core::EntityId;
use serde::{Deserialize, Serialize};

use crate::cast::CastState;
use crate::damage::{DamageParams, HealKind};
use crate::effects::{EffectSpec, EffectTracker, MIN_TICK_INTERVAL};
use crate::error::{CatalogError, SkillError};
use crate::stats::{BaseStats, CharacterStats, ModifierOp, Stat, StatModifier};
use crate::summon::{SummonBehavior, SummonRoster};
use crate::ultimate::{TransformationParams, UltimateGauge};

/// Catalog identifier of a skill definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkillId(pub u32);

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of one equipped skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkillInstanceId(pub u64);

impl fmt::Display for SkillInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skill-{}", self.0)
    }
}

/// Skill family, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillVariant {
    Melee,
    Projectile,
    Aoe,
    Heal,
    Buff,
    Debuff,
    Summon,
    Ultimate,
    Passive,
}

impl SkillVariant {
    /// Per-level growth of base damage for this family
    pub fn damage_level_scaling(self) -> f32 {
        match self {
            Self::Melee | Self::Projectile | Self::Debuff => 0.1,
            Self::Aoe => 0.15,
            Self::Ultimate => 0.2,
            Self::Heal | Self::Buff | Self::Summon | Self::Passive => 0.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Melee => "Melee",
            Self::Projectile => "Projectile",
            Self::Aoe => "AoE",
            Self::Heal => "Heal",
            Self::Buff => "Buff",
            Self::Debuff => "Debuff",
            Self::Summon => "Summon",
            Self::Ultimate => "Ultimate",
            Self::Passive => "Passive",
        }
    }
}

/// Cone attack in front of the caster, optionally chaining to nearby enemies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeleeParams {
    pub damage: DamageParams,
    pub range: f32,
    /// Full cone angle in degrees
    pub angle: f32,
    /// Extra targets each primary hit may chain to (0 = no chaining)
    pub max_chain_targets: u32,
}

impl Default for MeleeParams {
    fn default() -> Self {
        Self {
            damage: DamageParams::default(),
            range: 3.0,
            angle: 90.0,
            max_chain_targets: 0,
        }
    }
}

/// A launched missile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileParams {
    pub damage: DamageParams,
    pub speed: f32,
    /// Distance traveled before the projectile is destroyed
    pub range: f32,
    pub collision_radius: f32,
    pub pierce: bool,
    /// Hits a piercing projectile survives, counting the last one
    pub pierce_count: u32,
    pub homing: bool,
    /// Steering blend per second
    pub homing_strength: f32,
}

impl Default for ProjectileParams {
    fn default() -> Self {
        Self {
            damage: DamageParams::default(),
            speed: 20.0,
            range: 30.0,
            collision_radius: 0.3,
            pierce: false,
            pierce_count: 1,
            homing: false,
            homing_strength: 2.0,
        }
    }
}

/// Damage to every enemy in a sphere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AoeParams {
    pub damage: DamageParams,
    pub radius: f32,
    /// 0 = unlimited
    pub max_targets: usize,
}

impl Default for AoeParams {
    fn default() -> Self {
        Self {
            damage: DamageParams::default(),
            radius: 5.0,
            max_targets: 0,
        }
    }
}

/// Restores HP and/or MP on the caster and nearby allies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealParams {
    pub base_heal: f32,
    /// Fraction of the target's maximum; overrides `base_heal` when set
    pub percentage: Option<f32>,
    pub heal_kind: HealKind,
    /// Ally search radius (0 = caster only)
    pub radius: f32,
}

impl Default for HealParams {
    fn default() -> Self {
        Self {
            base_heal: 30.0,
            percentage: None,
            heal_kind: HealKind::Hp,
            radius: 0.0,
        }
    }
}

/// Timed effect on the caster and nearby allies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuffParams {
    pub effect: EffectSpec,
    /// Ally search radius (0 = caster only)
    #[serde(default)]
    pub radius: f32,
}

/// Timed effect on enemies, with optional up-front damage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebuffParams {
    pub effect: EffectSpec,
    #[serde(default)]
    pub damage: Option<DamageParams>,
    /// Maximum distance to a single target
    #[serde(default = "default_debuff_range")]
    pub range: f32,
    /// Area radius (0 = single target)
    #[serde(default)]
    pub radius: f32,
    /// Area target cap (0 = unlimited)
    #[serde(default)]
    pub max_targets: usize,
}

fn default_debuff_range() -> f32 {
    10.0
}

/// A creature that fights alongside its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummonParams {
    pub creature_name: String,
    /// Creature stats at caster level 1
    pub stats: BaseStats,
    /// Seconds (0 = infinite)
    pub lifetime: f32,
    pub max_summons: usize,
    pub behavior: SummonBehavior,
    pub move_speed: f32,
    /// Follow distance from the owner, and the patrol span
    pub leash_distance: f32,
    /// Radius in which enemies are noticed
    pub sense_radius: f32,
    pub attack_range: f32,
    /// Seconds between attacks
    pub attack_cooldown: f32,
}

impl Default for SummonParams {
    fn default() -> Self {
        Self {
            creature_name: "Familiar".to_string(),
            stats: BaseStats::default(),
            lifetime: 0.0,
            max_summons: 1,
            behavior: SummonBehavior::FollowAndAttack,
            move_speed: 5.0,
            leash_distance: 3.0,
            sense_radius: 10.0,
            attack_range: 1.5,
            attack_cooldown: 1.0,
        }
    }
}

/// Gauge-gated finisher with an optional burst and transformation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UltimateParams {
    pub required_gauge: f32,
    /// Empty the gauge on execution, else drain `required_gauge * cost_percentage`
    pub consume_fully: bool,
    pub cost_percentage: f32,
    /// Burst around the caster
    pub damage: Option<DamageParams>,
    pub radius: f32,
    /// 0 = unlimited
    pub max_targets: usize,
    pub transformation: Option<TransformationParams>,
}

impl Default for UltimateParams {
    fn default() -> Self {
        Self {
            required_gauge: 100.0,
            consume_fully: true,
            cost_percentage: 1.0,
            damage: None,
            radius: 6.0,
            max_targets: 0,
            transformation: None,
        }
    }
}

impl UltimateParams {
    /// Gauge needed to activate. A partial ultimate drains exactly this; a
    /// full one empties the gauge whatever it holds.
    pub fn gauge_cost(&self) -> f32 {
        if self.consume_fully {
            self.required_gauge
        } else {
            self.required_gauge * self.cost_percentage
        }
    }
}

/// A permanent stat change granted by a passive skill
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassiveModifier {
    pub stat: Stat,
    pub op: ModifierOp,
    /// Amount (or factor) at level 1
    pub amount: f32,
    /// Added to `amount` per level past the first
    #[serde(default)]
    pub per_level: f32,
}

impl PassiveModifier {
    pub fn at_level(&self, level: u32) -> StatModifier {
        StatModifier {
            stat: self.stat,
            op: self.op,
            amount: self.amount + self.per_level * level.saturating_sub(1) as f32,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassiveParams {
    #[serde(default)]
    pub modifiers: Vec<PassiveModifier>,
}

/// Variant tag plus its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkillKind {
    Melee(MeleeParams),
    Projectile(ProjectileParams),
    Aoe(AoeParams),
    Heal(HealParams),
    Buff(BuffParams),
    Debuff(DebuffParams),
    Summon(SummonParams),
    Ultimate(UltimateParams),
    Passive(PassiveParams),
}

impl SkillKind {
    /// Distances, speeds and durations that feed spatial queries and timers
    fn extents(&self) -> Vec<(&'static str, f32)> {
        match self {
            Self::Melee(p) => vec![("range", p.range)],
            Self::Projectile(p) => vec![
                ("speed", p.speed),
                ("range", p.range),
                ("collision_radius", p.collision_radius),
            ],
            Self::Aoe(p) => vec![("radius", p.radius)],
            Self::Heal(p) => vec![("radius", p.radius)],
            Self::Buff(p) => vec![("radius", p.radius), ("duration", p.effect.duration)],
            Self::Debuff(p) => vec![
                ("range", p.range),
                ("radius", p.radius),
                ("duration", p.effect.duration),
            ],
            Self::Summon(p) => vec![
                ("lifetime", p.lifetime),
                ("move_speed", p.move_speed),
                ("leash_distance", p.leash_distance),
                ("sense_radius", p.sense_radius),
                ("attack_range", p.attack_range),
            ],
            Self::Ultimate(p) => {
                let mut extents = vec![("radius", p.radius)];
                if let Some(t) = &p.transformation {
                    extents.push(("duration", t.duration));
                }
                extents
            }
            Self::Passive(_) => Vec::new(),
        }
    }

    pub fn variant(&self) -> SkillVariant {
        match self {
            Self::Melee(_) => SkillVariant::Melee,
            Self::Projectile(_) => SkillVariant::Projectile,
            Self::Aoe(_) => SkillVariant::Aoe,
            Self::Heal(_) => SkillVariant::Heal,
            Self::Buff(_) => SkillVariant::Buff,
            Self::Debuff(_) => SkillVariant::Debuff,
            Self::Summon(_) => SkillVariant::Summon,
            Self::Ultimate(_) => SkillVariant::Ultimate,
            Self::Passive(_) => SkillVariant::Passive,
        }
    }
}

/// Static data for one skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub id: SkillId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Seconds (0 = instant)
    #[serde(default)]
    pub cast_time: f32,
    /// Seconds
    #[serde(default)]
    pub cooldown: f32,
    #[serde(default)]
    pub mana_cost: f32,
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    pub kind: SkillKind,
}

fn default_max_level() -> u32 {
    10
}

impl SkillDefinition {
    pub fn variant(&self) -> SkillVariant {
        self.kind.variant()
    }

    /// Check the numbers a catalog could get wrong
    pub fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: &str| CatalogError::Invalid {
            id: self.id,
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        let non_negative = [
            ("cast_time", self.cast_time),
            ("cooldown", self.cooldown),
            ("mana_cost", self.mana_cost),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) {
                return Err(invalid(&format!("{field} must be non-negative")));
            }
        }
        if self.max_level == 0 {
            return Err(invalid("max_level must be at least 1"));
        }
        for (field, value) in self.kind.extents() {
            if !value.is_finite() {
                return Err(invalid(&format!("{field} must be finite")));
            }
        }

        match &self.kind {
            SkillKind::Melee(p) if !(p.range > 0.0 && p.angle > 0.0 && p.angle <= 360.0) => {
                Err(invalid("melee needs a positive range and an angle in (0, 360]"))
            }
            SkillKind::Projectile(p) if !(p.speed > 0.0 && p.range > 0.0) => {
                Err(invalid("projectile needs a positive speed and range"))
            }
            SkillKind::Projectile(p) if p.pierce && p.pierce_count == 0 => {
                Err(invalid("piercing projectile needs a pierce_count of at least 1"))
            }
            SkillKind::Aoe(p) if !(p.radius > 0.0) => Err(invalid("aoe needs a positive radius")),
            SkillKind::Heal(p) if p.percentage.is_some_and(|pct| !(pct > 0.0)) => {
                Err(invalid("heal percentage must be positive"))
            }
            SkillKind::Buff(BuffParams { effect, .. }) | SkillKind::Debuff(DebuffParams { effect, .. })
                if !(effect.duration > 0.0) =>
            {
                Err(invalid("effect duration must be positive"))
            }
            SkillKind::Buff(BuffParams { effect, .. }) | SkillKind::Debuff(DebuffParams { effect, .. })
                if effect.tick_interval.is_some_and(|i| !(i >= MIN_TICK_INTERVAL)) =>
            {
                Err(invalid(&format!("tick_interval must be at least {MIN_TICK_INTERVAL}s")))
            }
            SkillKind::Summon(p) if p.max_summons == 0 => Err(invalid("max_summons must be at least 1")),
            SkillKind::Ultimate(p)
                if !(p.required_gauge >= 0.0 && (0.0..=1.0).contains(&p.cost_percentage)) =>
            {
                Err(invalid("ultimate needs a non-negative gauge cost and cost_percentage in [0, 1]"))
            }
            SkillKind::Ultimate(UltimateParams {
                transformation: Some(t),
                ..
            }) if !(t.duration > 0.0) => Err(invalid("transformation duration must be positive")),
            _ => Ok(()),
        }
    }
}

/// Cooldown timer for an equipped skill
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cooldown {
    pub duration: f32,
    remaining: f32,
}

impl Cooldown {
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            remaining: 0.0,
        }
    }

    pub fn start(&mut self) {
        self.remaining = self.duration;
    }

    /// Update cooldown timer
    pub fn tick(&mut self, delta: f32) {
        if self.remaining > 0.0 {
            self.remaining = (self.remaining - delta).max(0.0);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Cooldown progress as a 0.0-1.0 fraction (1.0 = ready)
    pub fn fraction(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        1.0 - (self.remaining / self.duration).clamp(0.0, 1.0)
    }
}

/// A skill equipped by one character
#[derive(Debug, Clone)]
pub struct SkillInstance {
    pub id: SkillInstanceId,
    pub owner: EntityId,
    pub definition: Arc<SkillDefinition>,
    level: u32,
    pub cooldown: Cooldown,
    pub cast: CastState,
    pub effects: EffectTracker,
    pub summons: SummonRoster,
}

impl SkillInstance {
    pub fn new(id: SkillInstanceId, owner: EntityId, definition: Arc<SkillDefinition>) -> Self {
        Self {
            id,
            owner,
            cooldown: Cooldown::new(definition.cooldown),
            definition,
            level: 1,
            cast: CastState::Idle,
            effects: EffectTracker::new(id),
            summons: SummonRoster::new(),
        }
    }

    pub fn variant(&self) -> SkillVariant {
        self.definition.variant()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Raise the level by one. Returns false at the definition's max level.
    pub fn level_up(&mut self) -> bool {
        if self.level >= self.definition.max_level {
            return false;
        }
        self.level += 1;
        true
    }

    pub fn is_casting(&self) -> bool {
        matches!(self.cast, CastState::Casting { .. })
    }

    /// Gauge cost if this is an ultimate
    pub fn gauge_cost(&self) -> Option<f32> {
        self.ultimate().map(UltimateParams::gauge_cost)
    }

    pub fn ultimate(&self) -> Option<&UltimateParams> {
        match &self.definition.kind {
            SkillKind::Ultimate(params) => Some(params),
            _ => None,
        }
    }

    /// Damage level scale for this skill's family at its current level
    pub fn damage_scale(&self) -> f32 {
        crate::damage::level_scale(self.level, self.variant().damage_level_scaling())
    }

    /// Whether the caster could start this skill right now
    pub fn can_use(&self, caster: &CharacterStats, gauge: Option<&UltimateGauge>) -> Result<(), SkillError> {
        if self.variant() == SkillVariant::Passive {
            return Err(SkillError::Passive);
        }
        if self.is_casting() {
            return Err(SkillError::AlreadyCasting);
        }
        if !caster.is_alive() {
            return Err(SkillError::CasterDead);
        }
        if let Some(condition) = caster.skill_lockout() {
            return Err(SkillError::Incapacitated(condition));
        }
        if !self.cooldown.is_ready() {
            return Err(SkillError::OnCooldown {
                remaining: self.cooldown.remaining(),
            });
        }
        self.can_pay(caster, gauge)
    }

    /// Whether the caster can afford the mana and gauge cost
    pub fn can_pay(&self, caster: &CharacterStats, gauge: Option<&UltimateGauge>) -> Result<(), SkillError> {
        let required = self.definition.mana_cost;
        if caster.current_mp() < required {
            return Err(SkillError::InsufficientMana {
                required,
                available: caster.current_mp(),
            });
        }
        if let Some(required) = self.gauge_cost() {
            let available = gauge.map_or(0.0, UltimateGauge::current);
            if available < required {
                return Err(SkillError::InsufficientGauge { required, available });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strike() -> SkillDefinition {
        SkillDefinition {
            id: SkillId(1),
            name: "Strike".to_string(),
            description: String::new(),
            cast_time: 0.0,
            cooldown: 3.0,
            mana_cost: 10.0,
            max_level: 3,
            kind: SkillKind::Melee(MeleeParams::default()),
        }
    }

    #[test]
    fn test_cooldown_recovery() {
        let mut cooldown = Cooldown::new(3.0);
        assert!(cooldown.is_ready());
        cooldown.start();
        assert!(!cooldown.is_ready());
        assert_eq!(cooldown.fraction(), 0.0);
        cooldown.tick(1.5);
        assert!((cooldown.fraction() - 0.5).abs() < 1e-6);
        cooldown.tick(2.0);
        assert!(cooldown.is_ready());
        assert_eq!(cooldown.remaining(), 0.0);
    }

    #[test]
    fn test_level_up_caps_at_max() {
        let mut instance = SkillInstance::new(SkillInstanceId(1), EntityId::new(), Arc::new(strike()));
        assert!(instance.level_up());
        assert!(instance.level_up());
        assert!(!instance.level_up());
        assert_eq!(instance.level(), 3);
        assert!((instance.damage_scale() - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_can_use_reasons() {
        let mut instance = SkillInstance::new(SkillInstanceId(1), EntityId::new(), Arc::new(strike()));
        let mut caster = CharacterStats::default();
        assert_eq!(instance.can_use(&caster, None), Ok(()));

        instance.cooldown.start();
        assert!(matches!(instance.can_use(&caster, None), Err(SkillError::OnCooldown { .. })));
        instance.cooldown.tick(10.0);

        caster.spend_mp(95.0);
        assert_eq!(
            instance.can_use(&caster, None),
            Err(SkillError::InsufficientMana {
                required: 10.0,
                available: 5.0
            })
        );
    }

    #[test]
    fn test_gauge_cost() {
        let full = UltimateParams::default();
        assert_eq!(full.gauge_cost(), 100.0);
        let partial = UltimateParams {
            consume_fully: false,
            cost_percentage: 0.5,
            ..Default::default()
        };
        assert_eq!(partial.gauge_cost(), 50.0);
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        assert!(strike().validate().is_ok());

        let mut negative = strike();
        negative.cooldown = -1.0;
        assert!(matches!(negative.validate(), Err(CatalogError::Invalid { .. })));

        let mut no_speed = strike();
        no_speed.kind = SkillKind::Projectile(ProjectileParams {
            speed: 0.0,
            ..Default::default()
        });
        assert!(no_speed.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unbounded_extents() {
        let mut huge = strike();
        huge.kind = SkillKind::Aoe(AoeParams {
            radius: f32::INFINITY,
            ..Default::default()
        });
        assert!(matches!(huge.validate(), Err(CatalogError::Invalid { reason, .. }) if reason == "radius must be finite"));

        let mut nan = strike();
        nan.kind = SkillKind::Summon(SummonParams {
            sense_radius: f32::NAN,
            ..Default::default()
        });
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_tick_interval() {
        let dot = |tick_interval| {
            let mut skill = strike();
            skill.kind = SkillKind::Debuff(DebuffParams {
                effect: EffectSpec {
                    kind: crate::effects::EffectKind::DamageOverTime,
                    base_value: 10.0,
                    duration: 4.0,
                    tick_interval,
                },
                damage: None,
                range: 10.0,
                radius: 0.0,
                max_targets: 0,
            });
            skill
        };
        assert!(dot(None).validate().is_ok());
        assert!(dot(Some(0.5)).validate().is_ok());
        assert!(dot(Some(MIN_TICK_INTERVAL)).validate().is_ok());
        assert!(dot(Some(1e-6)).validate().is_err());
        assert!(dot(Some(0.0)).validate().is_err());
    }

    #[test]
    fn test_passive_modifier_scales_with_level() {
        let modifier = PassiveModifier {
            stat: Stat::Defense,
            op: ModifierOp::Additive,
            amount: 2.0,
            per_level: 1.5,
        };
        assert_eq!(modifier.at_level(1).amount, 2.0);
        assert_eq!(modifier.at_level(3).amount, 5.0);
    }
}
