//! Cast state machine shared by every active skill
//!
//! Idle -> Casting -> (execute) -> Idle. Cost and cooldown are paid once,
//! when the skill actually executes.

use ember_core::EntityId;
use glam::Vec3;
use serde::Serialize;

use crate::error::SkillError;
use crate::skill::SkillInstance;
use crate::stats::CharacterStats;
use crate::ultimate::UltimateGauge;

/// What a skill was aimed at when it was used
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub enum SkillTarget {
    /// Use the caster's facing or position
    #[default]
    None,
    Entity(EntityId),
    Point(Vec3),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CastState {
    #[default]
    Idle,
    Casting {
        remaining: f32,
        target: SkillTarget,
    },
}

/// Result of a successful `use`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UseOutcome {
    /// The skill executed immediately
    Executed,
    /// A cast started and will execute after `duration` seconds
    CastStarted { duration: f32 },
}

/// Enter the cast for an instance that already passed `can_use`.
/// Returns `Executed` when there is no cast time; the caller must then
/// [`commit`] and execute.
pub fn begin(instance: &mut SkillInstance, target: SkillTarget) -> UseOutcome {
    let duration = instance.definition.cast_time;
    if duration <= 0.0 {
        return UseOutcome::Executed;
    }
    instance.cast = CastState::Casting {
        remaining: duration,
        target,
    };
    UseOutcome::CastStarted { duration }
}

/// Advance a cast. Returns the stored target once the cast completes,
/// leaving the state Idle.
pub fn advance(cast: &mut CastState, dt: f32) -> Option<SkillTarget> {
    let CastState::Casting { remaining, target } = cast else {
        return None;
    };
    *remaining -= dt;
    if *remaining > 0.0 {
        return None;
    }
    let target = *target;
    *cast = CastState::Idle;
    Some(target)
}

/// Abort a cast without paying anything. Returns false if nothing was casting.
pub fn cancel(cast: &mut CastState) -> bool {
    let was_casting = matches!(cast, CastState::Casting { .. });
    *cast = CastState::Idle;
    was_casting
}

/// Pay mana and gauge together and start the cooldown. Nothing is consumed
/// unless both costs can be paid. Returns the gauge drained.
pub fn commit(
    instance: &mut SkillInstance,
    caster: &mut CharacterStats,
    gauge: Option<&mut UltimateGauge>,
) -> Result<f32, SkillError> {
    instance.can_pay(caster, gauge.as_deref())?;
    caster.spend_mp(instance.definition.mana_cost);
    let spent = match (instance.ultimate(), gauge) {
        (Some(params), Some(gauge)) if params.consume_fully => gauge.drain_all(),
        (Some(params), Some(gauge)) => {
            let cost = params.gauge_cost();
            gauge.drain(cost);
            cost
        }
        _ => 0.0,
    };
    instance.cooldown.start();
    Ok(spent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::skill::{MeleeParams, SkillDefinition, SkillId, SkillInstanceId, SkillKind, UltimateParams};
    use crate::ultimate::GaugeConfig;

    fn instance(cast_time: f32, kind: SkillKind) -> SkillInstance {
        let definition = SkillDefinition {
            id: SkillId(1),
            name: "Test".to_string(),
            description: String::new(),
            cast_time,
            cooldown: 2.0,
            mana_cost: 20.0,
            max_level: 5,
            kind,
        };
        SkillInstance::new(SkillInstanceId(1), EntityId::new(), Arc::new(definition))
    }

    #[test]
    fn test_instant_skill_executes_now() {
        let mut skill = instance(0.0, SkillKind::Melee(MeleeParams::default()));
        assert_eq!(begin(&mut skill, SkillTarget::None), UseOutcome::Executed);
        assert_eq!(skill.cast, CastState::Idle);
    }

    #[test]
    fn test_cast_completes_with_stored_target() {
        let mut skill = instance(1.0, SkillKind::Melee(MeleeParams::default()));
        let target = SkillTarget::Point(Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(begin(&mut skill, target), UseOutcome::CastStarted { duration: 1.0 });
        assert_eq!(advance(&mut skill.cast, 0.5), None);
        assert_eq!(advance(&mut skill.cast, 0.5), Some(target));
        assert_eq!(skill.cast, CastState::Idle);
        assert_eq!(advance(&mut skill.cast, 0.5), None);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut skill = instance(1.0, SkillKind::Melee(MeleeParams::default()));
        begin(&mut skill, SkillTarget::None);
        assert!(cancel(&mut skill.cast));
        assert!(!cancel(&mut skill.cast));
        assert!(skill.cooldown.is_ready());
    }

    #[test]
    fn test_commit_pays_once() {
        let mut skill = instance(0.0, SkillKind::Melee(MeleeParams::default()));
        let mut caster = CharacterStats::default();
        commit(&mut skill, &mut caster, None).unwrap();
        assert_eq!(caster.current_mp(), 80.0);
        assert!(!skill.cooldown.is_ready());
    }

    #[test]
    fn test_commit_is_atomic() {
        let mut skill = instance(0.0, SkillKind::Ultimate(UltimateParams::default()));
        let mut caster = CharacterStats::default();
        let mut gauge = UltimateGauge::new(GaugeConfig::default());
        gauge.add(60.0);

        let result = commit(&mut skill, &mut caster, Some(&mut gauge));
        assert!(matches!(result, Err(SkillError::InsufficientGauge { .. })));
        assert_eq!(caster.current_mp(), 100.0);
        assert_eq!(gauge.current(), 60.0);

        gauge.add(40.0);
        assert_eq!(commit(&mut skill, &mut caster, Some(&mut gauge)), Ok(100.0));
        assert_eq!(gauge.current(), 0.0);
        assert_eq!(caster.current_mp(), 80.0);
    }

    #[test]
    fn test_commit_drains_by_consume_mode() {
        let full = UltimateParams {
            required_gauge: 60.0,
            ..Default::default()
        };
        let mut skill = instance(0.0, SkillKind::Ultimate(full));
        let mut caster = CharacterStats::default();
        let mut gauge = UltimateGauge::new(GaugeConfig::default());
        gauge.add(100.0);
        assert_eq!(commit(&mut skill, &mut caster, Some(&mut gauge)), Ok(100.0));
        assert_eq!(gauge.current(), 0.0);

        let partial = UltimateParams {
            required_gauge: 60.0,
            consume_fully: false,
            cost_percentage: 0.5,
            ..Default::default()
        };
        let mut skill = instance(0.0, SkillKind::Ultimate(partial));
        gauge.add(100.0);
        assert_eq!(commit(&mut skill, &mut caster, Some(&mut gauge)), Ok(30.0));
        assert_eq!(gauge.current(), 70.0);
    }
}
