//! Skill execution: one dispatch over every [`SkillKind`]
//!
//! Called once per activation, after the cast finished and costs were paid.

use std::sync::Arc;

use ember_core::EntityId;
use glam::Vec3;
use tracing::{debug, info};

use crate::cast::SkillTarget;
use crate::combatant::{Combatant, Side};
use crate::damage::{heal_amount, level_scale, AttackerProfile, DamageParams};
use crate::effects::EffectSpec;
use crate::events::{CombatEvent, DespawnReason};
use crate::projectile::{LaunchInfo, Projectile};
use crate::skill::{
    AoeParams, BuffParams, DebuffParams, HealParams, MeleeParams, ProjectileParams, SkillInstance, SkillKind,
    SummonParams, UltimateParams,
};
use crate::state::{CombatState, Hit};
use crate::stats::BaseStats;
use crate::summon::{SummonBehavior, SummonedCreature};
use crate::targeting;

/// Distance in front of the caster where summons appear
const SUMMON_SPAWN_DISTANCE: f32 = 1.5;

/// The caster as seen at execution time
#[derive(Debug, Clone, Copy)]
struct Caster {
    id: EntityId,
    side: Side,
    position: Vec3,
    forward: Vec3,
    profile: AttackerProfile,
    character_level: u32,
}

impl Caster {
    fn from_combatant(combatant: &Combatant) -> Self {
        Self {
            id: combatant.id,
            side: combatant.side(),
            position: combatant.position(),
            forward: combatant.forward(),
            profile: AttackerProfile::from_stats(&combatant.stats),
            character_level: combatant.level,
        }
    }
}

/// Run `instance` against `target`. `gauge_spent` is what paying for it
/// drained. Returns the number of entities affected.
pub fn execute(state: &mut CombatState, instance: &mut SkillInstance, target: SkillTarget, gauge_spent: f32) -> usize {
    let definition = Arc::clone(&instance.definition);
    let aim = aim_point(state, target);

    let Some(combatant) = state.world.get_mut(instance.owner) else {
        debug!("{} has no caster in the world", instance.id);
        return 0;
    };
    if let Some(point) = aim {
        let offset = point - combatant.position();
        combatant.transform.face(Vec3::new(offset.x, 0.0, offset.z));
    }
    let caster = Caster::from_combatant(combatant);

    state.emit(CombatEvent::SkillExecuted {
        caster: caster.id,
        skill: definition.id,
        instance: instance.id,
        level: instance.level(),
    });
    debug!("{} executes {} (level {})", caster.id, definition.name, instance.level());

    let affected = match &definition.kind {
        SkillKind::Melee(params) => melee(state, instance, &caster, params),
        SkillKind::Projectile(params) => projectile(state, instance, &caster, params, target, aim),
        SkillKind::Aoe(params) => aoe(state, instance, &caster, params, aim),
        SkillKind::Heal(params) => heal(state, instance, &caster, params, target, aim),
        SkillKind::Buff(params) => buff(state, instance, &caster, params, target, aim),
        SkillKind::Debuff(params) => debuff(state, instance, &caster, params, target, aim),
        SkillKind::Summon(params) => summon(state, instance, &caster, params, &definition.name, target),
        SkillKind::Ultimate(params) => ultimate(state, instance, &caster, params, gauge_spent),
        SkillKind::Passive(_) => 0,
    };
    debug!("{} affected {} target(s)", definition.name, affected);
    affected
}

fn aim_point(state: &CombatState, target: SkillTarget) -> Option<Vec3> {
    match target {
        SkillTarget::None => None,
        SkillTarget::Entity(id) => state.world.position(id),
        SkillTarget::Point(point) => Some(point),
    }
}

/// Ally area center: an explicit point, else the caster
fn ally_center(caster: &Caster, target: SkillTarget, aim: Option<Vec3>) -> Vec3 {
    match target {
        SkillTarget::Point(_) => aim.unwrap_or(caster.position),
        _ => caster.position,
    }
}

fn strike(
    state: &mut CombatState,
    caster: &Caster,
    params: &DamageParams,
    scale: f32,
    target: EntityId,
    falloff: f32,
    push_from: Vec3,
) -> bool {
    let push_direction = state
        .world
        .position(target)
        .map_or(caster.forward, |p| p - push_from);
    state
        .resolve_hit(Hit {
            striker: Some(caster.id),
            credit: Some(caster.id),
            attacker: caster.profile,
            params,
            level_scale: scale,
            target,
            falloff,
            push_direction,
        })
        .is_some()
}

fn melee(state: &mut CombatState, instance: &SkillInstance, caster: &Caster, params: &MeleeParams) -> usize {
    let hits = targeting::melee(&state.world, caster.id, params, &state.config);
    let scale = instance.damage_scale();
    hits.iter()
        .filter(|hit| strike(state, caster, &params.damage, scale, hit.target, hit.scale, caster.position))
        .count()
}

fn projectile(
    state: &mut CombatState,
    instance: &SkillInstance,
    caster: &Caster,
    params: &ProjectileParams,
    target: SkillTarget,
    aim: Option<Vec3>,
) -> usize {
    let homing_target = match target {
        SkillTarget::Entity(id) => Some(id),
        _ if params.homing => {
            targeting::nearest_enemy(&state.world, caster.id, caster.side, caster.position, params.range)
        }
        _ => None,
    };
    let aim = aim.or_else(|| homing_target.and_then(|id| state.world.position(id)));

    let info = LaunchInfo {
        id: state.next_projectile_id(),
        skill: instance.definition.id,
        owner: caster.id,
        side: caster.side,
        attacker: caster.profile,
        level_scale: instance.damage_scale(),
        origin: caster.position,
        forward: caster.forward,
    };
    let projectile = Projectile::launch(info, params, aim, homing_target);
    state.emit(CombatEvent::ProjectileLaunched {
        projectile: projectile.id,
        owner: caster.id,
        position: projectile.position,
        direction: projectile.direction,
    });
    state.projectiles.push(projectile);
    1
}

fn aoe(state: &mut CombatState, instance: &SkillInstance, caster: &Caster, params: &AoeParams, aim: Option<Vec3>) -> usize {
    let center = aim.unwrap_or(caster.position);
    let targets = targeting::area(&state.world, caster.id, caster.side, center, params.radius, params.max_targets);
    let scale = instance.damage_scale();
    targets
        .into_iter()
        .filter(|&t| strike(state, caster, &params.damage, scale, t, 1.0, center))
        .count()
}

fn heal(
    state: &mut CombatState,
    instance: &SkillInstance,
    caster: &Caster,
    params: &HealParams,
    target: SkillTarget,
    aim: Option<Vec3>,
) -> usize {
    let center = ally_center(caster, target, aim);
    let targets = targeting::heal_targets(&state.world, caster.id, center, params.radius, params.heal_kind);
    let mut healed = 0;
    for t in targets {
        let Some(stats) = state.world.get(t).map(|c| &c.stats) else {
            continue;
        };
        let amount = heal_amount(
            params.base_heal,
            instance.level(),
            params.percentage,
            params.heal_kind,
            stats,
            &state.config,
        );
        let (hp, mp) = state.restore(t, amount.hp, amount.mp);
        if hp > 0.0 || mp > 0.0 {
            healed += 1;
        }
    }
    healed
}

fn apply_effect(state: &mut CombatState, instance: &mut SkillInstance, caster: EntityId, target: EntityId, spec: &EffectSpec) -> bool {
    let level = instance.level();
    let applied = instance
        .effects
        .apply(&mut state.world, caster, target, spec, level, &state.config);
    match applied {
        Some(magnitude) => {
            state.emit(CombatEvent::EffectApplied {
                source: caster,
                target,
                kind: spec.kind,
                magnitude,
                duration: spec.duration,
            });
            true
        }
        None => false,
    }
}

fn buff(
    state: &mut CombatState,
    instance: &mut SkillInstance,
    caster: &Caster,
    params: &BuffParams,
    target: SkillTarget,
    aim: Option<Vec3>,
) -> usize {
    let center = ally_center(caster, target, aim);
    let targets = targeting::allies(&state.world, caster.id, center, params.radius, |_| true);
    targets
        .into_iter()
        .filter(|&t| apply_effect(state, instance, caster.id, t, &params.effect))
        .count()
}

fn debuff(
    state: &mut CombatState,
    instance: &mut SkillInstance,
    caster: &Caster,
    params: &DebuffParams,
    target: SkillTarget,
    aim: Option<Vec3>,
) -> usize {
    let targets = if params.radius > 0.0 {
        let center = aim.unwrap_or(caster.position);
        targeting::area(&state.world, caster.id, caster.side, center, params.radius, params.max_targets)
    } else {
        let single = match target {
            SkillTarget::Entity(id) => targeting::single_enemy(&state.world, caster.id, id, params.range),
            _ => targeting::nearest_enemy(&state.world, caster.id, caster.side, caster.position, params.range),
        };
        single.into_iter().collect()
    };

    let scale = instance.damage_scale();
    let mut affected = 0;
    for t in targets {
        if let Some(damage) = &params.damage {
            strike(state, caster, damage, scale, t, 1.0, caster.position);
        }
        if state.world.is_alive(t) && apply_effect(state, instance, caster.id, t, &params.effect) {
            affected += 1;
        }
    }
    affected
}

fn summon(
    state: &mut CombatState,
    instance: &mut SkillInstance,
    caster: &Caster,
    params: &SummonParams,
    skill_name: &str,
    target: SkillTarget,
) -> usize {
    let scale = level_scale(caster.character_level, state.config.summon_level_scaling);
    let stats = BaseStats {
        max_hp: params.stats.max_hp * scale,
        attack_power: params.stats.attack_power * scale,
        defense: params.stats.defense * scale,
        ..params.stats.clone()
    };
    for evicted in instance.summons.make_room(params.max_summons) {
        state.world.despawn(evicted.entity);
        state.emit(CombatEvent::SummonDespawned {
            owner: caster.id,
            creature: evicted.entity,
            reason: DespawnReason::Evicted,
        });
    }

    let position = caster.position + caster.forward * SUMMON_SPAWN_DISTANCE;
    let creature = Combatant::new(params.creature_name.clone(), position, stats)
        .with_tags(caster.side.summon_tags())
        .with_level(caster.character_level)
        .facing(caster.forward)
        .with_body_radius(state.config.summon_body_radius);
    let entity = state.world.spawn(creature);

    let initial_target = match (params.behavior, target) {
        (SummonBehavior::AttackTarget, SkillTarget::Entity(id)) => Some(id),
        (SummonBehavior::AttackTarget, _) => {
            targeting::nearest_enemy(&state.world, entity, caster.side, position, params.sense_radius)
        }
        _ => None,
    };
    let ai = SummonedCreature::new(entity, caster.id, params, position, caster.forward).with_target(initial_target);
    instance.summons.push(ai);

    info!("{} summoned {} via {}", caster.id, params.creature_name, skill_name);
    state.emit(CombatEvent::Summoned {
        owner: caster.id,
        creature: entity,
        name: params.creature_name.clone(),
    });
    1
}

fn ultimate(
    state: &mut CombatState,
    instance: &SkillInstance,
    caster: &Caster,
    params: &UltimateParams,
    gauge_spent: f32,
) -> usize {
    info!("{} unleashes {} ({:.0} gauge)", caster.id, instance.definition.name, gauge_spent);
    state.emit(CombatEvent::UltimateActivated {
        caster: caster.id,
        gauge_spent,
    });

    let mut affected = 0;
    if let Some(damage) = &params.damage {
        let targets =
            targeting::area(&state.world, caster.id, caster.side, caster.position, params.radius, params.max_targets);
        let scale = instance.damage_scale();
        affected += targets
            .into_iter()
            .filter(|&t| strike(state, caster, damage, scale, t, 1.0, caster.position))
            .count();
    }
    if let Some(transformation) = &params.transformation {
        if state.begin_transformation(caster.id, instance.id, transformation) {
            affected += 1;
        }
    }
    affected
}
