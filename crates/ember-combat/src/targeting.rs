//! Target resolution: cones, chains, spheres, and ally areas
//!
//! Hostility is relative to the caster's [`Side`]: a friendly caster hits
//! hostile entities and vice versa. Results are nearest first.

use std::collections::HashSet;

use ember_core::EntityId;
use ember_physics::Shape;
use glam::Vec3;

use crate::combatant::{CombatWorld, Combatant, Side};
use crate::config::CombatConfig;
use crate::damage::HealKind;
use crate::skill::MeleeParams;

/// Alive, not `exclude`, and on a side opposed to `side`
pub fn is_enemy(side: Side, exclude: EntityId, candidate: &Combatant) -> bool {
    candidate.id != exclude && candidate.is_alive() && side.opposes(candidate.side())
}

/// Alive, not `exclude`, and on the same non-neutral side
pub fn is_ally(side: Side, exclude: EntityId, candidate: &Combatant) -> bool {
    candidate.id != exclude
        && candidate.is_alive()
        && side != Side::Neutral
        && candidate.side() == side
}

/// One resolved melee hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeleeHit {
    pub target: EntityId,
    /// Damage multiplier (1.0 for primary hits, compounding falloff for chains)
    pub scale: f32,
    /// 0 for primary hits
    pub chain_depth: u32,
}

/// Enemies inside the caster's attack cone
pub fn cone(world: &CombatWorld, caster: EntityId, range: f32, angle_degrees: f32) -> Vec<EntityId> {
    let Some(origin) = world.get(caster) else {
        return Vec::new();
    };
    let side = origin.side();
    let shape = Shape::cone(origin.position(), origin.forward(), range, angle_degrees);
    world.query(&shape, |c| is_enemy(side, caster, c))
}

/// Cone hits followed by their chains.
///
/// Every primary hit is marked visited before chaining starts, and the
/// visited set is shared across the whole activation, so no entity is hit
/// twice.
pub fn melee(world: &CombatWorld, caster: EntityId, params: &MeleeParams, config: &CombatConfig) -> Vec<MeleeHit> {
    let Some(side) = world.get(caster).map(Combatant::side) else {
        return Vec::new();
    };
    let primary = cone(world, caster, params.range, params.angle);
    let mut visited: HashSet<EntityId> = primary.iter().copied().collect();
    visited.insert(caster);

    let mut hits = Vec::new();
    for &first in &primary {
        hits.push(MeleeHit {
            target: first,
            scale: 1.0,
            chain_depth: 0,
        });

        let mut current = first;
        let mut scale = 1.0;
        for depth in 1..=params.max_chain_targets {
            let Some(from) = world.position(current) else {
                break;
            };
            let shape = Shape::sphere(from, config.chain_radius);
            let next = world
                .query(&shape, |c| !visited.contains(&c.id) && is_enemy(side, caster, c))
                .into_iter()
                .next();
            let Some(next) = next else {
                break;
            };
            visited.insert(next);
            scale *= config.chain_falloff;
            hits.push(MeleeHit {
                target: next,
                scale,
                chain_depth: depth,
            });
            current = next;
        }
    }
    hits
}

/// Enemies within `radius` of `center`, capped at `max_targets` (0 = unlimited)
pub fn area(world: &CombatWorld, caster: EntityId, side: Side, center: Vec3, radius: f32, max_targets: usize) -> Vec<EntityId> {
    let mut targets = world.query(&Shape::sphere(center, radius), |c| is_enemy(side, caster, c));
    if max_targets > 0 {
        targets.truncate(max_targets);
    }
    targets
}

/// The caster followed by allies within `radius` of `center` that `accept` passes.
/// A radius of 0 returns only the caster.
pub fn allies(
    world: &CombatWorld,
    caster: EntityId,
    center: Vec3,
    radius: f32,
    mut accept: impl FnMut(&Combatant) -> bool,
) -> Vec<EntityId> {
    let Some(side) = world.get(caster).map(Combatant::side) else {
        return Vec::new();
    };
    let mut targets = vec![caster];
    if radius > 0.0 {
        targets.extend(world.query(&Shape::sphere(center, radius), |c| {
            is_ally(side, caster, c) && accept(c)
        }));
    }
    targets
}

/// Heal recipients: the caster plus nearby allies still missing the healed resource
pub fn heal_targets(world: &CombatWorld, caster: EntityId, center: Vec3, radius: f32, kind: HealKind) -> Vec<EntityId> {
    allies(world, caster, center, radius, |c| match kind {
        HealKind::Hp => !c.stats.hp_full(),
        HealKind::Mp => !c.stats.mp_full(),
        HealKind::Both => !(c.stats.hp_full() && c.stats.mp_full()),
    })
}

/// Validate an explicit single target
pub fn single_enemy(world: &CombatWorld, caster: EntityId, target: EntityId, range: f32) -> Option<EntityId> {
    let origin = world.get(caster)?;
    let candidate = world.get(target)?;
    let reach = range + candidate.body_radius;
    (is_enemy(origin.side(), caster, candidate) && origin.position().distance(candidate.position()) <= reach)
        .then_some(target)
}

/// Closest enemy within `radius` of `from`
pub fn nearest_enemy(world: &CombatWorld, caster: EntityId, side: Side, from: Vec3, radius: f32) -> Option<EntityId> {
    area(world, caster, side, from, radius, 1).into_iter().next()
}
