//! Central combat scheduler
//!
//! Owns the shared [`CombatState`] and every equipped [`SkillInstance`], and
//! advances all timers once per [`CombatEngine::tick`] in a fixed order:
//! cooldowns, casts, timed effects, projectiles, summons, transformations,
//! gauge decay.

use std::collections::BTreeMap;
use std::sync::Arc;

use ember_core::EntityId;
use ember_physics::{Shape, SpatialError};
use tracing::{debug, info};

use crate::cast::{self, SkillTarget, UseOutcome};
use crate::combatant::{CombatWorld, Combatant};
use crate::config::CombatConfig;
use crate::damage::{AttackerProfile, DamageParams};
use crate::error::SkillError;
use crate::events::{CombatEvent, DespawnReason, ProjectileEnd};
use crate::execute::execute;
use crate::projectile::Projectile;
use crate::skill::{SkillDefinition, SkillInstance, SkillInstanceId, SkillKind};
use crate::state::{CombatState, Hit};
use crate::stats::{Condition, ModifierSource};
use crate::summon::SummonCommand;
use crate::targeting;
use crate::ultimate::{GaugeConfig, Transformation, UltimateGauge};

/// Owns the combat world and every equipped skill
#[derive(Debug)]
pub struct CombatEngine {
    state: CombatState,
    skills: BTreeMap<SkillInstanceId, SkillInstance>,
    next_skill: u64,
}

impl CombatEngine {
    pub fn new(config: CombatConfig) -> Result<Self, SpatialError> {
        Ok(Self {
            state: CombatState::new(config)?,
            skills: BTreeMap::new(),
            next_skill: 0,
        })
    }

    pub fn state(&self) -> &CombatState {
        &self.state
    }

    pub fn world(&self) -> &CombatWorld {
        &self.state.world
    }

    pub fn world_mut(&mut self) -> &mut CombatWorld {
        &mut self.state.world
    }

    pub fn config(&self) -> &CombatConfig {
        &self.state.config
    }

    pub fn spawn(&mut self, combatant: Combatant) -> EntityId {
        debug!("Spawned {} ({})", combatant.name, combatant.id);
        self.state.world.spawn(combatant)
    }

    /// Remove a combatant along with the skills it owns, their effects and
    /// summons, its gauge, and its transformation
    pub fn despawn(&mut self, id: EntityId) -> Option<Combatant> {
        let owned: Vec<SkillInstanceId> = self
            .skills
            .values()
            .filter(|s| s.owner == id)
            .map(|s| s.id)
            .collect();
        for skill in owned {
            self.unequip_skill(skill);
        }
        for instance in self.skills.values_mut() {
            instance.summons.remove(id);
        }
        self.state.end_transformation(id, true);
        self.state.gauges.remove(&id);
        self.state.world.despawn(id)
    }

    /// Give `owner` an ultimate gauge, replacing any existing one
    pub fn register_gauge(&mut self, owner: EntityId, config: GaugeConfig) {
        self.state.gauges.insert(owner, UltimateGauge::new(config));
    }

    pub fn gauge(&self, owner: EntityId) -> Option<&UltimateGauge> {
        self.state.gauges.get(&owner)
    }

    pub fn gauge_mut(&mut self, owner: EntityId) -> Option<&mut UltimateGauge> {
        self.state.gauges.get_mut(&owner)
    }

    /// Report a hit landed by `owner` outside the engine
    pub fn notify_hit(&mut self, owner: EntityId) {
        if let Some(gauge) = self.gauge_mut(owner) {
            gauge.on_hit();
        }
    }

    /// Report a kill made by `owner` outside the engine
    pub fn notify_kill(&mut self, owner: EntityId) {
        if let Some(gauge) = self.gauge_mut(owner) {
            gauge.on_kill();
        }
    }

    /// Report damage `owner` took outside the engine
    pub fn notify_damage_received(&mut self, owner: EntityId, damage: f32) {
        if let Some(gauge) = self.gauge_mut(owner) {
            gauge.on_damage_received(damage);
        }
    }

    /// Equip a skill on `owner` at level 1
    pub fn equip_skill(
        &mut self,
        owner: EntityId,
        definition: impl Into<Arc<SkillDefinition>>,
    ) -> Result<SkillInstanceId, SkillError> {
        if !self.state.world.contains(owner) {
            return Err(SkillError::CasterMissing(owner));
        }
        self.next_skill += 1;
        let id = SkillInstanceId(self.next_skill);
        let instance = SkillInstance::new(id, owner, definition.into());

        if matches!(instance.definition.kind, SkillKind::Ultimate(_)) {
            let config = &self.state.config;
            self.state
                .gauges
                .entry(owner)
                .or_insert_with(|| UltimateGauge::new(config.gauge.clone()));
        }
        apply_passive(&mut self.state.world, &instance);

        info!(
            "{} equipped {} ({})",
            owner,
            instance.definition.name,
            instance.variant().name()
        );
        self.skills.insert(id, instance);
        Ok(id)
    }

    /// Remove a skill, cancelling its cast and undoing everything it left
    /// behind. Returns false if it was not equipped.
    pub fn unequip_skill(&mut self, id: SkillInstanceId) -> bool {
        let Some(mut instance) = self.skills.remove(&id) else {
            return false;
        };
        let owner = instance.owner;
        if cast::cancel(&mut instance.cast) {
            self.state.emit(CombatEvent::CastCancelled { caster: owner, instance: id });
        }
        instance.effects.clear(&mut self.state.world);
        for creature in instance.summons.drain() {
            self.state.world.despawn(creature.entity);
            self.state.emit(CombatEvent::SummonDespawned {
                owner,
                creature: creature.entity,
                reason: DespawnReason::Unequipped,
            });
        }
        if let Some(stats) = self.state.world.stats_mut(owner) {
            stats.remove_source(ModifierSource::Passive(id));
        }
        if self.state.transformations.get(&owner).is_some_and(|t| t.skill == id) {
            self.state.end_transformation(owner, true);
        }
        debug!("{} unequipped {}", owner, instance.definition.name);
        true
    }

    /// Raise a skill's level. Returns false at max level.
    pub fn level_up_skill(&mut self, id: SkillInstanceId) -> Result<bool, SkillError> {
        let instance = self.skills.get_mut(&id).ok_or(SkillError::UnknownSkill(id))?;
        let raised = instance.level_up();
        if raised {
            apply_passive(&mut self.state.world, instance);
        }
        Ok(raised)
    }

    pub fn skill(&self, id: SkillInstanceId) -> Option<&SkillInstance> {
        self.skills.get(&id)
    }

    pub fn skills_of(&self, owner: EntityId) -> impl Iterator<Item = &SkillInstance> {
        self.skills.values().filter(move |s| s.owner == owner)
    }

    /// Whether a skill could be used right now
    pub fn can_use(&self, id: SkillInstanceId) -> Result<(), SkillError> {
        let instance = self.skills.get(&id).ok_or(SkillError::UnknownSkill(id))?;
        check_usable(&self.state, instance)
    }

    /// Use a skill: execute immediately, or start its cast
    pub fn use_skill(&mut self, id: SkillInstanceId, target: SkillTarget) -> Result<UseOutcome, SkillError> {
        let instance = self.skills.get_mut(&id).ok_or(SkillError::UnknownSkill(id))?;
        if let Err(e) = check_usable(&self.state, instance).and_then(|()| check_target(&self.state, instance, target)) {
            debug!("{} rejected: {}", instance.definition.name, e);
            return Err(e);
        }

        let outcome = cast::begin(instance, target);
        match outcome {
            UseOutcome::Executed => {
                let spent = pay(&mut self.state, instance)?;
                execute(&mut self.state, instance, target, spent);
            }
            UseOutcome::CastStarted { duration } => {
                debug!("{} started casting {} ({:.2}s)", instance.owner, instance.definition.name, duration);
                self.state.emit(CombatEvent::CastStarted {
                    caster: instance.owner,
                    skill: instance.definition.id,
                    instance: id,
                    duration,
                });
            }
        }
        Ok(outcome)
    }

    /// Abort a cast without paying for it. Returns false if not casting.
    pub fn cancel_cast(&mut self, id: SkillInstanceId) -> bool {
        let Some(instance) = self.skills.get_mut(&id) else {
            return false;
        };
        let cancelled = cast::cancel(&mut instance.cast);
        if cancelled {
            self.state.emit(CombatEvent::CastCancelled {
                caster: instance.owner,
                instance: id,
            });
        }
        cancelled
    }

    /// Strip the effect one skill left on `target`, reversing its stat
    /// changes. Returns false if there was none.
    pub fn dispel(&mut self, id: SkillInstanceId, target: EntityId) -> bool {
        let Some(instance) = self.skills.get_mut(&id) else {
            return false;
        };
        let Some(kind) = instance.effects.get(target).map(|e| e.kind) else {
            return false;
        };
        instance.effects.remove(target, &mut self.state.world);
        debug!("Dispelled {:?} from {}", kind, target);
        self.state.emit(CombatEvent::EffectExpired { target, kind });
        true
    }

    /// End `owner`'s transformation early. Returns false if none is active.
    pub fn end_transformation(&mut self, owner: EntityId) -> bool {
        self.state.end_transformation(owner, true)
    }

    pub fn transformation(&self, owner: EntityId) -> Option<&Transformation> {
        self.state.transformations.get(&owner)
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.state.projectiles
    }

    pub fn events(&self) -> &[CombatEvent] {
        self.state.events()
    }

    /// Take every queued event. Hosts drain once per frame; an undrained
    /// queue sheds its oldest events at `CombatConfig::event_capacity`.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        self.state.drain_events()
    }

    /// Advance the simulation by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        if !(dt > 0.0) {
            return;
        }
        for instance in self.skills.values_mut() {
            instance.cooldown.tick(dt);
        }
        self.tick_casts(dt);
        self.tick_effects(dt);
        self.tick_projectiles(dt);
        self.tick_summons(dt);
        self.state.tick_transformations(dt);
        for gauge in self.state.gauges.values_mut() {
            gauge.decay(dt);
        }
    }

    fn tick_casts(&mut self, dt: f32) {
        for instance in self.skills.values_mut() {
            if !instance.is_casting() {
                continue;
            }
            let interruption = match self.state.world.get(instance.owner) {
                None => Some("caster left the world".to_string()),
                Some(caster) if !caster.is_alive() => Some("caster died".to_string()),
                Some(caster) => caster.stats.skill_lockout().map(|c| format!("caster is {c}")),
            };
            if let Some(reason) = interruption {
                cast::cancel(&mut instance.cast);
                interrupt(&mut self.state, instance, reason);
                continue;
            }

            let Some(target) = cast::advance(&mut instance.cast, dt) else {
                continue;
            };
            match pay(&mut self.state, instance) {
                Ok(spent) => {
                    execute(&mut self.state, instance, target, spent);
                }
                Err(e) => interrupt(&mut self.state, instance, e.to_string()),
            }
        }
    }

    fn tick_effects(&mut self, dt: f32) {
        for instance in self.skills.values_mut() {
            if instance.effects.is_empty() {
                continue;
            }
            let report = instance.effects.tick(dt, &mut self.state.world);
            for pulse in report.pulses {
                self.state.apply_pulse(pulse);
            }
            for (target, kind) in report.expired {
                debug!("{:?} expired on {}", kind, target);
                self.state.emit(CombatEvent::EffectExpired { target, kind });
            }
        }
    }

    fn tick_projectiles(&mut self, dt: f32) {
        let projectiles = std::mem::take(&mut self.state.projectiles);
        let mut in_flight = Vec::with_capacity(projectiles.len());

        for mut projectile in projectiles {
            if let Some(target) = projectile.homing_target {
                match self.state.world.get(target).filter(|c| c.is_alive()) {
                    Some(enemy) => projectile.steer(enemy.position(), dt),
                    None => projectile.homing_target = None,
                }
            }

            let (start, end) = projectile.advance(dt);
            let sweep = Shape::capsule(start, end, projectile.collision_radius);
            let (side, owner) = (projectile.side, projectile.owner);
            let candidates = self
                .state
                .world
                .query(&sweep, |c| !projectile.has_hit(c.id) && targeting::is_enemy(side, owner, c));

            let mut spent = false;
            for target in candidates {
                let position = self.state.world.position(target).unwrap_or(projectile.position);
                let landed = self.state.resolve_hit(Hit {
                    striker: Some(owner),
                    credit: Some(owner),
                    attacker: projectile.attacker,
                    params: &projectile.damage,
                    level_scale: projectile.level_scale,
                    target,
                    falloff: 1.0,
                    push_direction: projectile.direction,
                });
                // A blinded owner's shot passes through without using a pierce
                if landed.is_none() {
                    continue;
                }
                self.state.emit(CombatEvent::ProjectileImpact {
                    projectile: projectile.id,
                    target,
                    position,
                });
                if projectile.register_hit(target) {
                    spent = true;
                    break;
                }
            }

            let reason = if spent {
                Some(ProjectileEnd::Spent)
            } else if projectile.out_of_range() {
                Some(ProjectileEnd::OutOfRange)
            } else {
                None
            };
            match reason {
                Some(reason) => {
                    debug!("{} destroyed: {:?}", projectile.id, reason);
                    self.state.emit(CombatEvent::ProjectileDestroyed {
                        projectile: projectile.id,
                        position: projectile.position,
                        reason,
                    });
                }
                None => in_flight.push(projectile),
            }
        }

        self.state.projectiles = in_flight;
    }

    fn tick_summons(&mut self, dt: f32) {
        let strike = DamageParams::default();

        for instance in self.skills.values_mut() {
            let SkillKind::Summon(params) = &instance.definition.kind else {
                continue;
            };
            for entity in instance.summons.entities() {
                let alive = self.state.world.is_alive(entity);
                let Some(creature) = instance.summons.get_mut(entity) else {
                    continue;
                };
                let expired = creature.tick_timers(dt);
                if !alive || expired {
                    let owner = creature.owner;
                    instance.summons.remove(entity);
                    self.state.world.despawn(entity);
                    let reason = if alive { DespawnReason::Expired } else { DespawnReason::Killed };
                    debug!("Summon {} despawned: {:?}", entity, reason);
                    self.state.emit(CombatEvent::SummonDespawned {
                        owner,
                        creature: entity,
                        reason,
                    });
                    continue;
                }

                let stunned = self
                    .state
                    .world
                    .get(entity)
                    .is_some_and(|c| c.stats.has_condition(Condition::Stunned));
                if stunned {
                    continue;
                }

                match creature.think(&self.state.world, params) {
                    SummonCommand::Hold => {}
                    SummonCommand::MoveTo { goal, stop_distance } => {
                        self.state
                            .world
                            .step_toward(entity, goal, params.move_speed * dt, stop_distance);
                    }
                    SummonCommand::Attack(target) => {
                        if !creature.ready_to_attack() {
                            continue;
                        }
                        let Some(target_position) = self.state.world.position(target) else {
                            continue;
                        };
                        let Some(me) = self.state.world.get_mut(entity) else {
                            continue;
                        };
                        me.transform.look_at(target_position);
                        let attacker = AttackerProfile::from_stats(&me.stats);
                        let from = me.position();
                        creature.attack_timer = params.attack_cooldown;
                        let owner = creature.owner;
                        self.state.resolve_hit(Hit {
                            striker: Some(entity),
                            credit: Some(owner),
                            attacker,
                            params: &strike,
                            level_scale: 1.0,
                            target,
                            falloff: 1.0,
                            push_direction: target_position - from,
                        });
                    }
                }
            }
        }
    }
}

/// Caster present and `can_use` satisfied
fn check_usable(state: &CombatState, instance: &SkillInstance) -> Result<(), SkillError> {
    let caster = state
        .world
        .get(instance.owner)
        .ok_or(SkillError::CasterMissing(instance.owner))?;
    instance.can_use(&caster.stats, state.gauges.get(&instance.owner))
}

/// An explicit single-target debuff must name a valid enemy in range
fn check_target(state: &CombatState, instance: &SkillInstance, target: SkillTarget) -> Result<(), SkillError> {
    match (&instance.definition.kind, target) {
        (SkillKind::Debuff(params), SkillTarget::Entity(id)) if params.radius <= 0.0 => {
            targeting::single_enemy(&state.world, instance.owner, id, params.range)
                .map(|_| ())
                .ok_or(SkillError::NoTarget)
        }
        _ => Ok(()),
    }
}

/// Returns the gauge drained
fn pay(state: &mut CombatState, instance: &mut SkillInstance) -> Result<f32, SkillError> {
    let owner = instance.owner;
    let stats = state
        .world
        .stats_mut(owner)
        .ok_or(SkillError::CasterMissing(owner))?;
    cast::commit(instance, stats, state.gauges.get_mut(&owner))
}

fn interrupt(state: &mut CombatState, instance: &SkillInstance, reason: String) {
    debug!("{} interrupted: {}", instance.definition.name, reason);
    state.emit(CombatEvent::CastInterrupted {
        caster: instance.owner,
        instance: instance.id,
        reason,
    });
}

fn apply_passive(world: &mut CombatWorld, instance: &SkillInstance) {
    let SkillKind::Passive(params) = &instance.definition.kind else {
        return;
    };
    let Some(stats) = world.stats_mut(instance.owner) else {
        return;
    };
    let level = instance.level();
    stats.apply_modifiers(
        ModifierSource::Passive(instance.id),
        params.modifiers.iter().map(|m| m.at_level(level)),
    );
}
