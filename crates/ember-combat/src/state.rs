//! Shared combat state: the world, gauges, transformations, projectiles, and
//! the event queue. Skill instances mutate it; the engine owns it.

use std::collections::HashMap;

use ember_core::EntityId;
use ember_physics::{SpatialError, SpatialIndex};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::combatant::CombatWorld;
use crate::config::CombatConfig;
use crate::damage::{roll_damage, AttackerProfile, DamageParams, DamageRoll};
use crate::effects::{EffectKind, EffectPulse};
use crate::events::CombatEvent;
use crate::projectile::{Projectile, ProjectileId};
use crate::skill::SkillInstanceId;
use crate::stats::Condition;
use crate::ultimate::{Transformation, TransformationParams, UltimateGauge};

/// One damaging hit to resolve
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    /// Entity delivering the hit (blindness is checked on it)
    pub striker: Option<EntityId>,
    /// Entity credited with gauge for the hit and kill
    pub credit: Option<EntityId>,
    pub attacker: AttackerProfile,
    pub params: &'a DamageParams,
    pub level_scale: f32,
    pub target: EntityId,
    /// Multiplier on the final damage (chain falloff)
    pub falloff: f32,
    /// Knockback heading; flattened onto the ground plane
    pub push_direction: Vec3,
}

/// Everything skill execution reads and writes besides the skill instance itself
#[derive(Debug)]
pub struct CombatState {
    pub world: CombatWorld,
    pub gauges: HashMap<EntityId, UltimateGauge>,
    pub transformations: HashMap<EntityId, Transformation>,
    pub projectiles: Vec<Projectile>,
    pub config: CombatConfig,
    events: Vec<CombatEvent>,
    rng: StdRng,
    next_projectile: u64,
}

impl CombatState {
    pub fn new(config: CombatConfig) -> Result<Self, SpatialError> {
        let index = SpatialIndex::with_config(config.spatial.clone())?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            world: CombatWorld::with_index(index),
            gauges: HashMap::new(),
            transformations: HashMap::new(),
            projectiles: Vec::new(),
            config,
            events: Vec::new(),
            rng,
            next_projectile: 0,
        })
    }

    /// Queue an event, shedding the oldest half once the queue is at capacity
    pub fn emit(&mut self, event: CombatEvent) {
        let capacity = self.config.event_capacity;
        if capacity > 0 && self.events.len() >= capacity {
            let dropped = (capacity / 2).max(1);
            warn!("Event queue full at {} events, dropping the oldest {}", capacity, dropped);
            self.events.drain(..dropped);
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn next_projectile_id(&mut self) -> ProjectileId {
        self.next_projectile += 1;
        ProjectileId(self.next_projectile)
    }

    /// Roll and apply one hit. Returns the roll, or `None` if the target was
    /// already dead or missing, or the striker is blinded.
    pub fn resolve_hit(&mut self, hit: Hit<'_>) -> Option<DamageRoll> {
        let defender = self.world.get(hit.target).filter(|c| c.is_alive())?;
        let defense = defender.stats.defense();

        let blinded = hit
            .striker
            .and_then(|s| self.world.get(s))
            .is_some_and(|s| s.stats.has_condition(Condition::Blinded));
        if blinded {
            debug!("Blinded attack on {} missed", hit.target);
            return None;
        }

        let mut roll = roll_damage(hit.params, hit.level_scale, &hit.attacker, defense, &self.config, &mut self.rng);
        if hit.falloff != 1.0 {
            roll.final_amount = (roll.final_amount * hit.falloff).max(1.0);
        }
        self.apply_damage(hit.striker, hit.credit, hit.target, roll.final_amount, roll.is_crit);

        let knockback = hit.params.knockback;
        if knockback > 0.0 && self.world.is_alive(hit.target) {
            let flat = Vec3::new(hit.push_direction.x, 0.0, hit.push_direction.z);
            if let Some(direction) = flat.try_normalize() {
                self.world.push(hit.target, direction * knockback);
            }
        }
        Some(roll)
    }

    /// Take HP from `target`, feed gauges, and report the kill.
    /// Returns the HP actually lost.
    pub fn apply_damage(
        &mut self,
        source: Option<EntityId>,
        credit: Option<EntityId>,
        target: EntityId,
        amount: f32,
        is_crit: bool,
    ) -> f32 {
        let Some(stats) = self.world.stats_mut(target).filter(|s| s.is_alive()) else {
            return 0.0;
        };
        let lost = stats.take_damage(amount);
        let killed = !stats.is_alive();

        self.emit(CombatEvent::Damaged {
            attacker: source,
            target,
            amount,
            is_crit,
        });
        if let Some(gauge) = credit.and_then(|c| self.gauges.get_mut(&c)) {
            gauge.on_hit();
        }
        if let Some(gauge) = self.gauges.get_mut(&target) {
            gauge.on_damage_received(lost);
        }

        if killed {
            if let Some(name) = self.world.get(target).map(|c| c.name.clone()) {
                info!("{} was slain", name);
            }
            self.emit(CombatEvent::Killed { killer: source, target });
            if let Some(gauge) = credit.and_then(|c| self.gauges.get_mut(&c)) {
                gauge.on_kill();
            }
        }
        lost
    }

    /// Restore HP and MP on a living target. Returns what was restored.
    pub fn restore(&mut self, target: EntityId, hp: f32, mp: f32) -> (f32, f32) {
        let Some(stats) = self.world.stats_mut(target).filter(|s| s.is_alive()) else {
            return (0.0, 0.0);
        };
        let restored = (stats.heal_hp(hp), stats.heal_mp(mp));
        if restored.0 > 0.0 || restored.1 > 0.0 {
            self.emit(CombatEvent::Healed {
                target,
                hp: restored.0,
                mp: restored.1,
            });
        }
        restored
    }

    /// Apply one damage- or heal-over-time pulse
    pub fn apply_pulse(&mut self, pulse: EffectPulse) {
        match pulse.kind {
            EffectKind::DamageOverTime => {
                self.apply_damage(Some(pulse.source), None, pulse.target, -pulse.amount, false);
            }
            EffectKind::HealOverTime => {
                self.restore(pulse.target, pulse.amount, 0.0);
            }
            _ => {}
        }
    }

    /// Start a transformation on `caster`, ending any active one first
    pub fn begin_transformation(&mut self, caster: EntityId, skill: SkillInstanceId, params: &TransformationParams) -> bool {
        if self.transformations.contains_key(&caster) {
            self.end_transformation(caster, true);
        }
        let Some(stats) = self.world.stats_mut(caster) else {
            return false;
        };
        let transformation = Transformation::begin(stats, skill, params);
        info!("{} transformed for {:.1}s", caster, params.duration);
        self.transformations.insert(caster, transformation);
        self.emit(CombatEvent::TransformationStarted {
            caster,
            duration: params.duration,
        });
        true
    }

    /// End the transformation on `caster`. Returns false if there was none.
    pub fn end_transformation(&mut self, caster: EntityId, early: bool) -> bool {
        let Some(transformation) = self.transformations.remove(&caster) else {
            return false;
        };
        if let Some(stats) = self.world.stats_mut(caster) {
            transformation.end(stats);
        }
        self.emit(CombatEvent::TransformationEnded { caster, early });
        true
    }

    /// Count down every transformation, ending the expired ones
    pub fn tick_transformations(&mut self, dt: f32) {
        let mut casters: Vec<EntityId> = self.transformations.keys().copied().collect();
        casters.sort();
        for caster in casters {
            let expired = self
                .transformations
                .get_mut(&caster)
                .is_some_and(|t| t.tick(dt));
            if expired {
                self.end_transformation(caster, false);
            }
        }
    }
}
