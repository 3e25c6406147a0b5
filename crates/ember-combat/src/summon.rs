//! Summoned creatures and their behavior
//!
//! A creature is a regular [`Combatant`](crate::Combatant) in the world plus
//! a roster entry holding its AI state. [`SummonedCreature::think`] decides
//! what to do from the world; the engine carries the decision out.

use std::collections::VecDeque;

use ember_core::EntityId;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combatant::CombatWorld;
use crate::skill::SummonParams;
use crate::targeting;

/// How a creature spends its time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummonBehavior {
    /// Stand still
    Idle,
    /// Stay near the owner
    Follow,
    /// Fight anything nearby, otherwise follow
    #[default]
    FollowAndAttack,
    /// Attack one target, then follow
    AttackTarget,
    /// Walk back and forth in front of the spawn point
    Patrol,
}

/// What a creature wants to do this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SummonCommand {
    Hold,
    MoveTo { goal: Vec3, stop_distance: f32 },
    Attack(EntityId),
}

/// AI state for one summoned creature
#[derive(Debug, Clone, PartialEq)]
pub struct SummonedCreature {
    pub entity: EntityId,
    pub owner: EntityId,
    pub behavior: SummonBehavior,
    /// Seconds left; `None` lives until killed
    pub lifetime: Option<f32>,
    pub target: Option<EntityId>,
    /// Seconds until the next attack is allowed
    pub attack_timer: f32,
    /// Spawn point, used by patrol
    pub anchor: Vec3,
    /// Far end of the patrol route
    pub patrol_end: Vec3,
    heading_out: bool,
}

impl SummonedCreature {
    pub fn new(entity: EntityId, owner: EntityId, params: &SummonParams, anchor: Vec3, facing: Vec3) -> Self {
        let facing = Vec3::new(facing.x, 0.0, facing.z).try_normalize().unwrap_or(Vec3::NEG_Z);
        Self {
            entity,
            owner,
            behavior: params.behavior,
            lifetime: (params.lifetime > 0.0).then_some(params.lifetime),
            target: None,
            attack_timer: 0.0,
            anchor,
            patrol_end: anchor + facing * params.leash_distance,
            heading_out: true,
        }
    }

    pub fn with_target(mut self, target: Option<EntityId>) -> Self {
        self.target = target;
        self
    }

    /// Count down lifetime and attack timer. Returns true when the lifetime ran out.
    pub fn tick_timers(&mut self, dt: f32) -> bool {
        self.attack_timer = (self.attack_timer - dt).max(0.0);
        match self.lifetime.as_mut() {
            Some(remaining) => {
                *remaining -= dt;
                *remaining <= 0.0
            }
            None => false,
        }
    }

    pub fn ready_to_attack(&self) -> bool {
        self.attack_timer <= 0.0
    }

    /// Decide this tick's action. May switch targets, or fall back to
    /// following when an attack target is gone.
    pub fn think(&mut self, world: &CombatWorld, params: &SummonParams) -> SummonCommand {
        let Some(me) = world.get(self.entity) else {
            return SummonCommand::Hold;
        };
        let position = me.position();
        let side = me.side();

        match self.behavior {
            SummonBehavior::Idle => SummonCommand::Hold,
            SummonBehavior::Follow => self.follow(world, params),
            SummonBehavior::FollowAndAttack => {
                if !self.target_valid(world, position, params.sense_radius) {
                    self.target =
                        targeting::nearest_enemy(world, self.entity, side, position, params.sense_radius);
                }
                match self.target {
                    Some(target) => self.engage(world, target, position, params),
                    None => self.follow(world, params),
                }
            }
            SummonBehavior::AttackTarget => {
                let alive = self.target.is_some_and(|t| {
                    world
                        .get(t)
                        .is_some_and(|c| targeting::is_enemy(side, self.entity, c))
                });
                match self.target {
                    Some(target) if alive => self.engage(world, target, position, params),
                    _ => {
                        self.behavior = SummonBehavior::Follow;
                        self.target = None;
                        self.follow(world, params)
                    }
                }
            }
            SummonBehavior::Patrol => {
                let goal = if self.heading_out { self.patrol_end } else { self.anchor };
                if position.distance(goal) <= 0.1 {
                    self.heading_out = !self.heading_out;
                    return SummonCommand::Hold;
                }
                SummonCommand::MoveTo {
                    goal,
                    stop_distance: 0.0,
                }
            }
        }
    }

    fn target_valid(&self, world: &CombatWorld, position: Vec3, sense_radius: f32) -> bool {
        let Some(target) = self.target.and_then(|t| world.get(t)) else {
            return false;
        };
        let Some(me) = world.get(self.entity) else {
            return false;
        };
        targeting::is_enemy(me.side(), self.entity, target)
            && position.distance(target.position()) <= sense_radius + target.body_radius
    }

    fn engage(&self, world: &CombatWorld, target: EntityId, position: Vec3, params: &SummonParams) -> SummonCommand {
        let Some(enemy) = world.get(target) else {
            return SummonCommand::Hold;
        };
        let reach = params.attack_range + enemy.body_radius;
        if position.distance(enemy.position()) <= reach {
            SummonCommand::Attack(target)
        } else {
            SummonCommand::MoveTo {
                goal: enemy.position(),
                stop_distance: params.attack_range,
            }
        }
    }

    fn follow(&self, world: &CombatWorld, params: &SummonParams) -> SummonCommand {
        let (Some(owner), Some(position)) = (world.position(self.owner), world.position(self.entity)) else {
            return SummonCommand::Hold;
        };
        if position.distance(owner) > params.leash_distance {
            SummonCommand::MoveTo {
                goal: owner,
                stop_distance: params.leash_distance,
            }
        } else {
            SummonCommand::Hold
        }
    }
}

/// Creatures summoned by one skill instance, oldest first
#[derive(Debug, Clone, Default)]
pub struct SummonRoster {
    creatures: VecDeque<SummonedCreature>,
}

impl SummonRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evict the oldest creatures until one more fits under `cap`.
    /// Returns the evicted creatures, oldest first.
    pub fn make_room(&mut self, cap: usize) -> Vec<SummonedCreature> {
        let cap = cap.max(1);
        let mut evicted = Vec::new();
        while self.creatures.len() >= cap {
            match self.creatures.pop_front() {
                Some(oldest) => evicted.push(oldest),
                None => break,
            }
        }
        evicted
    }

    /// Add a creature as the newest. Call [`Self::make_room`] first to honor a cap.
    pub fn push(&mut self, creature: SummonedCreature) {
        self.creatures.push_back(creature);
    }

    /// Remove a creature by entity id
    pub fn remove(&mut self, entity: EntityId) -> Option<SummonedCreature> {
        let index = self.creatures.iter().position(|c| c.entity == entity)?;
        self.creatures.remove(index)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut SummonedCreature> {
        self.creatures.iter_mut().find(|c| c.entity == entity)
    }

    /// Entity ids, oldest first
    pub fn entities(&self) -> Vec<EntityId> {
        self.creatures.iter().map(|c| c.entity).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SummonedCreature> {
        self.creatures.iter()
    }

    pub fn drain(&mut self) -> Vec<SummonedCreature> {
        self.creatures.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }
}
