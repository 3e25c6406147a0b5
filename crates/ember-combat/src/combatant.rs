//! Combatants and the world they share

use std::collections::HashMap;

use ember_core::{EntityId, Transform};
use ember_physics::{Body, Shape, SpatialIndex, SpatialQuery};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::stats::{BaseStats, CharacterStats};

/// Tags that stand in for a faction system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTag {
    Player,
    Ally,
    Enemy,
    Monster,
    Summon,
}

/// Which side of a fight an entity is on, derived from its tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    /// Players, allies, and their summons
    Friendly,
    /// Enemies and monsters
    Hostile,
    /// Neither; never a valid target
    Neutral,
}

impl Side {
    /// Whether an entity on `other` is a valid enemy for this side
    pub fn opposes(self, other: Side) -> bool {
        matches!(
            (self, other),
            (Side::Friendly, Side::Hostile) | (Side::Hostile, Side::Friendly)
        )
    }

    /// Tags given to creatures summoned by this side
    pub fn summon_tags(self) -> Vec<EntityTag> {
        match self {
            Side::Hostile => vec![EntityTag::Monster, EntityTag::Summon],
            _ => vec![EntityTag::Ally, EntityTag::Summon],
        }
    }
}

/// Anything that fights: players, monsters, summoned creatures
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: EntityId,
    pub name: String,
    pub transform: Transform,
    pub tags: Vec<EntityTag>,
    pub stats: CharacterStats,
    /// Character level (summons scale with their owner's level)
    pub level: u32,
    /// Collision radius used by overlap queries
    pub body_radius: f32,
}

impl Combatant {
    /// Create a level 1 combatant with no tags
    pub fn new(name: impl Into<String>, position: Vec3, base: BaseStats) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            transform: Transform::from_position(position),
            tags: Vec::new(),
            stats: CharacterStats::new(base),
            level: 1,
            body_radius: 0.5,
        }
    }

    /// A player character
    pub fn player(name: impl Into<String>, position: Vec3, base: BaseStats) -> Self {
        Self::new(name, position, base).with_tags([EntityTag::Player])
    }

    /// A hostile monster
    pub fn monster(name: impl Into<String>, position: Vec3, base: BaseStats) -> Self {
        Self::new(name, position, base).with_tags([EntityTag::Enemy, EntityTag::Monster])
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = EntityTag>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.max(1);
        self
    }

    pub fn facing(mut self, direction: Vec3) -> Self {
        self.transform.face(direction);
        self
    }

    pub fn with_body_radius(mut self, radius: f32) -> Self {
        self.body_radius = radius.max(0.0);
        self
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn forward(&self) -> Vec3 {
        self.transform.forward()
    }

    pub fn is_alive(&self) -> bool {
        self.stats.is_alive()
    }

    pub fn has_tag(&self, tag: EntityTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn side(&self) -> Side {
        if self.has_tag(EntityTag::Enemy) || self.has_tag(EntityTag::Monster) {
            Side::Hostile
        } else if self.has_tag(EntityTag::Player) || self.has_tag(EntityTag::Ally) {
            Side::Friendly
        } else {
            Side::Neutral
        }
    }

    fn body(&self) -> Body {
        Body::new(self.position(), self.body_radius)
    }
}

/// All combatants plus the scene index used to query them
#[derive(Debug, Clone, Default)]
pub struct CombatWorld {
    combatants: HashMap<EntityId, Combatant>,
    index: SpatialIndex,
}

impl CombatWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(index: SpatialIndex) -> Self {
        Self {
            combatants: HashMap::new(),
            index,
        }
    }

    /// Add a combatant, returning its id
    pub fn spawn(&mut self, combatant: Combatant) -> EntityId {
        let id = combatant.id;
        self.index.insert(id, combatant.body());
        self.combatants.insert(id, combatant);
        id
    }

    /// Remove a combatant
    pub fn despawn(&mut self, id: EntityId) -> Option<Combatant> {
        self.index.remove(id);
        self.combatants.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    /// Mutable access for stat changes. Move combatants through
    /// [`CombatWorld::move_to`] so the scene index stays in sync.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    pub fn stats_mut(&mut self, id: EntityId) -> Option<&mut CharacterStats> {
        self.combatants.get_mut(&id).map(|c| &mut c.stats)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.combatants.contains_key(&id)
    }

    /// Whether the entity exists and has HP left
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(Combatant::is_alive)
    }

    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.get(id).map(Combatant::position)
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    /// Teleport a combatant. Returns false if it doesn't exist.
    pub fn move_to(&mut self, id: EntityId, position: Vec3) -> bool {
        let Some(combatant) = self.combatants.get_mut(&id) else {
            return false;
        };
        combatant.transform.position = position;
        self.index.set_position(id, position)
    }

    /// Shift a combatant by an offset (knockback)
    pub fn push(&mut self, id: EntityId, offset: Vec3) -> bool {
        match self.position(id) {
            Some(position) => self.move_to(id, position + offset),
            None => false,
        }
    }

    /// Walk in a straight line toward `goal`, stopping `stop_distance` short of it.
    /// Returns the remaining distance to the goal.
    pub fn step_toward(&mut self, id: EntityId, goal: Vec3, max_step: f32, stop_distance: f32) -> Option<f32> {
        let position = self.position(id)?;
        let offset = goal - position;
        let distance = offset.length();
        let travel = (distance - stop_distance).clamp(0.0, max_step.max(0.0));
        if travel > 0.0 {
            let direction = offset / distance;
            self.move_to(id, position + direction * travel);
            if let Some(combatant) = self.combatants.get_mut(&id) {
                combatant.transform.face(Vec3::new(direction.x, 0.0, direction.z));
            }
        }
        Some(distance - travel)
    }

    /// Combatants overlapping `shape` that `filter` accepts, nearest first
    pub fn query(&self, shape: &Shape, mut filter: impl FnMut(&Combatant) -> bool) -> Vec<EntityId> {
        let combatants = &self.combatants;
        self.index.overlapping(shape, &mut |id| {
            combatants.get(&id).is_some_and(|c| filter(c))
        })
    }
}
