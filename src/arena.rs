//! Headless arena: one hero against a ring of monsters
//!
//! The hero fires every skill it has whenever it is usable; monsters walk
//! in and claw. The clock turns fixed frame deltas into engine ticks.

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use anyhow::{Context, Result};
use ember_combat::{
    targeting, BaseStats, CombatEngine, CombatEvent, Combatant, DamageParams, MeleeParams, Side, SkillCatalog,
    SkillDefinition, SkillId, SkillInstanceId, SkillKind, SkillTarget, SkillVariant,
};
use ember_core::{EntityId, GameTime};
use glam::Vec3;
use serde::Serialize;
use tracing::{debug, info};

use crate::settings::SimSettings;

/// Monsters start walking in from this far out
const AGGRO_RADIUS: f32 = 40.0;
const MONSTER_SPEED: f32 = 3.0;
const MONSTER_REACH: f32 = 2.0;
/// Hero swings when the nearest monster is this close
const MELEE_REACH: f32 = 3.0;
/// Hero heals below this HP fraction
const HEAL_THRESHOLD: f32 = 0.7;

/// Outcome of one arena run
#[derive(Debug, Clone, Serialize)]
pub struct ArenaReport {
    pub seed: Option<u64>,
    pub simulated_seconds: f64,
    pub ticks: u64,
    pub hero_alive: bool,
    pub hero_hp: f32,
    pub monsters_spawned: usize,
    pub monsters_killed: usize,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_done: f32,
    pub critical_hits: usize,
    /// Event counts by name
    pub events: BTreeMap<String, usize>,
}

struct Arena {
    engine: CombatEngine,
    hero: EntityId,
    hero_skills: Vec<SkillInstanceId>,
    monsters: Vec<(EntityId, SkillInstanceId)>,
    report: ArenaReport,
}

/// Run the arena described by `settings`
pub fn run(settings: &SimSettings, catalog: &SkillCatalog) -> Result<ArenaReport> {
    settings.validate().context("Invalid arena settings")?;
    let mut combat = settings.combat.clone();
    if settings.arena.seed.is_some() {
        combat.seed = settings.arena.seed;
    }
    let seed = combat.seed;
    let engine = CombatEngine::new(combat).context("Failed to create combat engine")?;
    let mut arena = Arena::new(engine, settings, catalog, seed)?;

    let mut time = GameTime::new(settings.time.clone());
    let step = time.fixed_timestep();
    for _ in 0..settings.frame_limit() {
        if time.total_time >= f64::from(settings.arena.duration) {
            break;
        }
        for _ in 0..time.advance(settings.arena.frame_delta) {
            arena.step(step);
        }
        if !arena.hero_alive() || arena.monsters.is_empty() {
            break;
        }
    }

    arena.report.simulated_seconds = time.total_time;
    arena.report.ticks = time.tick_count;
    Ok(arena.finish())
}

impl Arena {
    fn new(mut engine: CombatEngine, settings: &SimSettings, catalog: &SkillCatalog, seed: Option<u64>) -> Result<Self> {
        let hero = engine.spawn(
            Combatant::player("Hero", Vec3::ZERO, hero_stats())
                .with_level(5)
                .facing(Vec3::NEG_Z),
        );
        let mut hero_skills = Vec::new();
        for definition in catalog.iter() {
            let id = engine
                .equip_skill(hero, definition.clone())
                .with_context(|| format!("Failed to equip {}", definition.name))?;
            hero_skills.push(id);
        }
        info!("Hero equipped {} skills", hero_skills.len());

        let claw = std::sync::Arc::new(claw());
        let count = settings.arena.monsters;
        let mut monsters = Vec::with_capacity(count);
        for i in 0..count {
            let angle = TAU * i as f32 / count.max(1) as f32;
            let position = Vec3::new(angle.cos(), 0.0, angle.sin()) * settings.arena.spawn_radius;
            let monster = engine.spawn(
                Combatant::monster(format!("Ghoul {}", i + 1), position, monster_stats()).facing(-position),
            );
            let skill = engine
                .equip_skill(monster, claw.clone())
                .context("Failed to equip monster attack")?;
            monsters.push((monster, skill));
        }

        Ok(Self {
            engine,
            hero,
            hero_skills,
            monsters,
            report: ArenaReport {
                seed,
                simulated_seconds: 0.0,
                ticks: 0,
                hero_alive: true,
                hero_hp: 0.0,
                monsters_spawned: count,
                monsters_killed: 0,
                damage_dealt: 0.0,
                damage_taken: 0.0,
                healing_done: 0.0,
                critical_hits: 0,
                events: BTreeMap::new(),
            },
        })
    }

    fn hero_alive(&self) -> bool {
        self.engine.world().is_alive(self.hero)
    }

    fn step(&mut self, dt: f32) {
        if self.hero_alive() {
            self.hero_turn();
        }
        self.monster_turn(dt);
        self.engine.tick(dt);
        self.collect_events();
        self.monsters.retain(|(id, _)| self.engine.world().is_alive(*id));
    }

    fn hero_turn(&mut self) {
        let Some(hero) = self.engine.world().get(self.hero) else {
            return;
        };
        let position = hero.position();
        let wounded = hero.stats.hp_fraction() < HEAL_THRESHOLD;
        let nearest = targeting::nearest_enemy(self.engine.world(), self.hero, Side::Friendly, position, AGGRO_RADIUS);
        let target_position = nearest.and_then(|id| self.engine.world().position(id));
        let in_reach = target_position.is_some_and(|p| p.distance(position) <= MELEE_REACH);

        for &skill in &self.hero_skills {
            let Some(instance) = self.engine.skill(skill) else {
                continue;
            };
            let target = match (instance.variant(), nearest, target_position) {
                (SkillVariant::Passive, _, _) => continue,
                (SkillVariant::Heal, _, _) if !wounded => continue,
                (SkillVariant::Heal | SkillVariant::Buff, _, _) => SkillTarget::None,
                (_, None, _) => continue,
                (SkillVariant::Melee, _, _) if !in_reach => continue,
                (SkillVariant::Aoe, _, Some(point)) => SkillTarget::Point(point),
                (SkillVariant::Projectile | SkillVariant::Debuff | SkillVariant::Summon, Some(id), _) => {
                    SkillTarget::Entity(id)
                }
                _ => SkillTarget::None,
            };
            if self.engine.can_use(skill).is_err() {
                continue;
            }
            if let Some(point) = target_position {
                if let Some(hero) = self.engine.world_mut().get_mut(self.hero) {
                    hero.transform.look_at(point);
                }
            }
            match self.engine.use_skill(skill, target) {
                Ok(outcome) => debug!("Hero used {}: {:?}", skill, outcome),
                Err(e) => debug!("Hero could not use {}: {}", skill, e),
            }
        }
    }

    fn monster_turn(&mut self, dt: f32) {
        let Some(hero_position) = self.engine.world().position(self.hero).filter(|_| self.hero_alive()) else {
            return;
        };
        for &(monster, claw) in &self.monsters {
            let Some(remaining) =
                self.engine
                    .world_mut()
                    .step_toward(monster, hero_position, MONSTER_SPEED * dt, MONSTER_REACH * 0.75)
            else {
                continue;
            };
            if let Some(combatant) = self.engine.world_mut().get_mut(monster) {
                combatant.transform.look_at(hero_position);
            }
            if remaining <= MONSTER_REACH && self.engine.can_use(claw).is_ok() {
                if let Err(e) = self.engine.use_skill(claw, SkillTarget::None) {
                    debug!("Monster {} could not attack: {}", monster, e);
                }
            }
        }
    }

    fn collect_events(&mut self) {
        for event in self.engine.drain_events() {
            *self.report.events.entry(event.name().to_string()).or_default() += 1;
            match event {
                CombatEvent::Damaged {
                    target, amount, is_crit, ..
                } => {
                    if target == self.hero {
                        self.report.damage_taken += amount;
                    } else if self.monsters.iter().any(|(id, _)| *id == target) {
                        self.report.damage_dealt += amount;
                        if is_crit {
                            self.report.critical_hits += 1;
                        }
                    }
                }
                CombatEvent::Healed { hp, .. } => self.report.healing_done += hp,
                CombatEvent::Killed { target, .. } if self.monsters.iter().any(|(id, _)| *id == target) => {
                    self.report.monsters_killed += 1;
                    info!("{} fell", target);
                }
                CombatEvent::Killed { target, .. } if target == self.hero => info!("Hero fell"),
                _ => {}
            }
        }
    }

    fn finish(mut self) -> ArenaReport {
        self.report.hero_alive = self.hero_alive();
        self.report.hero_hp = self
            .engine
            .world()
            .get(self.hero)
            .map_or(0.0, |c| c.stats.current_hp());
        info!(
            "Arena finished: {}/{} monsters killed, hero {}",
            self.report.monsters_killed,
            self.report.monsters_spawned,
            if self.report.hero_alive { "alive" } else { "dead" }
        );
        self.report
    }
}

fn hero_stats() -> BaseStats {
    BaseStats {
        attack_power: 25.0,
        defense: 30.0,
        crit_rate: 0.15,
        max_hp: 800.0,
        max_mp: 400.0,
        strength: 40.0,
        energy: 35.0,
        agility: 30.0,
    }
}

fn monster_stats() -> BaseStats {
    BaseStats {
        attack_power: 12.0,
        defense: 15.0,
        crit_rate: 0.05,
        max_hp: 260.0,
        max_mp: 0.0,
        ..Default::default()
    }
}

fn claw() -> SkillDefinition {
    SkillDefinition {
        id: SkillId(1000),
        name: "Claw".to_string(),
        description: "Monster swipe".to_string(),
        cast_time: 0.0,
        cooldown: 1.2,
        mana_cost: 0.0,
        max_level: 1,
        kind: SkillKind::Melee(MeleeParams {
            damage: DamageParams {
                base_damage: 15.0,
                str_ratio: 0.5,
                ..Default::default()
            },
            range: MONSTER_REACH + 0.5,
            angle: 90.0,
            max_chain_targets: 0,
        }),
    }
}
