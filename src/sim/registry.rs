//! Entity registry: owns every live entity and runs their per-tick update
//!
//! Update order is fixed: hero, then enemies, then projectiles, then contact
//! damage, then the dead sweep. Each mover's pre-update position is kept so
//! a step that lands on a wall tile can be rolled back.

use std::collections::BTreeMap;

use glam::Vec2;
use rand_pcg::Pcg32;

use super::collision::nearest;
use super::entity::{DamageOutcome, Enemy, EntityId, Faction, Projectile};
use super::hero::{Hero, HeroIntent};
use super::state::GameEvent;
use super::terrain::TerrainGrid;
use crate::error::SimError;
use crate::is_finite_point;
use crate::tuning::{ArenaConfig, HeroConfig};

/// Knockback speed applied to enemies rammed by a dash (px/s)
const DASH_KNOCKBACK: f32 = 800.0;

#[derive(Debug, Clone)]
pub struct EntityRegistry {
    hero: Hero,
    /// Insertion-ordered, which is also id order
    enemies: Vec<Enemy>,
    projectiles: Vec<Projectile>,
    /// Every registered id and its collection
    index: BTreeMap<EntityId, Faction>,
    next_id: EntityId,
    arena: ArenaConfig,
    debug: bool,
}

impl EntityRegistry {
    pub fn new(
        hero_config: &HeroConfig,
        arena: ArenaConfig,
        hero_pos: Vec2,
        rng: &mut Pcg32,
        debug: bool,
    ) -> Result<Self, SimError> {
        let hero = Hero::new(1, hero_pos, hero_config, rng)?;
        let mut index = BTreeMap::new();
        index.insert(hero.body.id, Faction::Hero);
        Ok(Self {
            hero,
            enemies: Vec::new(),
            projectiles: Vec::new(),
            index,
            next_id: 2,
            arena,
            debug,
        })
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn arena(&self) -> &ArenaConfig {
        &self.arena
    }

    pub fn hero(&self) -> &Hero {
        &self.hero
    }

    pub fn hero_mut(&mut self) -> &mut Hero {
        &mut self.hero
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn enemies_mut(&mut self) -> &mut [Enemy] {
        &mut self.enemies
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn live_enemy_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.body.is_alive()).count()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn faction_of(&self, id: EntityId) -> Option<Faction> {
        self.index.get(&id).copied()
    }

    /// Position of a live entity; stale or dead ids yield `None`
    pub fn position_of(&self, id: EntityId) -> Option<Vec2> {
        match self.faction_of(id)? {
            Faction::Hero => self.hero.body.is_alive().then_some(self.hero.body.pos),
            Faction::Enemy => self
                .enemies
                .iter()
                .find(|e| e.body.id == id && e.body.is_alive())
                .map(|e| e.body.pos),
            Faction::Projectile => self
                .projectiles
                .iter()
                .find(|p| p.body.id == id && p.body.is_alive())
                .map(|p| p.body.pos),
        }
    }

    /// Index of the closest live enemy to `from`
    pub fn nearest_enemy(&self, from: Vec2) -> Option<usize> {
        nearest(
            from,
            self.enemies
                .iter()
                .enumerate()
                .filter(|(_, e)| e.body.is_alive())
                .map(|(i, e)| (i, e.body.pos)),
        )
    }

    pub fn add_enemy(&mut self, enemy: Enemy) -> bool {
        if !self.admit(enemy.body.id, enemy.body.pos, Faction::Enemy) {
            return false;
        }
        if self.debug {
            log::debug!(
                "Enemy {} ({:?}) added at ({:.1}, {:.1})",
                enemy.body.id,
                enemy.kind,
                enemy.body.pos.x,
                enemy.body.pos.y
            );
        }
        self.enemies.push(enemy);
        true
    }

    pub fn add_projectile(&mut self, projectile: Projectile) -> bool {
        if !self.admit(projectile.body.id, projectile.body.pos, Faction::Projectile) {
            return false;
        }
        self.projectiles.push(projectile);
        true
    }

    fn admit(&mut self, id: EntityId, pos: Vec2, faction: Faction) -> bool {
        if !is_finite_point(pos) {
            log::warn!("Rejected {:?} {} with non-finite position ({}, {})", faction, id, pos.x, pos.y);
            return false;
        }
        if self.index.contains_key(&id) {
            log::warn!("Rejected {:?} {}: id already registered", faction, id);
            return false;
        }
        self.index.insert(id, faction);
        true
    }

    /// Remove an enemy; removing an unknown id is a no-op
    pub fn remove_enemy(&mut self, id: EntityId) -> Option<Enemy> {
        let idx = self.enemies.iter().position(|e| e.body.id == id)?;
        self.index.remove(&id);
        Some(self.enemies.remove(idx))
    }

    /// Remove a projectile; removing an unknown id is a no-op
    pub fn remove_projectile(&mut self, id: EntityId) -> Option<Projectile> {
        let idx = self.projectiles.iter().position(|p| p.body.id == id)?;
        self.index.remove(&id);
        Some(self.projectiles.remove(idx))
    }

    /// Damage an enemy by index, emitting a kill event if this hit killed it
    pub fn damage_enemy(&mut self, index: usize, amount: f32, events: &mut Vec<GameEvent>) -> DamageOutcome {
        let Some(enemy) = self.enemies.get_mut(index) else {
            return DamageOutcome::Ignored;
        };
        let outcome = enemy.body.take_damage(amount);
        if outcome == DamageOutcome::Killed {
            events.push(GameEvent::killed(enemy));
        }
        outcome
    }

    /// Advance every entity one tick and sweep the dead
    pub fn update(
        &mut self,
        dt: f32,
        terrain: &mut TerrainGrid,
        intent: &HeroIntent,
        hero_config: &HeroConfig,
        rng: &mut Pcg32,
        events: &mut Vec<GameEvent>,
    ) {
        self.update_hero(dt, terrain, intent, hero_config, rng, events);
        self.update_enemies(dt, terrain);
        self.update_projectiles(dt, terrain, events);
        self.resolve_contacts(hero_config, events);
        self.purge_dead();
    }

    fn update_hero(
        &mut self,
        dt: f32,
        terrain: &mut TerrainGrid,
        intent: &HeroIntent,
        config: &HeroConfig,
        rng: &mut Pcg32,
        events: &mut Vec<GameEvent>,
    ) {
        if self.hero.body.is_dead() {
            return;
        }
        let nearest_enemy = self.nearest_enemy(self.hero.body.pos).map(|i| self.enemies[i].body.pos);
        let hero = &mut self.hero;
        hero.think(dt, intent, nearest_enemy, config, rng);

        let dashing = hero.dash.is_active();
        let prev = hero.body.pos;
        hero.advance(dt, config);
        hero.body.pos = self.arena.clamp_circle(hero.body.pos, hero.body.radius);
        if terrain.check_collision(hero.body.pos) {
            hero.body.pos = prev;
        }

        if dashing {
            for enemy in self.enemies.iter_mut().filter(|e| e.body.is_alive()) {
                if !enemy.body.overlaps(&hero.body) || !hero.dash.strike(enemy.body.id) {
                    continue;
                }
                if enemy.body.take_damage(config.dash.damage) == DamageOutcome::Killed {
                    events.push(GameEvent::killed(enemy));
                }
                let away = crate::direction_to(hero.body.pos, enemy.body.pos);
                let pushed = enemy.body.pos + away * DASH_KNOCKBACK * dt;
                enemy.body.pos = self.arena.clamp_circle(pushed, enemy.body.radius);
            }
        }

        hero.regenerate(dt, config);
    }

    fn update_enemies(&mut self, dt: f32, terrain: &mut TerrainGrid) {
        let target = self.hero.body.is_alive().then_some(self.hero.body.pos);
        for enemy in self.enemies.iter_mut().filter(|e| e.body.is_alive()) {
            let prev = enemy.body.pos;
            enemy.update(dt, target);
            enemy.body.pos = self.arena.clamp_circle(enemy.body.pos, enemy.body.radius);
            if terrain.check_collision(enemy.body.pos) {
                enemy.body.pos = prev;
            }
        }
    }

    fn update_projectiles(&mut self, dt: f32, terrain: &mut TerrainGrid, events: &mut Vec<GameEvent>) {
        for projectile in self.projectiles.iter_mut() {
            if projectile.body.is_dead() {
                continue;
            }
            let prev = projectile.body.pos;
            projectile.update(dt);
            if projectile.body.is_dead() {
                continue;
            }
            if terrain.check_collision(projectile.body.pos) {
                projectile.body.pos = prev;
                projectile.body.expire();
                continue;
            }
            if !self.arena.contains(projectile.body.pos) {
                projectile.body.expire();
                continue;
            }
            if let Some((idx, DamageOutcome::Killed)) = projectile.try_hit(&mut self.enemies) {
                events.push(GameEvent::killed(&self.enemies[idx]));
            }
        }
    }

    /// Enemies touching the hero deal contact damage (one hit per immunity window)
    fn resolve_contacts(&mut self, config: &HeroConfig, events: &mut Vec<GameEvent>) {
        let hero = &mut self.hero;
        if hero.body.is_dead() {
            return;
        }
        for enemy in self.enemies.iter().filter(|e| e.body.is_alive()) {
            let reach = hero.body.radius + enemy.body.radius + config.contact_padding;
            if hero.body.pos.distance(enemy.body.pos) >= reach {
                continue;
            }
            match hero.receive_contact(enemy.contact_damage, config) {
                Some(DamageOutcome::Ignored) | None => {}
                Some(outcome) => {
                    events.push(GameEvent::HeroDamaged {
                        amount: enemy.contact_damage,
                        health: hero.body.health(),
                    });
                    if outcome == DamageOutcome::Killed {
                        log::info!("Hero killed by {:?} enemy {}", enemy.kind, enemy.body.id);
                        return;
                    }
                }
            }
        }
    }

    /// Remove every dead enemy and projectile; returns how many were removed
    pub fn purge_dead(&mut self) -> usize {
        let before = self.enemies.len() + self.projectiles.len();
        let index = &mut self.index;
        self.enemies.retain(|e| {
            let keep = e.body.is_alive();
            if !keep {
                index.remove(&e.body.id);
            }
            keep
        });
        self.projectiles.retain(|p| {
            let keep = p.body.is_alive();
            if !keep {
                index.remove(&p.body.id);
            }
            keep
        });
        let removed = before - self.enemies.len() - self.projectiles.len();
        if self.debug && removed > 0 {
            log::debug!("Swept {} dead entities", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::EnemyKind;
    use crate::sim::terrain::Tile;
    use crate::tuning::{EnemyStats, TerrainConfig};
    use rand::SeedableRng;

    fn stats(health: f32) -> EnemyStats {
        EnemyStats {
            radius: 10.0,
            speed: 100.0,
            health,
            contact_damage: 10.0,
            experience: 10,
            color: 0,
        }
    }

    /// Terrain with no walls anywhere
    fn open_terrain() -> TerrainGrid {
        TerrainGrid::new(TerrainConfig {
            wall_threshold: 2.0,
            ..TerrainConfig::default()
        })
    }

    fn registry(rng: &mut Pcg32) -> EntityRegistry {
        EntityRegistry::new(&HeroConfig::default(), ArenaConfig::default(), Vec2::new(1000.0, 1000.0), rng, false)
            .unwrap()
    }

    fn spawn_enemy(reg: &mut EntityRegistry, pos: Vec2, health: f32) -> EntityId {
        let id = reg.next_entity_id();
        assert!(reg.add_enemy(Enemy::new(id, EnemyKind::Fast, &stats(health), pos).unwrap()));
        id
    }

    #[test]
    fn test_add_rejects_non_finite_and_duplicates() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut reg = registry(&mut rng);
        let id = spawn_enemy(&mut reg, Vec2::new(10.0, 10.0), 50.0);

        let mut bad = Enemy::new(99, EnemyKind::Fast, &stats(50.0), Vec2::ZERO).unwrap();
        bad.body.pos = Vec2::new(f32::NAN, 1.0);
        assert!(!reg.add_enemy(bad));

        let dup = Enemy::new(id, EnemyKind::Fast, &stats(50.0), Vec2::ZERO).unwrap();
        assert!(!reg.add_enemy(dup));
        assert_eq!(reg.enemies().len(), 1);
        assert!(!reg.contains(99));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut reg = registry(&mut rng);
        let id = spawn_enemy(&mut reg, Vec2::new(10.0, 10.0), 50.0);
        assert!(reg.remove_enemy(id).is_some());
        assert!(reg.remove_enemy(id).is_none());
        assert!(reg.remove_projectile(12345).is_none());
        assert_eq!(reg.faction_of(id), None);
        assert_eq!(reg.position_of(id), None);
    }

    #[test]
    fn test_nearest_enemy_skips_dead() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut reg = registry(&mut rng);
        spawn_enemy(&mut reg, Vec2::new(1010.0, 1000.0), 50.0);
        spawn_enemy(&mut reg, Vec2::new(1100.0, 1000.0), 50.0);
        let mut events = Vec::new();
        assert_eq!(reg.damage_enemy(0, 500.0, &mut events), DamageOutcome::Killed);
        assert_eq!(events.len(), 1);
        assert_eq!(reg.nearest_enemy(Vec2::new(1000.0, 1000.0)), Some(1));
        assert_eq!(reg.live_enemy_count(), 1);
        assert_eq!(reg.damage_enemy(0, 500.0, &mut events), DamageOutcome::Ignored);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_update_sweeps_dead_entities() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut reg = registry(&mut rng);
        let mut terrain = open_terrain();
        let id = spawn_enemy(&mut reg, Vec2::new(200.0, 200.0), 50.0);
        reg.enemies_mut()[0].body.take_damage(100.0);
        let mut events = Vec::new();
        reg.update(0.01, &mut terrain, &HeroIntent::default(), &HeroConfig::default(), &mut rng, &mut events);
        assert!(reg.enemies().is_empty());
        assert!(!reg.contains(id));
    }

    #[test]
    fn test_projectile_damages_exactly_one_enemy() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut reg = registry(&mut rng);
        let mut terrain = open_terrain();
        spawn_enemy(&mut reg, Vec2::new(300.0, 300.0), 50.0);
        spawn_enemy(&mut reg, Vec2::new(300.0, 300.0), 50.0);
        let pid = reg.next_entity_id();
        let projectile =
            Projectile::new(pid, 1, Vec2::new(300.0, 300.0), Vec2::ZERO, 4.0, 20.0, 1.0, 0).unwrap();
        assert!(reg.add_projectile(projectile));

        let mut events = Vec::new();
        let config = HeroConfig::default();
        reg.update(0.001, &mut terrain, &HeroIntent::default(), &config, &mut rng, &mut events);
        let damaged = reg
            .enemies()
            .iter()
            .filter(|e| e.body.health() < e.body.max_health())
            .count();
        assert_eq!(damaged, 1);
        assert!(reg.projectiles().is_empty());
        assert!(!reg.contains(pid));
    }

    #[test]
    fn test_projectile_expires_leaving_arena() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut reg = registry(&mut rng);
        let mut terrain = open_terrain();
        let pid = reg.next_entity_id();
        let projectile =
            Projectile::new(pid, 1, Vec2::new(2.0, 500.0), Vec2::new(-500.0, 0.0), 4.0, 20.0, 5.0, 0).unwrap();
        reg.add_projectile(projectile);
        let mut events = Vec::new();
        reg.update(0.05, &mut terrain, &HeroIntent::default(), &HeroConfig::default(), &mut rng, &mut events);
        assert!(reg.projectiles().is_empty());
    }

    /// Centre of a ground tile whose east neighbour is a wall, away from the arena edge
    fn ground_west_of_wall(terrain: &mut TerrainGrid) -> Vec2 {
        let ts = terrain.config().tile_size;
        let n = (ArenaConfig::default().size.x / ts) as i32;
        for gy in 1..n - 1 {
            for gx in 1..n - 3 {
                let here = Vec2::new((gx as f32 + 0.5) * ts, (gy as f32 + 0.5) * ts);
                if terrain.tile_at(here) == Tile::Ground && terrain.tile_at(here + Vec2::new(ts, 0.0)) == Tile::Wall {
                    return here;
                }
            }
        }
        panic!("default terrain has no ground tile west of a wall inside the arena");
    }

    /// Hero intent that keeps the hero in place
    fn hold_still() -> HeroIntent {
        HeroIntent {
            move_dir: Some(Vec2::ZERO),
            ..Default::default()
        }
    }

    #[test]
    fn test_wall_rolls_back_hero_movement() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut terrain = TerrainGrid::new(TerrainConfig::default());
        let start = ground_west_of_wall(&mut terrain);

        let config = HeroConfig::default();
        let mut reg = EntityRegistry::new(&config, ArenaConfig::default(), start, &mut rng, false).unwrap();
        let intent = HeroIntent {
            move_dir: Some(Vec2::X),
            ..Default::default()
        };
        let mut events = Vec::new();
        // One 0.16s step at 200 px/s covers exactly one tile width
        reg.update(0.16, &mut terrain, &intent, &config, &mut rng, &mut events);
        let hero = &reg.hero().body;
        assert_eq!(hero.pos, start);
        assert_eq!(hero.dir, Vec2::X);
        assert_eq!(hero.speed, config.speed);
    }

    #[test]
    fn test_wall_rolls_back_enemy_movement() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut terrain = TerrainGrid::new(TerrainConfig::default());
        let start = ground_west_of_wall(&mut terrain);

        let config = HeroConfig::default();
        let hero_pos = Vec2::new(2000.0, start.y);
        let mut reg = EntityRegistry::new(&config, ArenaConfig::default(), hero_pos, &mut rng, false).unwrap();
        let id = spawn_enemy(&mut reg, start, 50.0);
        let mut events = Vec::new();
        // 0.32s at 100 px/s is one tile east, into the wall
        reg.update(0.32, &mut terrain, &hold_still(), &config, &mut rng, &mut events);

        let enemy = &reg.enemies()[0];
        assert_eq!(enemy.body.id, id);
        assert_eq!(enemy.body.pos, start);
        assert_eq!(enemy.body.dir, Vec2::X);
        assert_eq!(enemy.body.speed, 100.0);
    }

    #[test]
    fn test_projectile_expires_on_wall() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut terrain = TerrainGrid::new(TerrainConfig::default());
        let start = ground_west_of_wall(&mut terrain);

        let config = HeroConfig::default();
        let hero_pos = ArenaConfig::default().center();
        let mut reg = EntityRegistry::new(&config, ArenaConfig::default(), hero_pos, &mut rng, false).unwrap();
        let pid = reg.next_entity_id();
        let projectile = Projectile::new(pid, 1, start, Vec2::new(100.0, 0.0), 4.0, 20.0, 5.0, 0).unwrap();
        assert!(reg.add_projectile(projectile));

        let mut events = Vec::new();
        reg.update(0.32, &mut terrain, &hold_still(), &config, &mut rng, &mut events);
        assert!(reg.projectiles().is_empty());
        assert!(!reg.contains(pid));
    }

    #[test]
    fn test_contact_damage_respects_immunity() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut reg = registry(&mut rng);
        let mut terrain = open_terrain();
        spawn_enemy(&mut reg, Vec2::new(1010.0, 1000.0), 50.0);
        spawn_enemy(&mut reg, Vec2::new(990.0, 1000.0), 50.0);
        let hold = HeroIntent {
            move_dir: Some(Vec2::ZERO),
            ..Default::default()
        };
        let mut events = Vec::new();
        let config = HeroConfig::default();
        reg.update(0.001, &mut terrain, &hold, &config, &mut rng, &mut events);
        let hits = events
            .iter()
            .filter(|e| matches!(e, GameEvent::HeroDamaged { .. }))
            .count();
        assert_eq!(hits, 1);
        assert_eq!(reg.hero().body.health(), 90.0);
    }

    #[test]
    fn test_dash_rams_enemy_once() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut reg = registry(&mut rng);
        let mut terrain = open_terrain();
        spawn_enemy(&mut reg, Vec2::new(1005.0, 1000.0), 500.0);
        let dash = HeroIntent {
            move_dir: Some(Vec2::X),
            dash: true,
            ..Default::default()
        };
        let mut events = Vec::new();
        let config = HeroConfig::default();
        reg.update(0.001, &mut terrain, &dash, &config, &mut rng, &mut events);
        reg.update(0.001, &mut terrain, &HeroIntent::default(), &config, &mut rng, &mut events);
        assert_eq!(reg.enemies()[0].body.health(), 400.0);
        assert_eq!(reg.hero().body.health(), 100.0);
    }
}
