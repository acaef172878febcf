//! Adaptive enemy spawner
//!
//! Keeps the live population between `min_count` and `max_count` and spawns
//! waves more often as the wave count grows. The configuration is passed in
//! on every update, so tuning writes take effect on the next tick.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::Enemy;
use super::registry::EntityRegistry;
use super::state::GameEvent;
use super::terrain::TerrainGrid;
use crate::tuning::{ArenaConfig, EnemyTypeConfig, SpawnerConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySpawner {
    spawn_timer: f32,
    adaptation_timer: f32,
    wave: u32,
    multiplier: f32,
    active: bool,
    debug: bool,
}

impl EnemySpawner {
    pub fn new(debug: bool) -> Self {
        Self {
            spawn_timer: 0.0,
            adaptation_timer: 0.0,
            wave: 0,
            multiplier: 1.0,
            active: true,
            debug,
        }
    }

    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            log::info!("Spawner {}", if active { "resumed" } else { "stopped" });
        }
        self.active = active;
    }

    /// Seconds between timed waves at the current difficulty
    pub fn effective_interval(&self, config: &SpawnerConfig) -> f32 {
        (config.base_interval / self.multiplier).max(config.interval_floor)
    }

    pub fn update(
        &mut self,
        dt: f32,
        config: &SpawnerConfig,
        registry: &mut EntityRegistry,
        terrain: &mut TerrainGrid,
        rng: &mut Pcg32,
        events: &mut Vec<GameEvent>,
    ) {
        if !self.active {
            return;
        }

        self.adaptation_timer += dt;
        if self.adaptation_timer >= config.adaptation_interval {
            self.adaptation_timer = 0.0;
            self.multiplier = 1.0 + self.wave as f32 * config.wave_growth;
            if self.debug {
                log::debug!(
                    "Difficulty x{:.2}, interval {:.2}s",
                    self.multiplier,
                    self.effective_interval(config)
                );
            }
        }

        let live = registry.live_enemy_count();
        if live < config.min_count {
            let wanted = config.enemies_per_wave.max(config.min_count - live);
            let count = wanted.min(config.max_count.saturating_sub(live));
            self.spawn_wave(count, config, registry, terrain, rng, events);
            self.spawn_timer = 0.0;
            return;
        }
        if live >= config.max_count {
            return;
        }

        self.spawn_timer += dt;
        if self.spawn_timer >= self.effective_interval(config) {
            self.spawn_timer = 0.0;
            let count = config.enemies_per_wave.min(config.max_count - live);
            self.spawn_wave(count, config, registry, terrain, rng, events);
        }
    }

    fn spawn_wave(
        &mut self,
        count: usize,
        config: &SpawnerConfig,
        registry: &mut EntityRegistry,
        terrain: &mut TerrainGrid,
        rng: &mut Pcg32,
        events: &mut Vec<GameEvent>,
    ) {
        let spawned = (0..count)
            .filter(|_| self.spawn_one(config, registry, terrain, rng, events))
            .count();
        self.wave += 1;
        log::info!("Wave {}: spawned {} enemies", self.wave, spawned);
        events.push(GameEvent::WaveSpawned {
            wave: self.wave,
            count: spawned,
        });
    }

    fn spawn_one(
        &self,
        config: &SpawnerConfig,
        registry: &mut EntityRegistry,
        terrain: &mut TerrainGrid,
        rng: &mut Pcg32,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        let Some(row) = select_weighted(&config.enemy_types, rng) else {
            log::warn!("Enemy table is empty; nothing to spawn");
            return false;
        };
        let hero_pos = registry.hero().body.pos;
        let pos = spawn_position(config, registry.arena(), hero_pos, terrain, rng);
        let id = registry.next_entity_id();
        let enemy = match Enemy::new(id, row.kind, &row.stats, pos) {
            Ok(enemy) => enemy,
            Err(err) => {
                log::warn!("Failed to spawn {:?}: {}", row.kind, err);
                return false;
            }
        };
        if !registry.add_enemy(enemy) {
            return false;
        }
        events.push(GameEvent::EnemySpawned {
            id,
            kind: row.kind,
            pos,
        });
        true
    }
}

/// Cumulative-weight pick: roll in `[0, total)` and subtract weights in
/// table order until the remainder is non-positive
///
/// Negative weights count as zero. Falls back to the first row when the
/// total is zero or rounding leaves the roll unspent.
pub fn select_weighted<'a>(table: &'a [EnemyTypeConfig], rng: &mut Pcg32) -> Option<&'a EnemyTypeConfig> {
    let first = table.first()?;
    let total: f32 = table.iter().map(|row| row.weight.max(0.0)).sum();
    if total <= 0.0 || !total.is_finite() {
        return Some(first);
    }
    let mut roll = rng.random::<f32>() * total;
    for row in table {
        roll -= row.weight.max(0.0);
        if roll <= 0.0 {
            return Some(row);
        }
    }
    Some(first)
}

/// Box spawn points must stay inside, `margin` in from the arena edges
fn spawn_box(arena: &ArenaConfig, margin: f32) -> (Vec2, Vec2) {
    let lo = Vec2::splat(margin.max(0.0)).min(arena.size * 0.5);
    let hi = (arena.size - lo).max(lo);
    (lo, hi)
}

/// Random open point inside the margin box and at least
/// `min_hero_distance` from the hero
///
/// Gives up after `max_spawn_attempts` draws and returns a point at the
/// minimum distance from the hero, clamped into the margin box.
pub fn spawn_position(
    config: &SpawnerConfig,
    arena: &ArenaConfig,
    hero_pos: Vec2,
    terrain: &mut TerrainGrid,
    rng: &mut Pcg32,
) -> Vec2 {
    let (lo, hi) = spawn_box(arena, config.spawn_margin);
    for _ in 0..config.max_spawn_attempts {
        let candidate = Vec2::new(rng.random_range(lo.x..=hi.x), rng.random_range(lo.y..=hi.y));
        if candidate.distance(hero_pos) >= config.min_hero_distance && !terrain.check_collision(candidate) {
            return candidate;
        }
    }
    let angle = rng.random_range(0.0..std::f32::consts::TAU);
    let fallback = (hero_pos + Vec2::from_angle(angle) * config.min_hero_distance).clamp(lo, hi);
    log::debug!(
        "Spawn resampling exhausted; falling back to ({:.1}, {:.1})",
        fallback.x,
        fallback.y
    );
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::EnemyKind;
    use crate::tuning::{HeroConfig, TerrainConfig};
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn world(seed: u64) -> (EntityRegistry, TerrainGrid, Pcg32) {
        let mut rng = Pcg32::seed_from_u64(seed);
        let arena = ArenaConfig::default();
        let hero_pos = arena.center();
        let registry = EntityRegistry::new(&HeroConfig::default(), arena, hero_pos, &mut rng, false).unwrap();
        (registry, TerrainGrid::new(TerrainConfig::default()), rng)
    }

    #[test]
    fn test_forced_spawn_below_minimum() {
        let (mut reg, mut terrain, mut rng) = world(1);
        let config = SpawnerConfig::default();
        let mut spawner = EnemySpawner::new(false);
        let mut events = Vec::new();
        spawner.update(0.01, &config, &mut reg, &mut terrain, &mut rng, &mut events);

        assert_eq!(reg.live_enemy_count(), 4);
        assert_eq!(spawner.wave(), 1);
        let spawned = events
            .iter()
            .filter(|e| matches!(e, GameEvent::EnemySpawned { .. }))
            .count();
        assert_eq!(spawned, 4);
        assert!(events.contains(&GameEvent::WaveSpawned { wave: 1, count: 4 }));
    }

    #[test]
    fn test_forced_spawn_covers_large_deficit() {
        let (mut reg, mut terrain, mut rng) = world(2);
        let config = SpawnerConfig {
            min_count: 10,
            ..SpawnerConfig::default()
        };
        let mut spawner = EnemySpawner::new(false);
        spawner.update(0.01, &config, &mut reg, &mut terrain, &mut rng, &mut Vec::new());
        assert_eq!(reg.live_enemy_count(), 10);
    }

    #[test]
    fn test_timed_wave_after_interval() {
        let (mut reg, mut terrain, mut rng) = world(3);
        let config = SpawnerConfig::default();
        let mut spawner = EnemySpawner::new(false);
        let mut events = Vec::new();
        spawner.update(0.0, &config, &mut reg, &mut terrain, &mut rng, &mut events);
        assert_eq!(reg.live_enemy_count(), 4);

        spawner.update(2.5, &config, &mut reg, &mut terrain, &mut rng, &mut events);
        assert_eq!(reg.live_enemy_count(), 4);
        spawner.update(0.5, &config, &mut reg, &mut terrain, &mut rng, &mut events);
        assert_eq!(reg.live_enemy_count(), 8);
        assert_eq!(spawner.wave(), 2);
    }

    #[test]
    fn test_never_exceeds_maximum() {
        let (mut reg, mut terrain, mut rng) = world(4);
        let config = SpawnerConfig {
            max_count: 10,
            ..SpawnerConfig::default()
        };
        let mut spawner = EnemySpawner::new(false);
        for _ in 0..50 {
            spawner.update(1.0, &config, &mut reg, &mut terrain, &mut rng, &mut Vec::new());
            assert!(reg.live_enemy_count() <= 10);
        }
        assert_eq!(reg.live_enemy_count(), 10);
    }

    #[test]
    fn test_inactive_spawner_does_nothing() {
        let (mut reg, mut terrain, mut rng) = world(5);
        let mut spawner = EnemySpawner::new(false);
        spawner.set_active(false);
        spawner.update(10.0, &SpawnerConfig::default(), &mut reg, &mut terrain, &mut rng, &mut Vec::new());
        assert_eq!(reg.live_enemy_count(), 0);
        spawner.set_active(true);
        spawner.update(0.0, &SpawnerConfig::default(), &mut reg, &mut terrain, &mut rng, &mut Vec::new());
        assert_eq!(reg.live_enemy_count(), 4);
    }

    #[test]
    fn test_difficulty_adapts_on_interval() {
        let (mut reg, mut terrain, mut rng) = world(6);
        let config = SpawnerConfig {
            max_count: 500,
            ..SpawnerConfig::default()
        };
        let mut spawner = EnemySpawner::new(false);
        // Forced wave then one timed wave
        spawner.update(0.0, &config, &mut reg, &mut terrain, &mut rng, &mut Vec::new());
        spawner.update(3.0, &config, &mut reg, &mut terrain, &mut rng, &mut Vec::new());
        assert_eq!(spawner.wave(), 2);
        assert_eq!(spawner.multiplier(), 1.0);

        spawner.update(2.0, &config, &mut reg, &mut terrain, &mut rng, &mut Vec::new());
        assert!((spawner.multiplier() - 1.2).abs() < 1e-6);
        assert!((spawner.effective_interval(&config) - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_effective_interval_floor() {
        let mut spawner = EnemySpawner::new(false);
        spawner.multiplier = 100.0;
        assert_eq!(spawner.effective_interval(&SpawnerConfig::default()), 0.5);
    }

    #[test]
    fn test_weighted_selection_converges() {
        let config = SpawnerConfig::default();
        let mut rng = Pcg32::seed_from_u64(99);
        let mut counts = [0usize; 3];
        let draws = 100_000;
        for _ in 0..draws {
            match select_weighted(&config.enemy_types, &mut rng).unwrap().kind {
                EnemyKind::Fast => counts[0] += 1,
                EnemyKind::Tank => counts[1] += 1,
                EnemyKind::Swarm => counts[2] += 1,
            }
        }
        let expected = [2.0 / 6.0, 1.0 / 6.0, 3.0 / 6.0];
        for (count, want) in counts.iter().zip(expected) {
            let observed = *count as f64 / draws as f64;
            assert!((observed - want).abs() < 0.01, "observed {} want {}", observed, want);
        }
    }

    #[test]
    fn test_weighted_selection_edges() {
        let mut rng = Pcg32::seed_from_u64(7);
        assert!(select_weighted(&[], &mut rng).is_none());

        let mut config = SpawnerConfig::default();
        config.set_weight(EnemyKind::Fast, 0.0);
        config.set_weight(EnemyKind::Swarm, 0.0);
        for _ in 0..1000 {
            assert_eq!(select_weighted(&config.enemy_types, &mut rng).unwrap().kind, EnemyKind::Tank);
        }

        config.set_weight(EnemyKind::Tank, 0.0);
        assert_eq!(select_weighted(&config.enemy_types, &mut rng).unwrap().kind, EnemyKind::Fast);
    }

    #[test]
    fn test_spawn_position_constraints() {
        let (reg, mut terrain, mut rng) = world(8);
        let config = SpawnerConfig::default();
        let hero = reg.hero().body.pos;
        for _ in 0..200 {
            let p = spawn_position(&config, reg.arena(), hero, &mut terrain, &mut rng);
            assert!(p.x >= 50.0 && p.y >= 50.0 && p.x <= 1998.0 && p.y <= 1998.0);
            assert!(p.distance(hero) >= 300.0 - 1e-3);
        }
    }

    #[test]
    fn test_spawn_position_falls_back_when_constraints_impossible() {
        let (reg, mut terrain, mut rng) = world(9);
        let config = SpawnerConfig {
            min_hero_distance: 1.0e6,
            ..SpawnerConfig::default()
        };
        let p = spawn_position(&config, reg.arena(), reg.hero().body.pos, &mut terrain, &mut rng);
        assert!(p.is_finite());
        assert!(p.x >= 50.0 && p.y >= 50.0 && p.x <= 1998.0 && p.y <= 1998.0);
    }

    proptest! {
        #[test]
        fn prop_population_stays_within_bounds(
            seed in any::<u64>(),
            max_count in 2usize..30,
            min_frac in 0.0f32..1.0,
            dts in prop::collection::vec(0.0f32..2.0, 1..40)
        ) {
            let (mut reg, mut terrain, mut rng) = world(seed);
            let min_count = ((max_count as f32) * min_frac) as usize;
            let config = SpawnerConfig { min_count, max_count, ..SpawnerConfig::default() };
            let mut spawner = EnemySpawner::new(false);
            for dt in dts {
                spawner.update(dt, &config, &mut reg, &mut terrain, &mut rng, &mut Vec::new());
                let live = reg.live_enemy_count();
                prop_assert!(live >= min_count);
                prop_assert!(live <= max_count);
            }
        }
    }
}
