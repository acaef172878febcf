//! Game state and the events it emits
//!
//! `GameState` owns every component of a run. Hosts drive it through
//! `tick`, read it through `snapshot`, and react to `drain_events`.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use super::combat::{Arsenal, WeaponKind, WeaponView};
use super::entity::{Enemy, EnemyKind, EntityId};
use super::registry::EntityRegistry;
use super::spawner::EnemySpawner;
use super::terrain::{ChunkCoord, TerrainGrid};
use super::upgrades::{Upgrade, apply_upgrade};
use crate::error::SimError;
use crate::tuning::SimConfig;

/// Tile rings searched around the arena centre for an open hero start
const HERO_START_SEARCH_RINGS: i32 = 16;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    Paused,
    /// Hero died; the state stops advancing
    GameOver,
}

/// Discrete outputs for hosts (UI, audio, score keeping)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    EnemySpawned {
        id: EntityId,
        kind: EnemyKind,
        pos: Vec2,
    },
    EnemyKilled {
        id: EntityId,
        kind: EnemyKind,
        experience: u32,
        pos: Vec2,
    },
    HeroDamaged {
        amount: f32,
        health: f32,
    },
    HeroLeveledUp {
        level: u32,
    },
    WaveSpawned {
        wave: u32,
        count: usize,
    },
    UpgradeApplied {
        upgrade: Upgrade,
    },
    GameOver {
        time: f32,
        level: u32,
        kills: u32,
    },
}

impl GameEvent {
    pub fn killed(enemy: &Enemy) -> Self {
        GameEvent::EnemyKilled {
            id: enemy.body.id,
            kind: enemy.kind,
            experience: enemy.experience,
            pos: enemy.body.pos,
        }
    }
}

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    /// Live tuning; edits apply from the next tick
    pub config: SimConfig,
    pub phase: GamePhase,
    /// Simulated seconds while playing
    pub time: f32,
    pub time_ticks: u64,
    pub registry: EntityRegistry,
    pub terrain: TerrainGrid,
    pub spawner: EnemySpawner,
    pub arsenal: Arsenal,
    pub camera: Camera,
    /// Host surface size in world units, used for terrain culling
    pub viewport: Vec2,
    /// Offers from the most recent level-up, waiting for `apply_upgrade`
    pub pending_upgrades: Vec<Upgrade>,
    pub(crate) events: Vec<GameEvent>,
}

impl GameState {
    /// Create a new run; the configuration is validated first
    pub fn new(seed: u64, config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut terrain = TerrainGrid::new(config.terrain.clone());
        let hero_pos = terrain.nearest_open_point(config.arena.center(), HERO_START_SEARCH_RINGS);
        let registry = EntityRegistry::new(&config.hero, config.arena.clone(), hero_pos, &mut rng, config.debug)?;
        let arsenal = Arsenal::starting(registry.hero().body.id, &config.weapons);
        let spawner = EnemySpawner::new(config.debug);
        log::info!(
            "New run (seed {}) with hero at ({:.1}, {:.1})",
            seed,
            hero_pos.x,
            hero_pos.y
        );

        Ok(Self {
            seed,
            rng,
            phase: GamePhase::Playing,
            time: 0.0,
            time_ticks: 0,
            registry,
            terrain,
            spawner,
            arsenal,
            camera: Camera::at(hero_pos),
            viewport: Vec2::new(1280.0, 720.0),
            pending_upgrades: Vec::new(),
            events: Vec::new(),
            config,
        })
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// Apply the pending offer at `index` and discard the rest
    pub fn apply_upgrade(&mut self, index: usize) -> Option<Upgrade> {
        let upgrade = *self.pending_upgrades.get(index)?;
        apply_upgrade(
            upgrade,
            self.registry.hero_mut(),
            &mut self.arsenal,
            &self.config.weapons,
        );
        self.pending_upgrades.clear();
        self.events.push(GameEvent::UpgradeApplied { upgrade });
        Some(upgrade)
    }

    /// Resize the culling viewport; non-positive or non-finite sizes are ignored
    pub fn set_viewport(&mut self, size: Vec2) {
        if size.is_finite() && size.x > 0.0 && size.y > 0.0 {
            self.viewport = size;
        } else {
            log::warn!("Ignoring invalid viewport {:?}", size);
        }
    }

    /// Chunks under the camera, generated on demand
    pub fn visible_chunks(&mut self) -> Vec<ChunkCoord> {
        self.terrain.visible_chunks(&self.camera, self.viewport)
    }

    pub fn snapshot(&self) -> Snapshot {
        let hero = self.registry.hero();
        Snapshot {
            time: self.time,
            phase: self.phase,
            wave: self.spawner.wave(),
            hero: HeroView {
                id: hero.body.id,
                pos: hero.body.pos,
                radius: hero.body.radius,
                visual_radius: hero.visual_radius,
                health: hero.body.health(),
                max_health: hero.body.max_health(),
                level: hero.progress.level,
                experience: hero.progress.experience,
                next_level_at: hero.progress.next_threshold(&self.config.hero),
                kills: hero.progress.kills,
                dashing: hero.dash.is_active(),
                dash_cooldown: hero.dash.cooldown_left(),
            },
            enemies: self
                .registry
                .enemies()
                .iter()
                .map(|e| EnemyView {
                    id: e.body.id,
                    kind: e.kind,
                    pos: e.body.pos,
                    radius: e.body.radius,
                    health: e.body.health(),
                    max_health: e.body.max_health(),
                    color: e.color,
                })
                .collect(),
            projectiles: self
                .registry
                .projectiles()
                .iter()
                .map(|p| ProjectileView {
                    id: p.body.id,
                    pos: p.body.pos,
                    radius: p.body.radius,
                    color: p.color,
                })
                .collect(),
            weapons: self.arsenal.views(self.time),
            pending_upgrades: self.pending_upgrades.clone(),
        }
    }

    pub fn weapon_kinds(&self) -> Vec<WeaponKind> {
        self.arsenal.weapons.iter().map(|w| w.kind()).collect()
    }
}

/// Serializable view of a run for renderers and tooling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f32,
    pub phase: GamePhase,
    pub wave: u32,
    pub hero: HeroView,
    pub enemies: Vec<EnemyView>,
    pub projectiles: Vec<ProjectileView>,
    pub weapons: Vec<WeaponView>,
    pub pending_upgrades: Vec<Upgrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroView {
    pub id: EntityId,
    pub pos: Vec2,
    pub radius: f32,
    pub visual_radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub level: u32,
    pub experience: u32,
    pub next_level_at: u32,
    pub kills: u32,
    pub dashing: bool,
    pub dash_cooldown: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyView {
    pub id: EntityId,
    pub kind: EnemyKind,
    pub pos: Vec2,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub color: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    pub id: EntityId,
    pub pos: Vec2,
    pub radius: f32,
    pub color: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_places_hero_on_open_ground() {
        let mut state = GameState::new(12345, SimConfig::default()).unwrap();
        let pos = state.registry.hero().body.pos;
        assert!(!state.terrain.check_collision(pos));
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(
            state.weapon_kinds(),
            vec![WeaponKind::BasicGun, WeaponKind::ChainLightning]
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = SimConfig::default();
        config.spawner.min_count = 10;
        config.spawner.max_count = 5;
        assert!(matches!(
            GameState::new(1, config),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_apply_upgrade_consumes_offers() {
        let mut state = GameState::new(7, SimConfig::default()).unwrap();
        assert_eq!(state.apply_upgrade(0), None);

        state.pending_upgrades = vec![Upgrade::Regeneration, Upgrade::SpeedUp];
        assert_eq!(state.apply_upgrade(5), None);
        assert_eq!(state.pending_upgrades.len(), 2);

        assert_eq!(state.apply_upgrade(1), Some(Upgrade::SpeedUp));
        assert!(state.pending_upgrades.is_empty());
        assert_eq!(
            state.drain_events(),
            vec![GameEvent::UpgradeApplied {
                upgrade: Upgrade::SpeedUp
            }]
        );
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_snapshot_serializes() {
        let state = GameState::new(99, SimConfig::default()).unwrap();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.hero.level, 1);
        assert_eq!(snapshot.weapons.len(), 2);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_viewport_rejects_invalid_sizes() {
        let mut state = GameState::new(3, SimConfig::default()).unwrap();
        state.set_viewport(Vec2::new(-1.0, 100.0));
        assert_eq!(state.viewport, Vec2::new(1280.0, 720.0));
        state.set_viewport(Vec2::new(800.0, 600.0));
        assert_eq!(state.viewport, Vec2::new(800.0, 600.0));
        assert!(!state.visible_chunks().is_empty());
    }
}
