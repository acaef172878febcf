//! Data-driven game balance
//!
//! Every value the simulation reads for balance lives here. All sections use
//! `#[serde(default)]` so a JSON file only has to name what it overrides.
//! The spawner re-reads its section every tick, which makes spawn tuning a
//! plain field write on a running `GameState`.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::sim::combat::WeaponKind;
use crate::sim::entity::EnemyKind;

/// Root configuration for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Verbose per-entity diagnostics through `log::debug!`
    pub debug: bool,
    pub arena: ArenaConfig,
    pub hero: HeroConfig,
    pub spawner: SpawnerConfig,
    pub terrain: TerrainConfig,
    pub weapons: WeaponsConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            debug: false,
            arena: ArenaConfig::default(),
            hero: HeroConfig::default(),
            spawner: SpawnerConfig::default(),
            terrain: TerrainConfig::default(),
            weapons: WeaponsConfig::default(),
        }
    }
}

/// Playable rectangle `[0, size.x] x [0, size.y]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub size: Vec2,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            size: Vec2::new(2048.0, 2048.0),
        }
    }
}

impl ArenaConfig {
    pub fn center(&self) -> Vec2 {
        self.size * 0.5
    }

    /// Clamp a circle of `radius` so it stays fully inside the arena
    pub fn clamp_circle(&self, pos: Vec2, radius: f32) -> Vec2 {
        let lo = Vec2::splat(radius).min(self.size * 0.5);
        let hi = (self.size - Vec2::splat(radius)).max(lo);
        pos.clamp(lo, hi)
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        pos.x >= 0.0 && pos.y >= 0.0 && pos.x <= self.size.x && pos.y <= self.size.y
    }
}

/// Hero dash ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub cooldown: f32,
    pub duration: f32,
    pub speed: f32,
    /// Damage dealt once to each enemy touched during a dash
    pub damage: f32,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            cooldown: 5.0,
            duration: 0.3,
            speed: 1200.0,
            damage: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroConfig {
    pub radius: f32,
    /// Visual radius multiplier reached at full beam charge
    pub max_radius_factor: f32,
    pub speed: f32,
    pub max_health: f32,
    /// Health restored every `regen_interval` seconds
    pub regeneration: f32,
    pub regen_interval: f32,
    /// Seconds of invulnerability after taking contact damage
    pub contact_immunity: f32,
    /// Extra reach added to the sum of radii for contact damage
    pub contact_padding: f32,
    pub kite_radius: f32,
    pub avoidance_radius: f32,
    pub kite_probability: f64,
    pub behavior_min_duration: f32,
    pub behavior_max_duration: f32,
    pub dash: DashConfig,
    /// Cumulative experience needed to leave level 1, 2, ...
    pub level_thresholds: Vec<u32>,
    /// Threshold increment once the table runs out
    pub level_step: u32,
    pub health_per_level: f32,
    /// Regeneration bonus granted on every third level
    pub regen_per_third_level: f32,
}

impl Default for HeroConfig {
    fn default() -> Self {
        Self {
            radius: 20.0,
            max_radius_factor: 2.5,
            speed: 200.0,
            max_health: 100.0,
            regeneration: 1.0,
            regen_interval: 1.0,
            contact_immunity: 0.5,
            contact_padding: 5.0,
            kite_radius: 200.0,
            avoidance_radius: 100.0,
            kite_probability: 0.7,
            behavior_min_duration: 1.0,
            behavior_max_duration: 3.0,
            dash: DashConfig::default(),
            level_thresholds: vec![100, 250, 400, 600, 900, 1200],
            level_step: 300,
            health_per_level: 10.0,
            regen_per_third_level: 0.2,
        }
    }
}

impl HeroConfig {
    /// Cumulative experience required to advance past `level` (1-based)
    pub fn experience_for_level(&self, level: u32) -> u32 {
        let idx = level.saturating_sub(1) as usize;
        match self.level_thresholds.get(idx) {
            Some(&threshold) => threshold,
            None => {
                let last = self.level_thresholds.last().copied().unwrap_or(0);
                let extra = (idx + 1 - self.level_thresholds.len()) as u32;
                last.saturating_add(self.level_step.saturating_mul(extra))
            }
        }
    }
}

/// Per-kind enemy statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyStats {
    pub radius: f32,
    pub speed: f32,
    pub health: f32,
    pub contact_damage: f32,
    pub experience: u32,
    /// RGB tint for renderers
    pub color: u32,
}

/// One row of the weighted enemy table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTypeConfig {
    pub kind: EnemyKind,
    pub weight: f32,
    pub stats: EnemyStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Seconds between waves before difficulty scaling
    pub base_interval: f32,
    /// Shortest interval difficulty scaling may reach
    pub interval_floor: f32,
    /// Difficulty multiplier gained per completed wave
    pub wave_growth: f32,
    /// Seconds between difficulty re-evaluations
    pub adaptation_interval: f32,
    pub enemies_per_wave: usize,
    pub min_count: usize,
    pub max_count: usize,
    /// Keep-out band along the arena edges
    pub spawn_margin: f32,
    pub min_hero_distance: f32,
    pub max_spawn_attempts: u32,
    pub enemy_types: Vec<EnemyTypeConfig>,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            base_interval: 3.0,
            interval_floor: 0.5,
            wave_growth: 0.1,
            adaptation_interval: 5.0,
            enemies_per_wave: 4,
            min_count: 2,
            max_count: 50,
            spawn_margin: 50.0,
            min_hero_distance: 300.0,
            max_spawn_attempts: 24,
            enemy_types: vec![
                EnemyTypeConfig {
                    kind: EnemyKind::Fast,
                    weight: 2.0,
                    stats: EnemyStats {
                        radius: 15.0,
                        speed: 120.0,
                        health: 50.0,
                        contact_damage: 10.0,
                        experience: 10,
                        color: 0xff4444,
                    },
                },
                EnemyTypeConfig {
                    kind: EnemyKind::Tank,
                    weight: 1.0,
                    stats: EnemyStats {
                        radius: 25.0,
                        speed: 60.0,
                        health: 200.0,
                        contact_damage: 20.0,
                        experience: 25,
                        color: 0x8844ff,
                    },
                },
                EnemyTypeConfig {
                    kind: EnemyKind::Swarm,
                    weight: 3.0,
                    stats: EnemyStats {
                        radius: 12.0,
                        speed: 90.0,
                        health: 30.0,
                        contact_damage: 5.0,
                        experience: 5,
                        color: 0x44ff44,
                    },
                },
            ],
        }
    }
}

impl SpawnerConfig {
    pub fn stats_for(&self, kind: EnemyKind) -> Option<&EnemyStats> {
        self.enemy_types
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| &t.stats)
    }

    /// Update the selection weight of one enemy kind; returns false if absent
    pub fn set_weight(&mut self, kind: EnemyKind, weight: f32) -> bool {
        match self.enemy_types.iter_mut().find(|t| t.kind == kind) {
            Some(row) => {
                row.weight = weight.max(0.0);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub seed: u32,
    /// Chunk edge length in world units
    pub chunk_size: f32,
    /// Tile edge length in world units
    pub tile_size: f32,
    /// Multiplier applied to global tile coordinates before hashing
    pub noise_scale: f64,
    /// Noise below this is water
    pub water_threshold: f64,
    /// Noise above this is wall
    pub wall_threshold: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chunk_size: 512.0,
            tile_size: 32.0,
            noise_scale: 0.1,
            water_threshold: 0.12,
            wall_threshold: 0.9,
        }
    }
}

impl TerrainConfig {
    pub fn tiles_per_side(&self) -> usize {
        (self.chunk_size / self.tile_size).round().max(1.0) as usize
    }
}

/// Stats of a projectile-firing gun
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GunSpec {
    pub kind: WeaponKind,
    pub damage: f32,
    /// Shots per second
    pub fire_rate: f32,
    pub projectile_speed: f32,
    pub projectile_radius: f32,
    pub projectile_lifetime: f32,
    /// Projectiles per shot
    pub pellets: u32,
    /// Total fan angle across all pellets (radians)
    pub spread: f32,
    /// Random per-pellet angle offset amplitude (radians)
    pub jitter: f32,
    pub color: u32,
}

impl GunSpec {
    pub fn basic() -> Self {
        Self {
            kind: WeaponKind::BasicGun,
            damage: 25.0,
            fire_rate: 2.0,
            projectile_speed: 500.0,
            projectile_radius: 6.0,
            projectile_lifetime: 0.3,
            pellets: 1,
            spread: 0.0,
            jitter: 0.0,
            color: 0xffff00,
        }
    }

    pub fn minigun() -> Self {
        Self {
            kind: WeaponKind::MiniGun,
            damage: 10.0,
            fire_rate: 10.0,
            projectile_speed: 500.0,
            projectile_radius: 4.0,
            projectile_lifetime: 0.5,
            pellets: 1,
            spread: 0.0,
            jitter: 0.05,
            color: 0x00ffff,
        }
    }

    pub fn shotgun() -> Self {
        Self {
            kind: WeaponKind::Shotgun,
            damage: 35.0,
            fire_rate: 1.2,
            projectile_speed: 800.0,
            projectile_radius: 5.0,
            projectile_lifetime: 0.6,
            pellets: 24,
            spread: std::f32::consts::FRAC_PI_3,
            jitter: 0.05,
            color: 0xff8800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamSpec {
    pub charge_duration: f32,
    pub fire_duration: f32,
    pub base_width: f32,
    pub max_width: f32,
    pub range: f32,
    /// Damage applied to each enemy inside the beam on every firing tick
    pub damage_per_tick: f32,
    /// Share of the fire duration spent widening from base to max width
    pub growth_fraction: f32,
    /// Share of the fire duration after which the beam starts to exhaust
    pub exhaustion_fraction: f32,
    pub pulse_speed: f32,
    pub pulse_magnitude: f32,
}

impl Default for BeamSpec {
    fn default() -> Self {
        Self {
            charge_duration: 7.0,
            fire_duration: 3.0,
            base_width: 200.0,
            max_width: 400.0,
            range: 2000.0,
            damage_per_tick: 20.0,
            growth_fraction: 0.4,
            exhaustion_fraction: 0.7,
            pulse_speed: 15.0,
            pulse_magnitude: 0.3,
        }
    }
}

/// Midpoint-displacement parameters for lightning bolts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoltParams {
    /// Recursion depth for the main bolt
    pub detail: u32,
    /// Offset amplitude as a fraction of segment length
    pub displacement: f32,
    /// Segments shorter than this are not subdivided
    pub min_segment: f32,
    /// Depth at which the displacement scale equals 1
    pub reference_depth: f32,
    pub branch_probability: f64,
    /// Total angular range of branch directions (radians)
    pub branch_angle_range: f32,
    /// Branch length as a fraction of its parent segment
    pub branch_length: f32,
    pub max_branches: usize,
}

impl Default for BoltParams {
    fn default() -> Self {
        Self {
            detail: 6,
            displacement: 0.4,
            min_segment: 10.0,
            reference_depth: 5.0,
            branch_probability: 0.3,
            branch_angle_range: 0.8,
            branch_length: 0.6,
            max_branches: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSpec {
    pub cooldown: f32,
    pub base_damage: f32,
    /// Damage lost per jump as a fraction of base damage
    pub falloff: f32,
    /// Lowest damage fraction any jump can fall to
    pub damage_floor: f32,
    pub range: f32,
    pub max_targets: usize,
    /// Seconds between successive jumps becoming visible
    pub jump_delay: f32,
    /// Seconds a fully revealed chain lingers
    pub fade_duration: f32,
    pub max_active_chains: usize,
    pub bolt: BoltParams,
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self {
            cooldown: 0.8,
            base_damage: 120.0,
            falloff: 0.15,
            damage_floor: 0.3,
            range: 250.0,
            max_targets: 35,
            jump_delay: 0.08,
            fade_duration: 0.4,
            max_active_chains: 3,
            bolt: BoltParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponsConfig {
    pub basic_gun: GunSpec,
    pub minigun: GunSpec,
    pub shotgun: GunSpec,
    pub beam: BeamSpec,
    pub chain: ChainSpec,
    /// Weapons the hero starts the run with
    pub starting: Vec<WeaponKind>,
}

impl Default for WeaponsConfig {
    fn default() -> Self {
        Self {
            basic_gun: GunSpec::basic(),
            minigun: GunSpec::minigun(),
            shotgun: GunSpec::shotgun(),
            beam: BeamSpec::default(),
            chain: ChainSpec::default(),
            starting: vec![WeaponKind::BasicGun, WeaponKind::ChainLightning],
        }
    }
}

impl SimConfig {
    /// Parse a (possibly partial) JSON document and validate it
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations the simulation cannot run with
    pub fn validate(&self) -> Result<(), SimError> {
        fn invalid(msg: impl Into<String>) -> Result<(), SimError> {
            Err(SimError::InvalidConfig(msg.into()))
        }

        if !(self.arena.size.x > 0.0 && self.arena.size.y > 0.0) {
            return invalid("arena size must be positive");
        }

        let hero = &self.hero;
        if hero.radius <= 0.0 || hero.max_health <= 0.0 {
            return invalid("hero radius and max_health must be positive");
        }
        if hero.regen_interval <= 0.0 {
            return invalid("hero regen_interval must be positive");
        }
        if hero.behavior_min_duration <= 0.0
            || hero.behavior_max_duration < hero.behavior_min_duration
        {
            return invalid("hero behaviour durations must satisfy 0 < min <= max");
        }
        if !(0.0..=1.0).contains(&hero.kite_probability) {
            return invalid("hero kite_probability must be within [0, 1]");
        }
        if hero.level_thresholds.first().is_none_or(|&first| first == 0) {
            return invalid("hero level_thresholds must start with a positive threshold");
        }
        if hero.level_thresholds.windows(2).any(|w| w[1] <= w[0]) {
            return invalid("hero level_thresholds must be strictly increasing");
        }
        if hero.level_step == 0 {
            return invalid("hero level_step must be positive");
        }

        let spawner = &self.spawner;
        if spawner.min_count > spawner.max_count {
            return invalid(format!(
                "spawner min_count {} exceeds max_count {}",
                spawner.min_count, spawner.max_count
            ));
        }
        if spawner.base_interval <= 0.0 || spawner.interval_floor <= 0.0 {
            return invalid("spawner intervals must be positive");
        }
        if spawner.adaptation_interval <= 0.0 {
            return invalid("spawner adaptation_interval must be positive");
        }
        if spawner.enemy_types.is_empty() {
            return invalid("spawner enemy_types must not be empty");
        }
        if spawner.enemy_types.iter().any(|t| t.weight < 0.0)
            || spawner.enemy_types.iter().all(|t| t.weight <= 0.0)
        {
            return invalid("spawner weights must be non-negative with a positive total");
        }

        let terrain = &self.terrain;
        if terrain.tile_size <= 0.0 || terrain.chunk_size < terrain.tile_size {
            return invalid("terrain tile_size must be positive and no larger than chunk_size");
        }
        let tiles = terrain.chunk_size / terrain.tile_size;
        if (tiles - tiles.round()).abs() > 1e-3 {
            return invalid("terrain chunk_size must be a multiple of tile_size");
        }

        let weapons = &self.weapons;
        for gun in [&weapons.basic_gun, &weapons.minigun, &weapons.shotgun] {
            if gun.fire_rate <= 0.0 || gun.pellets == 0 {
                return invalid(format!("{:?} needs a positive fire_rate and pellet count", gun.kind));
            }
        }
        if weapons.beam.charge_duration <= 0.0 || weapons.beam.fire_duration <= 0.0 {
            return invalid("beam durations must be positive");
        }
        if weapons.chain.cooldown <= 0.0 || weapons.chain.max_active_chains == 0 {
            return invalid("chain cooldown and max_active_chains must be positive");
        }
        let bolt = &weapons.chain.bolt;
        if !(bolt.reference_depth > 0.0) {
            return invalid("bolt reference_depth must be positive");
        }
        if !(bolt.min_segment >= 0.0) {
            return invalid("bolt min_segment must not be negative");
        }

        Ok(())
    }
}
