//! Weapons and the hero's arsenal
//!
//! Each weapon is a variant of `Weapon`; they share the `Cooldown` helper
//! and receive the world through a `CombatContext`. Weapons resolve their
//! owner by id every tick, so a missing or dead owner makes the update a
//! no-op.

pub mod beam;
pub mod bolt;
pub mod chain;
pub mod gun;

use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::registry::EntityRegistry;
use super::state::GameEvent;
use crate::tuning::WeaponsConfig;

pub use beam::{BeamState, EnergyBeam};
pub use bolt::{Bolt, lightning_bolt, midpoint_displacement};
pub use chain::{ActiveChain, ChainJump, ChainLightning, plan_chain};
pub use gun::Gun;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    BasicGun,
    MiniGun,
    Shotgun,
    EnergyBeam,
    ChainLightning,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 5] = [
        WeaponKind::BasicGun,
        WeaponKind::MiniGun,
        WeaponKind::Shotgun,
        WeaponKind::EnergyBeam,
        WeaponKind::ChainLightning,
    ];
}

/// Readiness timer measured against the simulation clock. The period is
/// passed in on every query so writes to a weapon's spec apply at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cooldown {
    last_fired: Option<f32>,
}

impl Cooldown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready(&self, now: f32, period: f32) -> bool {
        match self.last_fired {
            None => true,
            Some(t) => now - t >= period,
        }
    }

    pub fn trigger(&mut self, now: f32) {
        self.last_fired = Some(now);
    }

    pub fn remaining(&self, now: f32, period: f32) -> f32 {
        match self.last_fired {
            None => 0.0,
            Some(t) => (period - (now - t)).max(0.0),
        }
    }
}

/// World access handed to weapons for one tick
pub struct CombatContext<'a> {
    pub registry: &'a mut EntityRegistry,
    pub rng: &'a mut Pcg32,
    pub events: &'a mut Vec<GameEvent>,
    /// Simulation clock (seconds)
    pub now: f32,
    pub dt: f32,
}

impl CombatContext<'_> {
    /// Owner position and the nearest live enemy position, if both exist
    pub fn owner_and_target(&self, owner: EntityId) -> Option<(Vec2, Vec2)> {
        let origin = self.registry.position_of(owner)?;
        let idx = self.registry.nearest_enemy(origin)?;
        Some((origin, self.registry.enemies()[idx].body.pos))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Weapon {
    Gun(Gun),
    Beam(EnergyBeam),
    Chain(ChainLightning),
}

impl Weapon {
    /// Build a fresh level-1 weapon from configuration
    pub fn from_kind(kind: WeaponKind, config: &WeaponsConfig) -> Self {
        match kind {
            WeaponKind::BasicGun => Weapon::Gun(Gun::new(config.basic_gun.clone())),
            WeaponKind::MiniGun => Weapon::Gun(Gun::new(config.minigun.clone())),
            WeaponKind::Shotgun => Weapon::Gun(Gun::new(config.shotgun.clone())),
            WeaponKind::EnergyBeam => Weapon::Beam(EnergyBeam::new(config.beam.clone())),
            WeaponKind::ChainLightning => Weapon::Chain(ChainLightning::new(config.chain.clone())),
        }
    }

    pub fn kind(&self) -> WeaponKind {
        match self {
            Weapon::Gun(gun) => gun.spec.kind,
            Weapon::Beam(_) => WeaponKind::EnergyBeam,
            Weapon::Chain(_) => WeaponKind::ChainLightning,
        }
    }

    pub fn level(&self) -> u32 {
        match self {
            Weapon::Gun(gun) => gun.level,
            Weapon::Beam(beam) => beam.level,
            Weapon::Chain(chain) => chain.level,
        }
    }

    pub fn can_fire(&self, now: f32) -> bool {
        match self {
            Weapon::Gun(gun) => gun.can_fire(now),
            Weapon::Beam(beam) => beam.can_fire(),
            Weapon::Chain(chain) => chain.can_fire(now),
        }
    }

    pub fn update(&mut self, owner: EntityId, ctx: &mut CombatContext<'_>) {
        match self {
            Weapon::Gun(gun) => gun.update(owner, ctx),
            Weapon::Beam(beam) => beam.update(owner, ctx),
            Weapon::Chain(chain) => chain.update(owner, ctx),
        }
    }

    /// Weapon's own level: damage x1.2, fire rate x1.1, projectile size x1.1
    pub fn level_up(&mut self) {
        match self {
            Weapon::Gun(gun) => gun.level_up(),
            Weapon::Beam(beam) => beam.level_up(),
            Weapon::Chain(chain) => chain.level_up(),
        }
    }

    /// Bonus every weapon receives when the hero levels up
    pub fn on_hero_level_up(&mut self) {
        match self {
            Weapon::Gun(gun) => gun.on_hero_level_up(),
            Weapon::Beam(beam) => beam.spec.damage_per_tick *= 1.1,
            Weapon::Chain(chain) => chain.spec.base_damage *= 1.1,
        }
    }

    /// Multiply the time between activations
    pub fn scale_cooldown(&mut self, factor: f32) {
        match self {
            Weapon::Gun(gun) => gun.scale_cooldown(factor),
            Weapon::Beam(beam) => beam.spec.charge_duration *= factor,
            Weapon::Chain(chain) => chain.scale_cooldown(factor),
        }
    }

    /// Multiply projectile size (beam width for the beam)
    pub fn scale_projectile_size(&mut self, factor: f32) {
        match self {
            Weapon::Gun(gun) => gun.spec.projectile_radius *= factor,
            Weapon::Beam(beam) => {
                beam.spec.base_width *= factor;
                beam.spec.max_width *= factor;
            }
            Weapon::Chain(_) => {}
        }
    }

    pub fn view(&self, now: f32) -> WeaponView {
        let mut view = WeaponView {
            kind: self.kind(),
            level: self.level(),
            cooldown_left: 0.0,
            beam: None,
            chains: Vec::new(),
        };
        match self {
            Weapon::Gun(gun) => view.cooldown_left = gun.cooldown_left(now),
            Weapon::Beam(beam) => view.beam = Some(beam.view()),
            Weapon::Chain(chain) => {
                view.cooldown_left = chain.cooldown_left(now);
                view.chains = chain.visible_segments();
            }
        }
        view
    }
}

/// Draw data for the beam
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamView {
    pub state: BeamState,
    pub origin: Vec2,
    pub angle: f32,
    pub width: f32,
    pub range: f32,
    pub charge_progress: f32,
}

/// Revealed lightning geometry for one chain jump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoltView {
    pub points: Vec<Vec2>,
    pub branches: Vec<Vec<Vec2>>,
    /// 1.0 when fresh, fading to 0.0
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponView {
    pub kind: WeaponKind,
    pub level: u32,
    pub cooldown_left: f32,
    pub beam: Option<BeamView>,
    pub chains: Vec<BoltView>,
}

/// Weapons carried by one owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arsenal {
    pub owner: EntityId,
    pub weapons: Vec<Weapon>,
}

impl Arsenal {
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            weapons: Vec::new(),
        }
    }

    /// Arsenal holding the configured starting weapons
    pub fn starting(owner: EntityId, config: &WeaponsConfig) -> Self {
        let mut arsenal = Self::new(owner);
        for &kind in &config.starting {
            arsenal.add(Weapon::from_kind(kind, config));
        }
        arsenal
    }

    pub fn has(&self, kind: WeaponKind) -> bool {
        self.weapons.iter().any(|w| w.kind() == kind)
    }

    /// Add a weapon; one of each kind at most
    pub fn add(&mut self, weapon: Weapon) -> bool {
        if self.has(weapon.kind()) {
            log::warn!("Arsenal already holds {:?}", weapon.kind());
            return false;
        }
        log::info!("Equipped {:?}", weapon.kind());
        self.weapons.push(weapon);
        true
    }

    pub fn get_mut(&mut self, kind: WeaponKind) -> Option<&mut Weapon> {
        self.weapons.iter_mut().find(|w| w.kind() == kind)
    }

    pub fn update(&mut self, ctx: &mut CombatContext<'_>) {
        let owner = self.owner;
        for weapon in &mut self.weapons {
            weapon.update(owner, ctx);
        }
    }

    /// Beam charge progress in `[0, 1]` (0 without a beam)
    pub fn charge_progress(&self) -> f32 {
        self.weapons
            .iter()
            .filter_map(|w| match w {
                Weapon::Beam(beam) => Some(beam.charge_progress()),
                _ => None,
            })
            .fold(0.0, f32::max)
    }

    pub fn on_hero_level_up(&mut self) {
        for weapon in &mut self.weapons {
            weapon.on_hero_level_up();
        }
    }

    pub fn views(&self, now: f32) -> Vec<WeaponView> {
        self.weapons.iter().map(|w| w.view(now)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_ready_cycle() {
        let mut cd = Cooldown::new();
        assert!(cd.ready(0.0, 0.5));
        cd.trigger(1.0);
        assert!(!cd.ready(1.2, 0.5));
        assert!((cd.remaining(1.2, 0.5) - 0.3).abs() < 1e-6);
        assert!(cd.ready(1.5, 0.5));
        // A longer period takes effect on the next query
        assert!(!cd.ready(1.5, 1.0));
        assert!((cd.remaining(1.5, 1.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_starting_arsenal() {
        let arsenal = Arsenal::starting(1, &WeaponsConfig::default());
        assert!(arsenal.has(WeaponKind::BasicGun));
        assert!(arsenal.has(WeaponKind::ChainLightning));
        assert!(!arsenal.has(WeaponKind::EnergyBeam));
    }

    #[test]
    fn test_arsenal_rejects_duplicate_kind() {
        let config = WeaponsConfig::default();
        let mut arsenal = Arsenal::new(1);
        assert!(arsenal.add(Weapon::from_kind(WeaponKind::Shotgun, &config)));
        assert!(!arsenal.add(Weapon::from_kind(WeaponKind::Shotgun, &config)));
        assert_eq!(arsenal.weapons.len(), 1);
    }

    #[test]
    fn test_from_kind_round_trips_kind() {
        let config = WeaponsConfig::default();
        for kind in WeaponKind::ALL {
            assert_eq!(Weapon::from_kind(kind, &config).kind(), kind);
        }
    }

    #[test]
    fn test_charge_progress_without_beam_is_zero() {
        let arsenal = Arsenal::starting(1, &WeaponsConfig::default());
        assert_eq!(arsenal.charge_progress(), 0.0);
    }
}
