//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time advances only through `tick`
//! - Seeded RNG only
//! - Stable iteration order (insertion order, which is entity ID order)
//! - No rendering or platform dependencies

pub mod camera;
pub mod collision;
pub mod combat;
pub mod entity;
pub mod hero;
pub mod registry;
pub mod spawner;
pub mod state;
pub mod terrain;
pub mod tick;
pub mod upgrades;

pub use camera::Camera;
pub use combat::{Arsenal, BeamState, Weapon, WeaponKind, WeaponView};
pub use entity::{DamageOutcome, Enemy, EnemyKind, EntityId, Faction, Projectile};
pub use hero::{Hero, HeroIntent};
pub use registry::EntityRegistry;
pub use spawner::{EnemySpawner, select_weighted, spawn_position};
pub use state::{GameEvent, GamePhase, GameState, Snapshot};
pub use terrain::{ChunkCoord, TerrainGrid, Tile};
pub use tick::{FrameClock, TickInput, tick};
pub use upgrades::{Upgrade, offer_upgrades};
