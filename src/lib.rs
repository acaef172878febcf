//! Hero Swarm - simulation core for an auto-battling survival arena
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, weapons, spawning, terrain, game state)
//! - `tuning`: Data-driven game balance
//! - `error`: Error type for construction and configuration failures

pub mod error;
pub mod sim;
pub mod tuning;

pub use error::SimError;
pub use tuning::SimConfig;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest frame delta fed into the accumulator
    pub const MAX_FRAME_DT: f32 = 0.1;
}

/// Unit vector from `from` toward `to`, or zero when the points coincide
#[inline]
pub fn direction_to(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalize_or_zero()
}

/// Angle of the direction from `from` toward `to` (radians, atan2 convention)
#[inline]
pub fn angle_to(from: Vec2, to: Vec2) -> f32 {
    let delta = to - from;
    delta.y.atan2(delta.x)
}

/// Whether both coordinates are finite
#[inline]
pub fn is_finite_point(p: Vec2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}
