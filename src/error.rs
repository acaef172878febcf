//! Errors raised while constructing entities or loading configuration
//!
//! Per-tick problems (stale ids, missing targets) are not errors; the
//! simulation degrades those to no-ops.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("entity position ({x}, {y}) is not finite")]
    NonFinitePosition { x: f32, y: f32 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}
