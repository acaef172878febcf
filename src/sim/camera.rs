//! Camera that trails the hero for terrain culling

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// World point at the centre of the view
    pub center: Vec2,
    pub zoom: f32,
    /// Fraction of the remaining distance covered per follow step
    pub smoothing: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            zoom: 1.0,
            smoothing: 0.1,
        }
    }
}

impl Camera {
    pub fn at(center: Vec2) -> Self {
        Self {
            center,
            ..Self::default()
        }
    }

    /// Ease toward `target`
    pub fn follow(&mut self, target: Vec2) {
        if crate::is_finite_point(target) {
            self.center += (target - self.center) * self.smoothing.clamp(0.0, 1.0);
        }
    }

    /// World-space corners (min, max) covered by a viewport of the given size
    pub fn view_rect(&self, viewport: Vec2) -> (Vec2, Vec2) {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        let half = viewport / (2.0 * zoom);
        (self.center - half, self.center + half)
    }
}
