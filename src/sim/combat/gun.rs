//! Cooldown guns: fire projectiles at the nearest enemy

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::{CombatContext, Cooldown};
use crate::angle_to;
use crate::sim::entity::{EntityId, Projectile};
use crate::tuning::GunSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gun {
    pub spec: GunSpec,
    cooldown: Cooldown,
    pub level: u32,
}

impl Gun {
    pub fn new(spec: GunSpec) -> Self {
        Self {
            spec,
            cooldown: Cooldown::new(),
            level: 1,
        }
    }

    /// Seconds between shots at the current fire rate
    pub fn period(&self) -> f32 {
        1.0 / self.spec.fire_rate.max(f32::EPSILON)
    }

    pub fn can_fire(&self, now: f32) -> bool {
        self.cooldown.ready(now, self.period())
    }

    pub fn cooldown_left(&self, now: f32) -> f32 {
        self.cooldown.remaining(now, self.period())
    }

    /// Fire at the nearest live enemy when ready; no target keeps the
    /// cooldown armed
    pub fn update(&mut self, owner: EntityId, ctx: &mut CombatContext<'_>) {
        if !self.can_fire(ctx.now) {
            return;
        }
        let Some((origin, target)) = ctx.owner_and_target(owner) else {
            return;
        };
        // Coincident points give atan2(0, 0) = 0, i.e. fire along +X
        let aim = angle_to(origin, target);

        for angle in self.pellet_angles(aim, ctx.rng) {
            let id = ctx.registry.next_entity_id();
            let velocity = glam::Vec2::from_angle(angle) * self.spec.projectile_speed;
            match Projectile::new(
                id,
                owner,
                origin,
                velocity,
                self.spec.projectile_radius,
                self.spec.damage,
                self.spec.projectile_lifetime,
                self.spec.color,
            ) {
                Ok(projectile) => {
                    ctx.registry.add_projectile(projectile);
                }
                Err(err) => log::warn!("{:?} failed to fire: {}", self.spec.kind, err),
            }
        }
        self.cooldown.trigger(ctx.now);
    }

    /// Firing angles for one shot, fanned evenly across `spread`
    pub fn pellet_angles(&self, aim: f32, rng: &mut Pcg32) -> Vec<f32> {
        let n = self.spec.pellets.max(1);
        (0..n)
            .map(|i| {
                let fan = if n > 1 {
                    (i as f32 / (n - 1) as f32 - 0.5) * self.spec.spread
                } else {
                    0.0
                };
                let jitter = if self.spec.jitter > 0.0 {
                    (rng.random::<f32>() - 0.5) * 2.0 * self.spec.jitter
                } else {
                    0.0
                };
                aim + fan + jitter
            })
            .collect()
    }

    pub fn level_up(&mut self) {
        self.level += 1;
        self.spec.damage *= 1.2;
        self.spec.projectile_radius *= 1.1;
        self.spec.fire_rate *= 1.1;
    }

    pub fn on_hero_level_up(&mut self) {
        self.spec.damage *= 1.1;
        self.spec.projectile_speed *= 1.05;
    }

    /// Multiply the time between shots
    pub fn scale_cooldown(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.spec.fire_rate /= factor;
        }
    }
}
