//! Energy beam: a charge-then-fire state machine
//!
//! Idle -> Charging once an enemy exists; Charging -> Firing after the charge
//! duration with the aim angle locked; Firing -> Idle after the fire
//! duration. While firing, every enemy within half the beam width of the
//! beam segment takes damage each tick. The width widens over the first part
//! of the firing window, holds, then shrinks and jitters as it exhausts.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::{BeamView, CombatContext};
use crate::sim::collision::distance_to_segment;
use crate::sim::entity::EntityId;
use crate::tuning::BeamSpec;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BeamState {
    Idle,
    Charging { elapsed: f32 },
    /// `angle` is locked when firing starts
    Firing { elapsed: f32, angle: f32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyBeam {
    pub spec: BeamSpec,
    pub state: BeamState,
    /// Tracks the nearest enemy until firing locks it
    aim: f32,
    pulse_time: f32,
    /// Width used for the most recent damage pass
    last_width: f32,
    last_origin: Vec2,
    pub level: u32,
}

impl EnergyBeam {
    pub fn new(spec: BeamSpec) -> Self {
        Self {
            spec,
            state: BeamState::Idle,
            aim: 0.0,
            pulse_time: 0.0,
            last_width: 0.0,
            last_origin: Vec2::ZERO,
            level: 1,
        }
    }

    pub fn can_fire(&self) -> bool {
        self.state == BeamState::Idle
    }

    pub fn charge_progress(&self) -> f32 {
        match self.state {
            BeamState::Idle => 0.0,
            BeamState::Charging { elapsed } => (elapsed / self.spec.charge_duration).clamp(0.0, 1.0),
            BeamState::Firing { .. } => 1.0,
        }
    }

    /// How far exhaustion has progressed, `0` before it starts
    pub fn exhaustion(&self) -> f32 {
        let BeamState::Firing { elapsed, .. } = self.state else {
            return 0.0;
        };
        let start = self.spec.fire_duration * self.spec.exhaustion_fraction;
        if elapsed <= start {
            return 0.0;
        }
        ((elapsed - start) / (self.spec.fire_duration - start).max(f32::EPSILON)).clamp(0.0, 1.0)
    }

    /// Width envelope without pulse or random flicker
    pub fn phase_width(&self) -> f32 {
        let spec = &self.spec;
        match self.state {
            BeamState::Idle => 0.0,
            BeamState::Charging { .. } => spec.base_width * self.charge_progress(),
            BeamState::Firing { elapsed, .. } => {
                let growth = spec.fire_duration * spec.growth_fraction;
                let width = if elapsed < growth {
                    spec.base_width + (spec.max_width - spec.base_width) * (elapsed / growth)
                } else {
                    spec.max_width
                };
                width * (1.0 - self.exhaustion() * 0.3)
            }
        }
    }

    /// Width including the pulse and the exhaustion flicker
    pub fn current_width(&self, rng: &mut Pcg32) -> f32 {
        let mut width = self.phase_width() * (1.0 + self.pulse_time.sin() * self.spec.pulse_magnitude);
        let exhaustion = self.exhaustion();
        if exhaustion > 0.0 {
            width *= 1.0 + (rng.random::<f32>() - 0.5) * exhaustion * 0.4;
        }
        width.max(0.0)
    }

    pub fn update(&mut self, owner: EntityId, ctx: &mut CombatContext<'_>) {
        let Some(origin) = ctx.registry.position_of(owner) else {
            return;
        };
        self.last_origin = origin;
        let target = ctx
            .registry
            .nearest_enemy(origin)
            .map(|idx| ctx.registry.enemies()[idx].body.pos);
        if let Some(target) = target {
            if !matches!(self.state, BeamState::Firing { .. }) {
                self.aim = crate::angle_to(origin, target);
            }
        }

        self.state = match (self.state, target) {
            // The fire window runs to completion even if every enemy dies
            (BeamState::Firing { elapsed, angle }, _) => {
                let elapsed = elapsed + ctx.dt;
                self.state = BeamState::Firing { elapsed, angle };
                self.fire(origin, angle, ctx);
                if elapsed >= self.spec.fire_duration {
                    BeamState::Idle
                } else {
                    BeamState::Firing { elapsed, angle }
                }
            }
            (_, None) => BeamState::Idle,
            (BeamState::Idle, Some(_)) => BeamState::Charging { elapsed: 0.0 },
            (BeamState::Charging { elapsed }, Some(_)) => {
                let elapsed = elapsed + ctx.dt;
                if elapsed >= self.spec.charge_duration {
                    log::debug!("Beam firing at angle {:.2}", self.aim);
                    BeamState::Firing {
                        elapsed: 0.0,
                        angle: self.aim,
                    }
                } else {
                    BeamState::Charging { elapsed }
                }
            }
        };
        if self.state == BeamState::Idle {
            self.last_width = 0.0;
        }
        self.pulse_time += ctx.dt * self.spec.pulse_speed;
    }

    /// Damage every live enemy within half the current width of the beam
    fn fire(&mut self, origin: Vec2, angle: f32, ctx: &mut CombatContext<'_>) {
        let width = self.current_width(ctx.rng);
        self.last_width = width;
        let end = origin + Vec2::from_angle(angle) * self.spec.range;
        let hits: Vec<usize> = ctx
            .registry
            .enemies()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.body.is_alive() && distance_to_segment(e.body.pos, origin, end) < width / 2.0)
            .map(|(i, _)| i)
            .collect();
        for idx in hits {
            ctx.registry.damage_enemy(idx, self.spec.damage_per_tick, ctx.events);
        }
    }

    pub fn level_up(&mut self) {
        self.level += 1;
        self.spec.damage_per_tick *= 1.2;
        self.spec.charge_duration /= 1.1;
        self.spec.base_width *= 1.1;
        self.spec.max_width *= 1.1;
    }

    pub fn view(&self) -> BeamView {
        let angle = match self.state {
            BeamState::Firing { angle, .. } => angle,
            _ => self.aim,
        };
        let width = match self.state {
            BeamState::Firing { .. } => self.last_width,
            _ => self.phase_width(),
        };
        BeamView {
            state: self.state,
            origin: self.last_origin,
            angle,
            width,
            range: self.spec.range,
            charge_progress: self.charge_progress(),
        }
    }
}
