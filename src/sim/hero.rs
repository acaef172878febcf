//! The hero: autonomous steering, dash, regeneration and progression

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{Body, DamageOutcome, EntityId, Faction};
use crate::error::SimError;
use crate::tuning::{DashConfig, HeroConfig};

/// Movement commands for one tick; anything left `None` falls back to the AI
#[derive(Debug, Clone, Default)]
pub struct HeroIntent {
    /// Direct movement direction (normalized internally)
    pub move_dir: Option<Vec2>,
    /// Walk toward a world point
    pub target_point: Option<Vec2>,
    /// Trigger a dash if it is off cooldown
    pub dash: bool,
}

/// Current AI stance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    /// Keep distance; flee inside the kite radius, circle outside it
    Kite,
    /// Close in; circle once inside the avoidance radius
    Aggressive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeroAi {
    pub behavior: Behavior,
    timer: f32,
    duration: f32,
}

impl HeroAi {
    pub fn new(config: &HeroConfig, rng: &mut Pcg32) -> Self {
        Self {
            behavior: Behavior::Kite,
            timer: 0.0,
            duration: roll_duration(config, rng),
        }
    }

    /// Advance the behaviour timer, re-rolling the stance when it runs out
    pub fn update(&mut self, dt: f32, config: &HeroConfig, rng: &mut Pcg32) {
        self.timer += dt;
        if self.timer >= self.duration {
            self.behavior = if rng.random_bool(config.kite_probability) {
                Behavior::Kite
            } else {
                Behavior::Aggressive
            };
            self.timer = 0.0;
            self.duration = roll_duration(config, rng);
            log::debug!("Hero behaviour -> {:?} for {:.2}s", self.behavior, self.duration);
        }
    }

    /// Heading toward/away/around the nearest enemy
    ///
    /// `None` means keep the current heading (enemy exactly on top of us).
    pub fn steer(&self, from: Vec2, nearest: Option<Vec2>, config: &HeroConfig) -> Option<Vec2> {
        let Some(enemy) = nearest else {
            return Some(Vec2::ZERO);
        };
        let delta = enemy - from;
        let distance = delta.length();
        if distance <= f32::EPSILON {
            return None;
        }
        let toward = delta / distance;
        let strafe = toward.perp();
        let heading = match self.behavior {
            Behavior::Kite if distance < config.kite_radius => -toward,
            Behavior::Kite => strafe,
            Behavior::Aggressive if distance > config.avoidance_radius => toward,
            Behavior::Aggressive => strafe,
        };
        Some(heading)
    }
}

fn roll_duration(config: &HeroConfig, rng: &mut Pcg32) -> f32 {
    if config.behavior_max_duration > config.behavior_min_duration {
        rng.random_range(config.behavior_min_duration..config.behavior_max_duration)
    } else {
        config.behavior_min_duration
    }
}

/// Short invincible burst of speed that rams enemies
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dash {
    active: bool,
    timer: f32,
    cooldown_left: f32,
    dir: Vec2,
    /// Enemies already hit during the current dash
    struck: Vec<EntityId>,
}

impl Dash {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn can_dash(&self) -> bool {
        !self.active && self.cooldown_left <= 0.0
    }

    pub fn cooldown_left(&self) -> f32 {
        self.cooldown_left.max(0.0)
    }

    /// Start dashing along `dir` (+X when `dir` is zero)
    pub fn start(&mut self, dir: Vec2, config: &DashConfig) -> bool {
        if !self.can_dash() {
            return false;
        }
        let dir = dir.normalize_or_zero();
        self.dir = if dir == Vec2::ZERO { Vec2::X } else { dir };
        self.active = true;
        self.timer = 0.0;
        self.cooldown_left = config.cooldown;
        self.struck.clear();
        true
    }

    /// Displacement for this tick; ends the dash once its duration elapses
    pub fn advance(&mut self, dt: f32, config: &DashConfig) -> Vec2 {
        self.cooldown_left -= dt;
        if !self.active {
            return Vec2::ZERO;
        }
        self.timer += dt;
        let delta = self.dir * config.speed * dt;
        if self.timer >= config.duration {
            self.active = false;
        }
        delta
    }

    pub fn direction(&self) -> Vec2 {
        self.dir
    }

    /// Record a hit; false if this enemy was already struck this dash
    pub fn strike(&mut self, id: EntityId) -> bool {
        if self.struck.contains(&id) {
            false
        } else {
            self.struck.push(id);
            true
        }
    }
}

/// Level and experience bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progression {
    pub level: u32,
    /// Cumulative experience over the whole run
    pub experience: u32,
    pub kills: u32,
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
            kills: 0,
        }
    }
}

impl Progression {
    /// Add experience; returns every level newly reached, in order.
    /// Leveling stops where the threshold table stops growing.
    pub fn gain(&mut self, amount: u32, config: &HeroConfig) -> Vec<u32> {
        self.experience = self.experience.saturating_add(amount);
        let mut reached = Vec::new();
        loop {
            let threshold = config.experience_for_level(self.level);
            if self.experience < threshold {
                break;
            }
            if self.level > 1 && threshold <= config.experience_for_level(self.level - 1) {
                break;
            }
            self.level += 1;
            reached.push(self.level);
        }
        reached
    }

    pub fn next_threshold(&self, config: &HeroConfig) -> u32 {
        config.experience_for_level(self.level)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hero {
    pub body: Body,
    /// Collision radius before any charge growth
    pub base_radius: f32,
    /// Radius for drawing; grows while the beam charges
    pub visual_radius: f32,
    /// Health restored per regeneration interval
    pub regeneration: f32,
    regen_timer: f32,
    immunity_left: f32,
    pub ai: HeroAi,
    pub dash: Dash,
    pub progress: Progression,
}

impl Hero {
    pub fn new(id: EntityId, pos: Vec2, config: &HeroConfig, rng: &mut Pcg32) -> Result<Self, SimError> {
        let mut body = Body::new(id, Faction::Hero, pos, config.radius, config.max_health)?;
        body.speed = config.speed;
        Ok(Self {
            body,
            base_radius: config.radius,
            visual_radius: config.radius,
            regeneration: config.regeneration,
            regen_timer: 0.0,
            immunity_left: 0.0,
            ai: HeroAi::new(config, rng),
            dash: Dash::default(),
            progress: Progression::default(),
        })
    }

    pub fn is_invincible(&self) -> bool {
        self.dash.is_active()
    }

    /// Pick this tick's heading from operator intent or the AI, and start a
    /// dash if requested
    pub fn think(
        &mut self,
        dt: f32,
        intent: &HeroIntent,
        nearest_enemy: Option<Vec2>,
        config: &HeroConfig,
        rng: &mut Pcg32,
    ) {
        if let Some(dir) = intent.move_dir.filter(|d| crate::is_finite_point(*d)) {
            self.body.dir = dir.normalize_or_zero();
        } else if let Some(target) = intent.target_point.filter(|p| crate::is_finite_point(*p)) {
            let remaining = target - self.body.pos;
            // Stop once we would overshoot the point this tick
            self.body.dir = if remaining.length() <= self.body.speed * dt {
                Vec2::ZERO
            } else {
                remaining.normalize_or_zero()
            };
        } else {
            self.ai.update(dt, config, rng);
            if let Some(heading) = self.ai.steer(self.body.pos, nearest_enemy, config) {
                self.body.dir = heading;
            }
        }

        if intent.dash && self.dash.start(self.body.dir, &config.dash) {
            log::debug!("Hero dash toward ({:.2}, {:.2})", self.dash.direction().x, self.dash.direction().y);
        }
    }

    /// Move for one tick: dash displacement replaces walking while active
    pub fn advance(&mut self, dt: f32, config: &HeroConfig) {
        let dashing = self.dash.is_active();
        let dash_delta = self.dash.advance(dt, &config.dash);
        if dashing {
            self.body.pos += dash_delta;
        } else {
            self.body.step(dt);
        }
        self.immunity_left = (self.immunity_left - dt).max(0.0);
    }

    /// Periodic healing; returns the amount healed this tick
    pub fn regenerate(&mut self, dt: f32, config: &HeroConfig) -> f32 {
        if self.body.is_dead() {
            return 0.0;
        }
        self.regen_timer += dt;
        let mut healed = 0.0;
        while self.regen_timer >= config.regen_interval {
            self.regen_timer -= config.regen_interval;
            healed += self.body.heal(self.regeneration);
        }
        healed
    }

    /// Apply enemy contact damage unless dashing or inside the immunity window
    pub fn receive_contact(&mut self, amount: f32, config: &HeroConfig) -> Option<DamageOutcome> {
        if self.is_invincible() || self.immunity_left > 0.0 || self.body.is_dead() {
            return None;
        }
        let outcome = self.body.take_damage(amount);
        if outcome != DamageOutcome::Ignored {
            self.immunity_left = config.contact_immunity;
        }
        Some(outcome)
    }

    /// Grant experience and apply level-up rewards; returns the levels reached
    pub fn gain_experience(&mut self, amount: u32, config: &HeroConfig) -> Vec<u32> {
        let reached = self.progress.gain(amount, config);
        for &level in &reached {
            self.body.raise_max_health(config.health_per_level);
            self.body.heal_full();
            if level % 3 == 0 {
                self.regeneration += config.regen_per_third_level;
            }
            log::info!(
                "Hero reached level {} (max health {:.0}, regen {:.1})",
                level,
                self.body.max_health(),
                self.regeneration
            );
        }
        reached
    }

    /// Scale the visual radius with beam charge progress in `[0, 1]`
    pub fn set_charge_progress(&mut self, progress: f32, config: &HeroConfig) {
        let max = self.base_radius * config.max_radius_factor;
        self.visual_radius = self.base_radius + (max - self.base_radius) * progress.clamp(0.0, 1.0);
    }
}
