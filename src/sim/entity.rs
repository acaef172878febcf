//! Entity records: shared body, enemies, projectiles
//!
//! Health is private to `Body` so the only ways to change it are
//! `take_damage`, `heal`, `raise_max_health` and `expire`. Once an entity is
//! dead it stays dead.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::circles_overlap;
use crate::error::SimError;
use crate::is_finite_point;
use crate::tuning::EnemyStats;

/// Stable entity identifier, allocated in increasing order
pub type EntityId = u32;

/// Which collection an entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Hero,
    Enemy,
    Projectile,
}

/// Enemy archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Fast,
    Tank,
    Swarm,
}

/// Result of a `take_damage` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Target already dead or the amount was not a positive number
    Ignored,
    Wounded,
    /// This call brought health to zero
    Killed,
}

/// Position, motion and health shared by every entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: EntityId,
    pub faction: Faction,
    pub pos: Vec2,
    /// Unit heading, or zero when standing still
    pub dir: Vec2,
    pub speed: f32,
    pub radius: f32,
    health: f32,
    max_health: f32,
    dead: bool,
    /// Entity that created this one (projectiles)
    pub owner: Option<EntityId>,
}

impl Body {
    pub fn new(
        id: EntityId,
        faction: Faction,
        pos: Vec2,
        radius: f32,
        max_health: f32,
    ) -> Result<Self, SimError> {
        if !is_finite_point(pos) {
            return Err(SimError::NonFinitePosition { x: pos.x, y: pos.y });
        }
        let max_health = max_health.max(0.0);
        Ok(Self {
            id,
            faction,
            pos,
            dir: Vec2::ZERO,
            speed: 0.0,
            radius,
            health: max_health,
            max_health,
            dead: false,
            owner: None,
        })
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Subtract health, clamping at zero
    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if self.dead || !amount.is_finite() || amount <= 0.0 {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - amount).max(0.0);
        if self.health <= 0.0 {
            self.dead = true;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Wounded
        }
    }

    /// Restore health up to the maximum; returns the amount actually healed
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.dead || !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health);
        self.health - before
    }

    /// Increase maximum health; the current health is left untouched
    pub fn raise_max_health(&mut self, delta: f32) {
        if delta.is_finite() && delta > 0.0 {
            self.max_health += delta;
        }
    }

    /// Restore health to the maximum
    pub fn heal_full(&mut self) {
        if !self.dead {
            self.health = self.max_health;
        }
    }

    /// Mark dead without a damage source (lifetime ran out, absorbed)
    pub fn expire(&mut self) {
        self.dead = true;
    }

    /// Advance position along the heading
    pub fn step(&mut self, dt: f32) {
        self.pos += self.dir * self.speed * dt;
    }

    pub fn overlaps(&self, other: &Body) -> bool {
        circles_overlap(self.pos, self.radius, other.pos, other.radius)
    }
}

/// A hostile unit that walks straight at the hero
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub body: Body,
    pub kind: EnemyKind,
    pub contact_damage: f32,
    /// Experience granted to the hero on kill
    pub experience: u32,
    pub color: u32,
}

impl Enemy {
    pub fn new(id: EntityId, kind: EnemyKind, stats: &EnemyStats, pos: Vec2) -> Result<Self, SimError> {
        let mut body = Body::new(id, Faction::Enemy, pos, stats.radius, stats.health)?;
        body.speed = stats.speed;
        Ok(Self {
            body,
            kind,
            contact_damage: stats.contact_damage,
            experience: stats.experience,
            color: stats.color,
        })
    }

    /// Chase `target`; with no target the enemy holds still this tick
    pub fn update(&mut self, dt: f32, target: Option<Vec2>) {
        if self.body.is_dead() {
            return;
        }
        self.body.dir = match target {
            Some(target) => crate::direction_to(self.body.pos, target),
            None => Vec2::ZERO,
        };
        self.body.step(dt);
    }
}

/// A bullet fired by a gun
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub body: Body,
    pub velocity: Vec2,
    pub damage: f32,
    /// Seconds before the projectile expires on its own
    pub lifetime: f32,
    pub age: f32,
    consumed: bool,
    pub color: u32,
}

impl Projectile {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EntityId,
        owner: EntityId,
        pos: Vec2,
        velocity: Vec2,
        radius: f32,
        damage: f32,
        lifetime: f32,
        color: u32,
    ) -> Result<Self, SimError> {
        let mut body = Body::new(id, Faction::Projectile, pos, radius, 1.0)?;
        body.owner = Some(owner);
        body.dir = velocity.normalize_or_zero();
        body.speed = velocity.length();
        Ok(Self {
            body,
            velocity,
            damage,
            lifetime,
            age: 0.0,
            consumed: false,
            color,
        })
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Move and age; expires once the lifetime runs out
    pub fn update(&mut self, dt: f32) {
        if self.body.is_dead() {
            return;
        }
        self.body.pos += self.velocity * dt;
        self.age += dt;
        if self.age >= self.lifetime {
            self.body.expire();
        }
    }

    /// Resolve at most one hit against the first live overlapping enemy
    ///
    /// Returns the index of the enemy hit and the damage outcome. A consumed
    /// projectile never hits again.
    pub fn try_hit(&mut self, enemies: &mut [Enemy]) -> Option<(usize, DamageOutcome)> {
        if self.consumed || self.body.is_dead() {
            return None;
        }
        let idx = enemies
            .iter()
            .position(|e| e.body.is_alive() && e.body.overlaps(&self.body))?;
        let outcome = enemies[idx].body.take_damage(self.damage);
        self.consumed = true;
        self.body.expire();
        Some((idx, outcome))
    }
}
