//! Chain lightning: one activation arcs through a sequence of enemies
//!
//! Targets are picked nearest-first from the enemies in range of the owner,
//! and every jump must also be in range of the previous target. Damage falls
//! off per jump down to a floor. Damage lands when the chain fires; the
//! per-jump delay only staggers when each bolt becomes visible, measured by
//! the chain's own age, which advances only inside `update`.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::bolt::{Bolt, lightning_bolt};
use super::{BoltView, CombatContext, Cooldown};
use crate::sim::entity::{Enemy, EntityId};
use crate::tuning::ChainSpec;

/// Enemy indices to jump through, in order
pub fn plan_chain(origin: Vec2, enemies: &[Enemy], spec: &ChainSpec) -> Vec<usize> {
    let mut candidates: Vec<(usize, f32)> = enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| e.body.is_alive())
        .map(|(i, e)| (i, e.body.pos.distance(origin)))
        .filter(|(_, d)| *d <= spec.range)
        .collect();
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut plan = Vec::new();
    let mut prev = origin;
    while plan.len() < spec.max_targets {
        let Some(k) = candidates
            .iter()
            .position(|(idx, _)| enemies[*idx].body.pos.distance(prev) <= spec.range)
        else {
            break;
        };
        let (idx, _) = candidates.remove(k);
        prev = enemies[idx].body.pos;
        plan.push(idx);
    }
    plan
}

/// Damage dealt by the jump at `index` (0 is the first target)
pub fn jump_damage(spec: &ChainSpec, index: usize) -> f32 {
    spec.base_damage * (1.0 - index as f32 * spec.falloff).max(spec.damage_floor)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainJump {
    pub target: EntityId,
    pub from: Vec2,
    pub to: Vec2,
    pub damage: f32,
    pub bolt: Bolt,
    /// Chain age at which this jump becomes visible
    pub reveal_at: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveChain {
    pub age: f32,
    pub jumps: Vec<ChainJump>,
}

impl ActiveChain {
    /// Age at which the last jump has fully faded
    pub fn lifetime(&self, fade: f32) -> f32 {
        self.jumps.last().map_or(0.0, |j| j.reveal_at) + fade
    }

    pub fn revealed(&self) -> impl Iterator<Item = &ChainJump> {
        self.jumps.iter().filter(|j| j.reveal_at <= self.age)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainLightning {
    pub spec: ChainSpec,
    cooldown: Cooldown,
    chains: VecDeque<ActiveChain>,
    pub level: u32,
}

impl ChainLightning {
    pub fn new(spec: ChainSpec) -> Self {
        Self {
            spec,
            cooldown: Cooldown::new(),
            chains: VecDeque::new(),
            level: 1,
        }
    }

    pub fn can_fire(&self, now: f32) -> bool {
        self.cooldown.ready(now, self.spec.cooldown)
    }

    pub fn cooldown_left(&self, now: f32) -> f32 {
        self.cooldown.remaining(now, self.spec.cooldown)
    }

    pub fn active_chains(&self) -> impl Iterator<Item = &ActiveChain> {
        self.chains.iter()
    }

    pub fn update(&mut self, owner: EntityId, ctx: &mut CombatContext<'_>) {
        let fade = self.spec.fade_duration;
        for chain in &mut self.chains {
            chain.age += ctx.dt;
        }
        self.chains.retain(|c| c.age < c.lifetime(fade));

        if !self.can_fire(ctx.now) {
            return;
        }
        let Some(origin) = ctx.registry.position_of(owner) else {
            return;
        };
        let plan = plan_chain(origin, ctx.registry.enemies(), &self.spec);
        if plan.is_empty() {
            return;
        }

        let mut jumps = Vec::with_capacity(plan.len());
        let mut from = origin;
        for (i, idx) in plan.into_iter().enumerate() {
            let enemy = &ctx.registry.enemies()[idx];
            let (target, to) = (enemy.body.id, enemy.body.pos);
            let damage = jump_damage(&self.spec, i);
            ctx.registry.damage_enemy(idx, damage, ctx.events);
            let bolt = lightning_bolt(from, to, &self.spec.bolt, &mut *ctx.rng);
            jumps.push(ChainJump {
                target,
                from,
                to,
                damage,
                bolt,
                reveal_at: i as f32 * self.spec.jump_delay,
            });
            from = to;
        }
        log::debug!("Chain lightning hit {} targets", jumps.len());

        while self.chains.len() >= self.spec.max_active_chains.max(1) {
            self.chains.pop_front();
        }
        self.chains.push_back(ActiveChain { age: 0.0, jumps });
        self.cooldown.trigger(ctx.now);
    }

    /// Bolts revealed so far with their fade alpha
    pub fn visible_segments(&self) -> Vec<BoltView> {
        let fade = self.spec.fade_duration.max(f32::EPSILON);
        self.chains
            .iter()
            .flat_map(|chain| {
                chain.revealed().map(move |jump| BoltView {
                    points: jump.bolt.points.clone(),
                    branches: jump.bolt.branches.clone(),
                    alpha: 1.0 - ((chain.age - jump.reveal_at) / fade).clamp(0.0, 1.0),
                })
            })
            .collect()
    }

    pub fn level_up(&mut self) {
        self.level += 1;
        self.spec.base_damage *= 1.2;
        self.scale_cooldown(1.0 / 1.1);
    }

    pub fn scale_cooldown(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.spec.cooldown *= factor;
        }
    }
}
