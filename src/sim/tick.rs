//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically. Each call runs
//! the components in a fixed order: weapons, entity update, kill rewards,
//! spawner, camera, game-over check.

use glam::Vec2;

use super::combat::CombatContext;
use super::hero::HeroIntent;
use super::state::{GameEvent, GamePhase, GameState};
use super::upgrades::offer_upgrades;
use crate::consts::*;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Direct movement; overrides the hero AI
    pub move_dir: Option<Vec2>,
    /// Walk toward a world point; overrides the hero AI
    pub target_point: Option<Vec2>,
    /// Dash request
    pub dash: bool,
    /// Pause toggle
    pub pause: bool,
}

impl TickInput {
    pub fn intent(&self) -> HeroIntent {
        HeroIntent {
            move_dir: self.move_dir,
            target_point: self.target_point,
            dash: self.dash,
        }
    }
}

/// Advance the game state by one timestep of `dt` seconds
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                log::info!("Paused at {:.2}s", state.time);
                return;
            }
            GamePhase::Paused => {
                state.phase = GamePhase::Playing;
                log::info!("Resumed at {:.2}s", state.time);
            }
            GamePhase::GameOver => {}
        }
    }

    // Don't tick if paused or game over
    match state.phase {
        GamePhase::Paused | GamePhase::GameOver => return,
        GamePhase::Playing => {}
    }

    if !dt.is_finite() || dt <= 0.0 {
        log::warn!("Skipping tick with invalid dt {}", dt);
        return;
    }

    state.time += dt;
    state.time_ticks += 1;
    let first_event = state.events.len();

    let mut ctx = CombatContext {
        registry: &mut state.registry,
        rng: &mut state.rng,
        events: &mut state.events,
        now: state.time,
        dt,
    };
    state.arsenal.update(&mut ctx);

    let charge = state.arsenal.charge_progress();
    state
        .registry
        .hero_mut()
        .set_charge_progress(charge, &state.config.hero);

    let intent = input.intent();
    state.registry.update(
        dt,
        &mut state.terrain,
        &intent,
        &state.config.hero,
        &mut state.rng,
        &mut state.events,
    );

    reward_kills(state, first_event);

    // Last mover, so the population bounds hold when the tick ends
    state.spawner.update(
        dt,
        &state.config.spawner,
        &mut state.registry,
        &mut state.terrain,
        &mut state.rng,
        &mut state.events,
    );

    let hero_pos = state.registry.hero().body.pos;
    state.camera.follow(hero_pos);

    if state.registry.hero().body.is_dead() {
        let progress = &state.registry.hero().progress;
        let (level, kills) = (progress.level, progress.kills);
        state.phase = GamePhase::GameOver;
        log::info!(
            "Game over at {:.1}s: level {}, {} kills",
            state.time,
            level,
            kills
        );
        state.events.push(GameEvent::GameOver {
            time: state.time,
            level,
            kills,
        });
    }
}

/// Experience, level-ups and upgrade offers for kills emitted since `from`
fn reward_kills(state: &mut GameState, from: usize) {
    let rewards: Vec<u32> = state.events[from..]
        .iter()
        .filter_map(|event| match event {
            GameEvent::EnemyKilled { experience, .. } => Some(*experience),
            _ => None,
        })
        .collect();

    for experience in rewards {
        let hero = state.registry.hero_mut();
        hero.progress.kills += 1;
        let levels = hero.gain_experience(experience, &state.config.hero);
        for level in levels {
            state.events.push(GameEvent::HeroLeveledUp { level });
            state.arsenal.on_hero_level_up();
            state.pending_upgrades = offer_upgrades(&state.arsenal, &mut state.rng);
        }
    }
}

/// Fixed-step accumulator that turns variable frame times into `SIM_DT` ticks
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    accumulator: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run as many fixed ticks as the elapsed frame time allows; returns
    /// the number run. One-shot inputs are cleared once consumed.
    pub fn advance(&mut self, state: &mut GameState, input: &mut TickInput, frame_dt: f32) -> u32 {
        if !frame_dt.is_finite() || frame_dt < 0.0 {
            log::warn!("Ignoring invalid frame dt {}", frame_dt);
            return 0;
        }
        self.accumulator += frame_dt.min(MAX_FRAME_DT);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(state, input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            input.pause = false;
            input.dash = false;
        }
        substeps
    }

    /// Fraction of a tick left in the accumulator, for render interpolation
    pub fn alpha(&self) -> f32 {
        self.accumulator / SIM_DT
    }
}
