//! Hero Swarm headless runner
//!
//! Drives the simulation through the fixed-step frame clock, auto-picks the
//! first upgrade offer on every level-up and prints a run summary.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use hero_swarm::SimConfig;
use hero_swarm::sim::{FrameClock, GameEvent, GameState, TickInput};

#[derive(Parser)]
#[command(author, version, about = "Run a headless Hero Swarm simulation", long_about = None)]
struct Args {
    /// Simulated seconds to run (stops early on game over)
    #[arg(long, default_value_t = 60.0)]
    seconds: f32,
    /// Run seed
    #[arg(long, default_value_t = 12345)]
    seed: u64,
    /// JSON balance file; unset fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Host frame time fed to the frame clock
    #[arg(long, default_value_t = 1.0 / 60.0)]
    frame_dt: f32,
    /// Write the final snapshot as JSON
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Print the default configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

#[derive(Default)]
struct Tally {
    spawned: u32,
    killed: u32,
    hits_taken: u32,
    upgrades: u32,
}

impl Tally {
    fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::EnemySpawned { .. } => self.spawned += 1,
            GameEvent::EnemyKilled { .. } => self.killed += 1,
            GameEvent::HeroDamaged { .. } => self.hits_taken += 1,
            GameEvent::UpgradeApplied { .. } => self.upgrades += 1,
            GameEvent::HeroLeveledUp { .. } | GameEvent::WaveSpawned { .. } | GameEvent::GameOver { .. } => {}
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.dump_config {
        println!("{}", SimConfig::default().to_json_pretty()?);
        return Ok(());
    }
    if !(args.frame_dt.is_finite() && args.frame_dt > 0.0) {
        bail!("--frame-dt must be a positive number, got {}", args.frame_dt);
    }

    let config = match &args.config {
        Some(path) => SimConfig::load(path).with_context(|| format!("load config {}", path.display()))?,
        None => SimConfig::default(),
    };
    let mut state = GameState::new(args.seed, config).context("build game state")?;
    log::info!("Hero Swarm (headless) running {:.0}s, seed {}", args.seconds, args.seed);

    let mut clock = FrameClock::new();
    let mut input = TickInput::default();
    let mut tally = Tally::default();
    while state.time < args.seconds && !state.is_over() {
        clock.advance(&mut state, &mut input, args.frame_dt);
        if !state.pending_upgrades.is_empty() {
            state.apply_upgrade(0);
        }
        for event in state.drain_events() {
            log::debug!("{:?}", event);
            tally.record(&event);
        }
    }

    let snapshot = state.snapshot();
    println!(
        "{:.1}s {:?}: level {}, health {:.0}/{:.0}, wave {}",
        snapshot.time,
        snapshot.phase,
        snapshot.hero.level,
        snapshot.hero.health,
        snapshot.hero.max_health,
        snapshot.wave
    );
    println!(
        "spawned {}, killed {}, hits taken {}, upgrades {}, alive {}",
        tally.spawned,
        tally.killed,
        tally.hits_taken,
        tally.upgrades,
        snapshot.enemies.len()
    );
    let weapons: Vec<String> = snapshot
        .weapons
        .iter()
        .map(|w| format!("{:?} L{}", w.kind, w.level))
        .collect();
    println!("weapons: {}", weapons.join(", "));

    if let Some(path) = &args.snapshot {
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json).with_context(|| format!("write snapshot {}", path.display()))?;
        log::info!("Snapshot written to {}", path.display());
    }
    Ok(())
}
