//! Polarity Run headless runner
//!
//! Drives the simulation with a fixed-step accumulator, restarts on death and
//! reports the best distance. Useful for tuning and soak testing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use polarity_run::consts::{MAX_SUBSTEPS, SIM_DT};
use polarity_run::sim::{GameEvent, GameState, KinematicBody, MotionController, TickInput, restart, tick};
use polarity_run::{Tuning, logging};

/// Run the polarity runner simulation without a renderer
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// World seed
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 60.0)]
    seconds: f32,

    /// Host frame length in milliseconds
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f32,

    /// Tuning JSON file (falls back to $POLARITY_RUN_TUNING, then defaults)
    #[arg(short, long)]
    tuning: Option<PathBuf>,

    /// Let the simulation play itself
    #[arg(short, long)]
    autopilot: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Host-side game instance
struct Game {
    state: GameState,
    body: KinematicBody,
    accumulator: f32,
    input: TickInput,
    runs: u32,
    best_distance: f32,
}

impl Game {
    fn new(seed: u64, tuning: Tuning) -> Self {
        let state = GameState::new(seed, tuning);
        let body = KinematicBody::new(state.player.position, state.tuning.motion.player_radius);
        Self {
            state,
            body,
            accumulator: 0.0,
            input: TickInput::default(),
            runs: 1,
            best_distance: 0.0,
        }
    }

    /// Run simulation ticks for one host frame
    fn update(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.input.clone();
            tick(&mut self.state, &mut self.body, &input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.input.jump = false;
            self.input.toggle_polarity = false;
            self.input.lane_left = false;
            self.input.lane_right = false;

            self.handle_events();
        }
    }

    fn handle_events(&mut self) {
        let restart_requested = self
            .state
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::RestartRequested));

        for event in &self.state.events {
            match event {
                GameEvent::Jumped { boosted: true, .. } => log::debug!("Rescue jump"),
                GameEvent::DeathStarted => {
                    log::info!("Run {} over at {:.1} m", self.runs, self.state.player.distance_travelled)
                }
                _ => {}
            }
        }

        if restart_requested {
            self.best_distance = self.best_distance.max(self.state.player.distance_travelled);
            restart(&mut self.state, &mut self.body);
            self.runs += 1;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let tuning = match &args.tuning {
        Some(path) => Tuning::load(path)
            .with_context(|| format!("failed to load tuning from {}", path.display()))?,
        None => Tuning::load_or_default(),
    };

    log::info!("Polarity Run (headless) starting, seed {}", args.seed);

    let mut game = Game::new(args.seed, tuning);
    game.input.autopilot = args.autopilot;

    let frame_dt = (args.frame_ms / 1000.0).max(SIM_DT);
    let frames = (args.seconds.max(0.0) / frame_dt).ceil() as u64;
    for _ in 0..frames {
        game.update(frame_dt);
    }

    let best = game.best_distance.max(game.state.player.distance_travelled);
    log::info!(
        "Finished after {} run(s): best {:.1} m, {} blocks live, player at {:.1?}",
        game.runs,
        best,
        game.state.blocks().len(),
        game.body.position()
    );
    Ok(())
}
