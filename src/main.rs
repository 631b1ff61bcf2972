// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use pose_camera::config::Config;
use pose_camera::constants::simulation;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "pose-camera")]
#[command(about = "Real-time body pose and joint angle pipeline")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Configuration file (default: <config dir>/pose-camera/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute joint angles for one landmark payload file
    Angles {
        /// JSON landmark list ({"landmark": [{"x", "y", "z", "visibility"}, ...]})
        payload: PathBuf,
    },

    /// Run the full pipeline against simulated collaborators
    Simulate(SimulateArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct SimulateArgs {
    /// Frames to stream before stopping
    #[arg(short, long, default_value_t = 90)]
    frames: u64,

    /// Switch facing after this many frames
    #[arg(short, long)]
    switch_after: Option<u64>,

    /// Pause and resume halfway through
    #[arg(short, long)]
    pause_resume: bool,

    /// Simulated camera frame rate
    #[arg(long, default_value_t = simulation::DEFAULT_FPS)]
    fps: u32,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        Self {
            frames: 90,
            switch_after: None,
            pause_resume: false,
            fps: simulation::DEFAULT_FPS,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=pose_camera=trace, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_target(true)
        .with_level(true)
        .init();

    match cli.command {
        Some(Commands::Angles { payload }) => cli::print_angles(&payload),
        Some(Commands::Simulate(args)) => cli::simulate(&config, &args.into()),
        None => cli::simulate(&config, &SimulateArgs::default().into()),
    }
}

impl From<SimulateArgs> for cli::SimulationPlan {
    fn from(args: SimulateArgs) -> Self {
        Self {
            frames: args.frames,
            switch_after: args.switch_after,
            pause_resume: args.pause_resume,
            fps: args.fps,
        }
    }
}
