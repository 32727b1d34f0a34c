// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vcam::{Config, SinkKind};

mod cli;

#[derive(Parser)]
#[command(name = "vcam")]
#[command(about = "Stream rendered frames to an OS virtual camera")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output width in pixels (must be even)
    #[arg(long, global = true)]
    width: Option<u32>,

    /// Output height in pixels (must be even)
    #[arg(long, global = true)]
    height: Option<u32>,

    /// Frames per second
    #[arg(long, global = true)]
    fps: Option<u32>,

    /// Write frames directly to a V4L2 loopback device (e.g. /dev/video10)
    /// instead of spawning the helper process
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// Helper command for the process bridge, e.g.
    /// "python3 scripts/virtual_camera_bridge.py"
    #[arg(long, global = true)]
    helper: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream an animated test pattern to the virtual camera (default)
    Stream {
        /// Stop after this many seconds instead of running until Ctrl-C
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Open the configured sink, report whether it becomes ready, and close it
    Probe,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=vcam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let args = Cli::parse();

    let mut config = Config::load_default();
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(path) = args.device {
        config.sink = SinkKind::Device { path };
    } else if let Some(helper) = args.helper {
        let command: Vec<String> = helper.split_whitespace().map(String::from).collect();
        if command.is_empty() {
            return Err("helper command is empty".into());
        }
        config.sink = SinkKind::Bridge { command };
    }

    match args.command {
        Some(Commands::Stream { duration }) => cli::stream(config, duration),
        Some(Commands::Probe) => cli::probe(config),
        None => cli::stream(config, None),
    }
}
