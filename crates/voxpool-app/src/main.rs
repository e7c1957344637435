//! # voxpool
//!
//! Headless runner for the voxpool audio channel manager. Loads a group
//! configuration, then drives a scripted scene through the manager on a
//! fixed tick and logs what the engine reports.

mod config;
mod scene;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voxpool_core::ClockMode;
use voxpool_engine::{AudioManager, Clock, SilentBackend, SystemClock};

use scene::Scene;

/// Command-line arguments for voxpool
#[derive(Parser, Debug)]
#[command(name = "voxpool")]
#[command(about = "Run a scripted scene through the audio channel manager")]
#[command(version)]
struct Args {
    /// Group configuration (JSON). Defaults to the user config dir, then built-in groups
    #[arg(short, long, env = "VOXPOOL_CONFIG")]
    config: Option<PathBuf>,

    /// Manager updates per second
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Print the final manager snapshot as JSON
    #[arg(long)]
    snapshot: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxpool=info,voxpool_engine=debug".into()),
        )
        .init();

    let args = Args::parse();
    info!("Starting voxpool v{}", env!("CARGO_PKG_VERSION"));

    let (manager_config, source) = config::resolve(args.config.as_deref())?;
    info!("Configuration: {source:?}");

    let backend = SilentBackend::new();
    let clock = SystemClock::new();
    let mut manager = AudioManager::new(backend.clone(), clock.clone());
    manager
        .initialize(&manager_config)
        .context("Failed to initialize audio manager")?;

    let tick = Duration::from_secs_f64(1.0 / f64::from(args.tick_rate.max(1)));
    let mut interval = tokio::time::interval(tick);
    let mut scene = Scene::new();
    let start = clock.now(ClockMode::Unscaled);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut ctrl_c => {
                warn!("Interrupted, stopping scene");
                break;
            }
        }

        let elapsed = clock.now(ClockMode::Unscaled) - start;
        scene.advance(&mut manager, &backend, elapsed)?;
        manager.update();
        for event in manager.events() {
            scene::log_event(&event);
        }

        if scene.is_finished(elapsed) {
            break;
        }
    }

    if args.snapshot {
        let snapshot = serde_json::to_string_pretty(&manager.snapshot())?;
        println!("{snapshot}");
    }

    manager.dispose();
    info!("voxpool finished, {} voices created", backend.voice_count());
    Ok(())
}
