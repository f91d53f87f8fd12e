//! Gati daemon - motion-gated do-not-disturb on a simulated platform
//!
//! Loads the configuration, starts the motion engine and feeds transitions
//! into a [`DndGate`] until Ctrl-C.
//!
//! ```text
//! gati --config gati.toml
//! gati --source simulated --log-level debug
//! ```

use clap::Parser;
use gati::{
    DndGate, Error, GatiConfig, LoggingController, MonotonicClock, MotionEngine, Result,
    SimulatedPlatform, SourceSelection,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_CONFIG_PATH: &str = "gati.toml";
const STATUS_INTERVAL: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "gati", version, about = "Motion detection daemon")]
struct Args {
    /// Configuration file (defaults to ./gati.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured motion source
    #[arg(short, long, value_enum)]
    source: Option<SourceSelection>,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,

    /// Start with do-not-disturb gating switched off
    #[arg(long)]
    no_dnd: bool,
}

fn load_config(args: &Args) -> Result<GatiConfig> {
    let mut config = match &args.config {
        Some(path) => GatiConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => GatiConfig::load(DEFAULT_CONFIG_PATH)?,
        None => GatiConfig::default(),
    };
    if let Some(source) = args.source {
        config.engine.source = source;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Gati v{} starting...", env!("CARGO_PKG_VERSION"));
    match &args.config {
        Some(path) => log::info!("Using config: {}", path.display()),
        None => log::info!("Using config: {} or defaults", DEFAULT_CONFIG_PATH),
    }

    let clock = Arc::new(MonotonicClock::new());
    let platform = Arc::new(SimulatedPlatform::new(
        config.simulation.clone(),
        clock.clone(),
    )?);
    let control = platform.control();

    let engine = MotionEngine::new(config, platform, clock)?;
    let kind = engine.select_source()?;

    let gate = Arc::new(DndGate::new(LoggingController::new(), !args.no_dnd));
    engine.start(kind, gate.clone())?;

    // Set up shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let mut last_status = Instant::now();
    while running.load(Ordering::Relaxed) {
        thread::sleep(POLL_INTERVAL);

        if last_status.elapsed() >= STATUS_INTERVAL {
            last_status = Instant::now();
            let stats = engine.filter_stats().unwrap_or_default();
            log::info!(
                "Status: simulated_moving={}, in_motion={}, dnd={}, average={:?}, accepted={}, rejected={}",
                control.is_moving(),
                engine.is_in_motion(),
                gate.is_dnd_active(),
                engine.average(),
                stats.accepted,
                stats.rejected
            );
        }
    }

    engine.stop();
    log::info!(
        "Gati stopped after {} do-not-disturb changes",
        gate.with_controller(|c| c.changes())
    );
    Ok(())
}
