//! Driver binary for the FieldPilot guidance loop.
//!
//! Loads configuration, assembles a simulated control unit, and steps it
//! on a fixed cadence while reading operator commands from stdin.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`fieldpilot-config.yaml` or the path given as the
//!    only argument)
//! 2. Initialize structured logging (tracing)
//! 3. Assemble the control unit
//! 4. Start the configured mission, if `mission.auto_start` is set
//! 5. Spawn the stdin command reader
//! 6. Run the step loop
//! 7. Log the result

mod error;
mod runner;

use std::path::{Path, PathBuf};
use std::time::Duration;

use fieldpilot_core::{CommandChain, FieldPilotConfig, build_control_unit};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::runner::RunParams;

/// Config file used when no path is given.
const DEFAULT_CONFIG_PATH: &str = "fieldpilot-config.yaml";

/// Queued operator lines before the reader waits for the loop.
const COMMAND_QUEUE_DEPTH: usize = 32;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the arguments, configuration, or assembly are invalid.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, loaded_from) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config);
    info!("fieldpilot-engine starting");
    match loaded_from {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("config file not found, using defaults"),
    }
    info!(
        seed = config.engine.seed,
        estimator = ?config.vehicle.estimator,
        primary_perception = %config.perception.primary,
        step_interval_ms = config.engine.step_interval_ms,
        max_steps = config.engine.max_steps,
        "configuration"
    );

    // 3. Assemble the control unit.
    let mut unit = build_control_unit(&config).map_err(EngineError::from)?;
    let boundaries = config.mission.field_boundaries();

    // 4. Auto-start.
    if config.mission.auto_start {
        let mission = &config.mission;
        let started =
            unit.start_operation(mission.target, boundaries.as_ref(), mission.implement);
        if let Err(e) = started {
            warn!(error = %e, target = %mission.target, "mission auto-start failed");
        }
    }

    // 5. Operator commands.
    let chain = CommandChain::standard(boundaries);
    let (tx, mut rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    tokio::spawn(read_commands(tx));

    // 6. Run.
    let params = RunParams {
        step_interval: Duration::from_millis(config.engine.step_interval_ms),
        max_steps: config.engine.max_steps,
    };
    let summary = runner::run(&mut unit, &chain, &mut rx, params).await;

    // 7. Log results.
    runner::log_run_end(&summary);
    info!(total_steps = unit.steps_executed(), "fieldpilot-engine shutdown complete");

    Ok(())
}

/// Load configuration from the path argument or the default file.
///
/// An explicit path must exist. A missing default file yields defaults
/// with environment overrides applied.
fn load_config() -> Result<(FieldPilotConfig, Option<PathBuf>), EngineError> {
    let mut args = std::env::args_os().skip(1);
    let explicit = args.next().map(PathBuf::from);
    if args.next().is_some() {
        return Err(EngineError::Usage {
            message: "expected at most one argument".to_owned(),
        });
    }

    let path = explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    if path.exists() || path != Path::new(DEFAULT_CONFIG_PATH) {
        let config = FieldPilotConfig::from_file(&path)?;
        return Ok((config, Some(path)));
    }

    let mut config = FieldPilotConfig::default();
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok((config, None))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(config: &FieldPilotConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Forward stdin lines to the step loop until EOF or the loop goes away.
async fn read_commands(tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read operator input");
                break;
            }
        }
    }
}
