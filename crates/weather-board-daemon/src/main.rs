//! Weather Board Daemon
//!
//! Samples the weather board periodically and renders every sample to a
//! terminal dashboard, a rotating logfile, stdout or a named pipe.

mod acquisition;
mod cli;
mod clock;
mod config;
mod error;
mod rollover;
mod sample;
mod scheduler;
mod signals;
mod sinks;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use acquisition::Acquirer;
use cli::Cli;
use clock::{Clock, SystemClock};
use config::{Config, Output, Settings};
use error::EXIT_FATAL;
use rollover::RolloverPolicy;
use scheduler::{Cadence, Scheduler, Shutdown};
use signals::{SignalController, SignalFlags};
use sinks::ActiveSink;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli);

    let verbose = match &config {
        Ok(config) => config.verbose,
        Err(_) => cli.verbose,
    };
    init_tracing(verbose);

    let outcome = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(shutdown) => ExitCode::from(shutdown.exit_code()),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Diagnostics go to stderr; stdout is a data sink.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run(config: Config) -> Result<Shutdown> {
    let settings = config.resolve().context("Invalid configuration")?;
    log_settings(&settings);

    let source = weather_board_hw::detect(&settings.device, settings.board)
        .context("Failed to start communication with the weather board")?;
    let variant = source.variant();
    info!("Detected {} on {}", variant, settings.device);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let start = clock.now();
    let sink = ActiveSink::open(&settings.output, settings.rollover.is_some(), variant, start)?;

    let flags = Arc::new(SignalFlags::new());
    let logging = matches!(settings.output, Output::Logfile(_));
    let _signals = SignalController::install(Arc::clone(&flags), logging)?;

    // Leave the settings readable before the dashboard takes over the screen.
    if settings.verbose && settings.output == Output::Terminal {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    let scheduler = Scheduler::new(
        Acquirer::new(source, settings.sea_level_hpa),
        sink,
        RolloverPolicy::new(settings.rollover, settings.period, start),
        flags,
        clock,
        Cadence {
            period: settings.period,
            timing: settings.timing,
        },
    );
    let shutdown = scheduler.run().await?;
    info!("Weather board daemon stopped");
    Ok(shutdown)
}

fn log_settings(settings: &Settings) {
    info!("Weather board daemon {}", env!("CARGO_PKG_VERSION"));
    info!("I2C bus: {}", settings.device);
    info!("Update period: {:?}", settings.period);
    match &settings.output {
        Output::Terminal => info!("Output: terminal dashboard"),
        Output::Logfile(name) => info!("Output: logfile {}", name),
        Output::Stdout => info!("Output: stdout"),
        Output::Pipe(path) => info!("Output: named pipe {}", path.display()),
    }
    if let Some(rollover) = &settings.rollover {
        info!("Logfile rollover: {:?}", rollover);
    }
}
