//! padkill daemon
//!
//! Watches game controller buttons and terminates configured processes when
//! a trigger button is held long enough.

mod action;
mod device;
mod hold_tracker;
mod monitor;
mod setup;
mod snapshot;
mod trigger;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use padkill_config::{Config, MonitorConfig};
use tokio::sync::watch;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

use crate::action::ProcessKiller;
use crate::hold_tracker::HoldTracker;
use crate::monitor::MonitorLoop;
use crate::snapshot::DeviceSnapshotSource;
use crate::trigger::TriggerSet;

#[derive(Parser, Debug)]
#[command(name = "padkilld")]
#[command(about = "Hold a controller button to kill configured processes")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/padkill/config.kdl")]
    config: String,

    /// Pick trigger buttons interactively even if the config lists some
    #[arg(long)]
    select: bool,

    /// Seconds a trigger must be held (overrides config)
    #[arg(long, allow_negative_numbers = true)]
    hold_seconds: Option<f64>,

    /// Device polling rate in Hz (overrides config)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    poll_hz: Option<u32>,

    /// Seconds before the same trigger may fire again (overrides config)
    #[arg(long, allow_negative_numbers = true)]
    cooldown_seconds: Option<f64>,
}

impl Args {
    /// Apply command-line overrides on top of the config file values.
    fn apply(&self, monitor: &mut MonitorConfig) -> Result<()> {
        if let Some(secs) = self.hold_seconds {
            monitor.hold = if secs <= 0.0 {
                Duration::ZERO
            } else {
                Duration::try_from_secs_f64(secs).context("Invalid --hold-seconds")?
            };
        }
        if let Some(hz) = self.poll_hz {
            monitor.poll_hz = hz;
        }
        if let Some(secs) = self.cooldown_seconds {
            if secs < 0.0 {
                bail!("--cooldown-seconds must not be negative, got {}", secs);
            }
            monitor.cooldown =
                Duration::try_from_secs_f64(secs).context("Invalid --cooldown-seconds")?;
        }
        Ok(())
    }
}

/// Resolve once SIGINT (Ctrl+C) or SIGTERM arrives, then flip `shutdown`.
async fn wait_for_shutdown(shutdown: watch::Sender<bool>) {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Ctrl+C received. Shutting down cleanly..."),
            Err(e) => {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("SIGTERM received. Shutting down cleanly...");
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let _ = shutdown.send(true);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; the config's log level is applied once it is parsed
    let env_filter = EnvFilter::try_from_default_env();
    let from_env = env_filter.is_ok();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let args = Args::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();

    tracing::info!("Loading configuration from {}", config_path.display());

    let mut config: Config = padkill_config::parse_config_or_default(&config_path)
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    if !from_env {
        filter_handle
            .reload(EnvFilter::new(config.global.log_level.as_filter()))
            .context("Failed to apply log level")?;
    }

    args.apply(&mut config.monitor)?;

    tracing::info!(
        "Hold {:.1}s, poll {} Hz, cooldown {:.1}s, mode '{}', {} process name(s)",
        config.monitor.hold.as_secs_f64(),
        config.monitor.poll_hz,
        config.monitor.cooldown.as_secs_f64(),
        config.monitor.mode,
        config.kill.processes.len()
    );

    let mut source = DeviceSnapshotSource::new(device::enumerate_controllers()?);
    if source.is_empty() {
        tracing::error!("No controllers detected. Plug one in and restart.");
        bail!("no input devices available");
    }
    let poll_interval = config.monitor.poll_interval();

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(wait_for_shutdown(shutdown_tx));

    let buttons = match config.triggers.take() {
        Some(buttons) if !args.select => {
            tracing::info!("Using {} trigger button(s) from configuration", buttons.len());
            buttons
        }
        _ => {
            tracing::info!("Selecting triggers on {} controller(s)", source.len());
            let done = setup::spawn_enter_listener()?;
            let buttons = tokio::select! {
                buttons = setup::select_buttons(&mut source, poll_interval, done) => buttons,
                _ = shutdown_rx.wait_for(|stop| *stop) => {
                    tracing::info!("Exiting during setup");
                    return Ok(());
                }
            };
            if !buttons.is_empty() {
                tracing::info!(
                    "Add this to {} to skip selection next time:\n{}",
                    config_path.display(),
                    padkill_config::generate_trigger_block(&buttons)
                );
            }
            buttons
        }
    };

    let triggers = TriggerSet::from_mode(config.monitor.mode, buttons);
    tracing::info!("{} trigger(s): {}", triggers.len(), triggers);

    let tracker = HoldTracker::new(&triggers, config.monitor.hold, config.monitor.cooldown);
    let killer = ProcessKiller::new(config.kill.processes.clone());
    tracing::debug!("Process names: {:?}", killer.names());

    let mut monitor = MonitorLoop::new(source, tracker, killer, poll_interval);
    let fired = monitor.run(shutdown_rx).await;

    // Dropping the monitor releases the controllers
    drop(monitor);

    tracing::info!("Stopped after {} trigger(s)", fired);

    Ok(())
}
