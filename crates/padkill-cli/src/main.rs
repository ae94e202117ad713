//! padkill CLI
//!
//! Configuration and device inspection tool for padkill.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use padkill_config::{buttons, Config, TriggerMode};

#[derive(Parser, Debug)]
#[command(name = "padkill")]
#[command(about = "Hold a controller button to kill configured processes")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/padkill/config.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// List connected controllers and their button indices
    Devices,

    /// Write a default configuration file
    Init {
        /// Output path (defaults to --config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();

    match cli.command {
        Commands::Validate => cmd_validate(&config_path),
        Commands::Devices => cmd_devices(),
        Commands::Init { output, force } => {
            let path = output.unwrap_or(config_path);
            cmd_init(&path, force)?;
            println!("Wrote default configuration: {}", path.display());
            println!("\nRun `padkilld --select` to pick trigger buttons.");
            Ok(())
        }
    }
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = padkill_config::parse_config(config_path)?;

    println!("Configuration is valid!");
    print!("{}", summarize(&config));
    Ok(())
}

/// Human-readable overview of a parsed config.
fn summarize(config: &Config) -> String {
    let monitor = &config.monitor;
    let mut out = String::new();

    out.push_str(&format!("  Log level: {}\n", config.global.log_level));
    out.push_str(&format!(
        "  Hold: {:.2}s, cooldown: {:.2}s, poll: {} Hz\n",
        monitor.hold.as_secs_f64(),
        monitor.cooldown.as_secs_f64(),
        monitor.poll_hz
    ));

    let mode = match monitor.mode {
        TriggerMode::Any => "any button",
        TriggerMode::All => "all buttons together",
    };
    match &config.triggers {
        Some(triggers) => {
            out.push_str(&format!("  Triggers ({}): {}\n", mode, triggers.len()));
            for button in triggers {
                out.push_str(&format!("    - {}\n", button));
            }
        }
        None => out.push_str("  Triggers: none (selected interactively at startup)\n"),
    }

    out.push_str(&format!("  Processes: {}\n", config.kill.processes.len()));
    for name in &config.kill.processes {
        out.push_str(&format!("    - {}\n", name));
    }

    out
}

fn cmd_devices() -> miette::Result<()> {
    println!("Connected controllers:\n");

    let mut paths = Vec::new();
    for entry in std::fs::read_dir("/dev/input").into_diagnostic()? {
        let path = entry.into_diagnostic()?.path();
        if buttons::event_number(&path).is_some() {
            paths.push(path);
        }
    }
    paths.sort_by_key(|path| buttons::event_number(path));

    let mut index = 0;
    for path in paths {
        let device = match evdev::Device::open(&path) {
            Ok(device) => device,
            Err(_) => {
                // Skip devices we can't open
                continue;
            }
        };

        let Some(keys) = device.supported_keys() else {
            continue;
        };
        let codes: Vec<u16> = keys.iter().map(|key| key.code()).collect();
        if !buttons::is_controller_codes(codes.iter().copied()) {
            continue;
        }

        let id = device.input_id();
        let button_codes = buttons::button_codes(codes);

        println!("  Joy{}: {}", index, device.name().unwrap_or("Unknown"));
        println!("    Path: {}", path.display());
        println!("    ID: {:04x}:{:04x}", id.vendor(), id.product());
        println!("    Buttons: {}", button_codes.len());
        for (button, code) in button_codes.iter().enumerate() {
            println!("      {:>2}  {:?}", button, evdev::Key::new(*code));
        }
        println!();

        index += 1;
    }

    if index == 0 {
        println!("  (none found; check that you can read /dev/input/event*)");
    }

    Ok(())
}

fn cmd_init(path: &Path, force: bool) -> miette::Result<()> {
    if path.exists() && !force {
        return Err(miette::miette!(
            help = "pass --force to overwrite it",
            "{} already exists",
            path.display()
        ));
    }

    let content = padkill_config::generate_config(&Config::default());

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }

    std::fs::write(path, content).into_diagnostic()?;

    Ok(())
}
