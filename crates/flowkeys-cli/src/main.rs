//! flowkeys CLI
//!
//! Configuration checking and offline simulation for flowkeys.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use flowkeys::{Engine, FinalizePolicy, Step};
use flowkeys_config::Config;
use miette::IntoDiagnostic;

#[derive(Parser, Debug)]
#[command(name = "flowkeys")]
#[command(about = "Keyboard shortcut sequence tool")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/flowkeys/config.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// List keyboards the daemon can listen on
    Devices,

    /// Replay steps through the configured bindings and show what fires
    ///
    /// Each step is pressed key by key and released in reverse order,
    /// e.g. `flowkeys simulate Control+x Control+s`.
    Simulate {
        /// Steps to replay, in order
        #[arg(required = true)]
        steps: Vec<String>,
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
        Commands::Simulate { steps } => cmd_simulate(&config_path, &steps),
    }
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = flowkeys_config::parse_config(config_path)?;

    println!("Configuration is valid!");
    println!("  Policy: {:?}", config.settings().policy);
    println!("  Aliases: {}", config.aliases.len());
    for alias in &config.aliases {
        println!("    - {} <- {}", alias.canonical, alias.alternates.join(", "));
    }
    println!("  Bindings: {}", config.bindings.len());
    if config.devices.is_empty() {
        println!("  Devices: all keyboards");
    } else {
        println!("  Devices: {}", config.devices.join(", "));
    }

    Ok(())
}

fn cmd_devices() -> miette::Result<()> {
    println!("Available keyboards:\n");

    for entry in std::fs::read_dir("/dev/input").into_diagnostic()? {
        let entry = entry.into_diagnostic()?;
        let path = entry.path();

        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        let Ok(device) = evdev::Device::open(&path) else {
            // Skip devices we can't open
            continue;
        };

        let is_keyboard = device.supported_events().contains(evdev::EventType::KEY)
            && device
                .supported_keys()
                .map(|keys| keys.contains(evdev::Key::KEY_A))
                .unwrap_or(false);
        if !is_keyboard {
            continue;
        }

        let id = device.input_id();
        println!("  {}", device.name().unwrap_or("Unknown"));
        println!("    Path: {}", path.display());
        println!("    ID: {:04x}:{:04x}", id.vendor(), id.product());
        println!();
    }

    Ok(())
}

fn cmd_simulate(config_path: &Path, steps: &[String]) -> miette::Result<()> {
    let config = flowkeys_config::parse_config(config_path)?;

    let steps = steps
        .iter()
        .map(|s| s.parse::<Step>())
        .collect::<Result<Vec<_>, _>>()
        .into_diagnostic()?;

    for (step, fired) in simulate(&config, &steps) {
        if fired.is_empty() {
            println!("{}", step);
        } else {
            println!("{} -> {}", step, fired.join(", "));
        }
    }

    Ok(())
}

/// Replay `steps` through an engine built from `config`.
///
/// Returns, per step, the bindings that fired while it was replayed.
fn simulate(config: &Config, steps: &[Step]) -> Vec<(Step, Vec<String>)> {
    let policy = config.settings().policy;
    let mut engine = Engine::new(policy);
    let fired = Arc::new(Mutex::new(Vec::new()));

    for alias in &config.aliases {
        engine.add_alias(&alias.canonical, &alias.alternates);
    }
    for binding in &config.bindings {
        let name = binding.describe();
        let fired = Arc::clone(&fired);
        engine.register(&binding.sequence, move || {
            if let Ok(mut fired) = fired.lock() {
                fired.push(name.clone());
            }
        });
    }

    // Far enough apart that every debounce task is due before the next step
    let gap = match policy {
        FinalizePolicy::Debounce { delay } => delay + Duration::from_millis(1),
        FinalizePolicy::ReleaseEdge => Duration::from_millis(1),
    };

    let mut now = Instant::now();
    let mut results = Vec::new();

    for step in steps {
        for key in step.keys() {
            engine.press(key, now);
        }
        for key in step.keys().iter().rev() {
            engine.release(key, now);
        }
        now += gap;
        engine.poll(now);

        let names = fired
            .lock()
            .map(|mut fired| std::mem::take(&mut *fired))
            .unwrap_or_default();
        results.push((step.clone(), names));
    }

    results
}
