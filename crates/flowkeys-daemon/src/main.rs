//! flowkeys daemon
//!
//! Listens to keyboards and runs actions bound to shortcut sequences.

mod actions;
mod device;
mod stdin;

use std::path::PathBuf;
use std::pin::Pin;

use anyhow::{bail, Result};
use clap::Parser;
use flowkeys::{FlowKeys, KeyEvent};
use flowkeys_config::Config;
use futures::Stream;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

/// A boxed source of key events, ready to attach.
pub type KeyEventStream = Pin<Box<dyn Stream<Item = KeyEvent> + Send>>;

#[derive(Parser, Debug)]
#[command(name = "flowkeysd")]
#[command(about = "Keyboard shortcut sequence daemon")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/flowkeys/config.kdl")]
    config: String,

    /// Read JSON-lines key events from stdin instead of input devices
    #[arg(long)]
    stdin: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins; otherwise start at info and switch to the configured
    // level once the config is loaded
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let args = Args::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();

    tracing::info!("Loading configuration from {}", config_path.display());

    let config = flowkeys_config::parse_config(&config_path)?;

    if !from_env {
        let level = config.global.log_level.as_filter();
        if let Err(e) = filter_handle.modify(|filter| *filter = EnvFilter::new(level)) {
            tracing::warn!("Could not apply log level {}: {}", level, e);
        }
    }

    tracing::info!(
        "Loaded {} binding(s) and {} alias(es), policy {:?}",
        config.bindings.len(),
        config.aliases.len(),
        config.settings().policy
    );

    let mut keys = setup(&config).await;

    if args.stdin {
        tracing::info!("Reading key events from stdin");
        keys.attach(stdin::json_lines(tokio::io::BufReader::new(tokio::io::stdin())));
    } else {
        let devices = device::open_keyboards(&config.devices)?;
        if devices.is_empty() {
            bail!("No keyboards found (check permissions on /dev/input and the device list)");
        }

        for (info, dev) in devices {
            tracing::info!(
                "Listening on {} [{}] at {}",
                info.name,
                info.vendor_product(),
                info.path.display()
            );
            keys.attach(device::key_events(dev, info.name)?);
        }
    }

    tracing::info!("flowkeys daemon running");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    keys.destroy().await;

    Ok(())
}

/// Build an instance with the configured aliases and bindings registered.
async fn setup(config: &Config) -> FlowKeys {
    let keys = FlowKeys::from_settings(&config.settings());

    // Aliases first: bindings are normalized at registration time
    for alias in &config.aliases {
        keys.add_alias(&alias.canonical, &alias.alternates).await;
    }

    for binding in &config.bindings {
        keys.register(&binding.sequence, actions::callback_for(binding))
            .await;
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_setup_registers_bindings() {
        let config = flowkeys_config::parse_config_str(
            r#"
            alias "control" "strg"
            bind "Strg+k" {
                log "palette"
            }
            bind "g" "g" "g" {
                log "top"
            }
            "#,
        )
        .unwrap();

        let mut keys = setup(&config).await;
        assert_eq!(keys.engine().lock().await.max_sequence_length(), 3);

        let input: &'static [u8] = b"{\"type\":\"press\",\"key\":\"Control\"}\n\
              {\"type\":\"press\",\"key\":\"k\"}\n\
              {\"type\":\"release\",\"key\":\"k\"}\n\
              {\"type\":\"release\",\"key\":\"Control\"}\n";
        keys.attach(stdin::json_lines(input));
        tokio::time::sleep(Duration::from_millis(1)).await;

        let labels: Vec<String> = keys
            .engine()
            .lock()
            .await
            .history()
            .iter()
            .map(|c| c.label())
            .collect();
        assert_eq!(labels, ["control+k"]);

        keys.destroy().await;
    }
}
