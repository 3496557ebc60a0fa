//! Configuration data model

use std::time::Duration;

use flowkeys::{FinalizePolicy, Settings, Step, DEFAULT_DEBOUNCE};

/// Root configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub aliases: Vec<AliasConfig>,
    /// Names of input devices to listen on. Empty means every keyboard.
    pub devices: Vec<String>,
    pub bindings: Vec<Binding>,
}

impl Config {
    /// Engine settings derived from the `global` block.
    pub fn settings(&self) -> Settings {
        Settings {
            policy: self.global.finalize_policy(),
        }
    }
}

/// Global settings
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
    pub policy: PolicyKind,
    /// Only used by the debounce policy
    pub debounce_ms: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            policy: PolicyKind::ReleaseEdge,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
        }
    }
}

impl GlobalConfig {
    pub fn finalize_policy(&self) -> FinalizePolicy {
        match self.policy {
            PolicyKind::ReleaseEdge => FinalizePolicy::ReleaseEdge,
            PolicyKind::Debounce => FinalizePolicy::Debounce {
                delay: Duration::from_millis(self.debounce_ms),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive usable with `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Which combo finalization policy the engine uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolicyKind {
    #[default]
    ReleaseEdge,
    Debounce,
}

impl std::str::FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "release-edge" | "release" => Ok(Self::ReleaseEdge),
            "debounce" => Ok(Self::Debounce),
            _ => Err(format!(
                "Unknown policy: {} (expected \"release-edge\" or \"debounce\")",
                s
            )),
        }
    }
}

/// `alias "control" "ctrl" "strg"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasConfig {
    pub canonical: String,
    pub alternates: Vec<String>,
}

/// A shortcut sequence and what to do when it matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub sequence: Vec<Step>,
    pub actions: Vec<Action>,
}

impl Binding {
    /// Sequence as written, e.g. `"Control+x Control+s"`
    pub fn describe(&self) -> String {
        self.sequence
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// An action run when a binding matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start a program, e.g. `spawn "notify-send" "hello"`
    Spawn { command: String, args: Vec<String> },
    /// Emit an info-level log line
    Log(String),
}
