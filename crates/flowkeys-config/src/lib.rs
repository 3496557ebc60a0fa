//! Configuration parsing for flowkeys
//!
//! This crate parses the KDL configuration file: engine settings, key aliases,
//! device filters and shortcut bindings.

mod error;
mod model;
mod parser;

pub use error::{ConfigError, InvalidStepInfo, SourceLocation};
pub use model::*;
pub use parser::{parse_config, parse_config_str};
