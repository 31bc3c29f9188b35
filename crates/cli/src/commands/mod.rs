//! CLI subcommands and the shared config loader.

pub mod chat;
pub mod config_cmd;
pub mod explain;
pub mod serve;

use archmentor_config::{AppConfig, ConfigError};
use std::path::Path;

/// Load from an explicit file when given, otherwise from the default
/// location with environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
}
