//! `archmentor config` — Configuration management commands.

use archmentor_config::AppConfig;
use std::path::{Path, PathBuf};

use super::load_config;

pub fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", render(&config)?);
    Ok(())
}

pub fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}", resolve_path(config_path).display());

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   ✅ Config parsed and validated");

    let mut notes = Vec::new();
    if config.knowledge.corpus_path.is_none() && !config.knowledge.seed_defaults {
        notes.push("Knowledge base is empty: no corpus_path and seed_defaults = false");
    }
    if config.gateway.host == "0.0.0.0" {
        notes.push("Gateway binds to every interface");
    }
    if config.synthesis.reflection_interval == 0 {
        notes.push("Periodic reflection checkpoints are disabled");
    }
    for note in &notes {
        println!("   ⚠️  {note}");
    }

    println!();
    println!("   Window:     {} turns", config.tracker.window_capacity);
    println!("   Timeout:    {}s per capability", config.runtime.capability_timeout_secs);
    println!("   Sessions:   {} max", config.runtime.max_sessions);
    println!("   Gateway:    {}:{}", config.gateway.host, config.gateway.port);
    Ok(())
}

pub fn path(config_path: Option<&Path>) {
    println!("{}", resolve_path(config_path).display());
}

pub fn default() {
    println!("{}", AppConfig::default_toml());
}

fn resolve_path(config_path: Option<&Path>) -> PathBuf {
    match config_path {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    }
}

fn render(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_config_parses_back() {
        let config = AppConfig::default();
        let text = render(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.tracker.window_capacity, config.tracker.window_capacity);
        parsed.validate().unwrap();
    }

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/tmp/archmentor-test.toml");
        assert_eq!(resolve_path(Some(path)), path.to_path_buf());
        assert!(resolve_path(None).ends_with("config.toml"));
    }

    #[test]
    fn invalid_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tracker]\nwindow_capacity = 0\n").unwrap();
        assert!(validate(Some(&path)).is_err());
    }
}
