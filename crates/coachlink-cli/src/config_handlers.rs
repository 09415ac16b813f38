//! Handler functions for config CLI commands.
//!
//! Implements `coachlink config {path,get,init,export}` and the TOML
//! dotted-key lookup they rely on.

use std::path::PathBuf;

use coachlink_core::{Error, Result};

use crate::cli::ConfigAction;
use crate::config::CoachlinkConfig;

/// Handle a config subcommand.
///
/// Receives the raw `--config` path (not a loaded config) because `path`
/// and `init` work before a config file exists.
pub fn handle_config_command(config_path: Option<&str>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => cmd_config_path(config_path),
        ConfigAction::Get { key } => {
            let config = CoachlinkConfig::load(config_path)?;
            println!("{}", config_value(&config, &key)?);
            Ok(())
        }
        ConfigAction::Init { file, force } => {
            let path = cmd_config_init(file.as_deref(), force)?;
            println!("Config file created at {}", path.display());
            Ok(())
        }
        ConfigAction::Export { docker_env } => {
            let config = CoachlinkConfig::load(config_path)?;
            for line in export_lines(&config, docker_env)? {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn cmd_config_path(config_path: Option<&str>) -> Result<()> {
    let path = CoachlinkConfig::resolve_config_path(config_path).ok_or_else(|| {
        Error::config("Could not determine config directory for this platform")
    })?;
    println!("{}", path.display());
    if !path.exists() {
        eprintln!("(file does not exist; run `coachlink config init` to create it)");
    }
    Ok(())
}

/// Look up a dotted key and render it for stdout.
fn config_value(config: &CoachlinkConfig, key: &str) -> Result<String> {
    let value = toml::Value::try_from(config).map_err(|e| Error::config(e.to_string()))?;
    get_nested_value(&value, key)
        .map(format_toml_value)
        .ok_or_else(|| Error::not_found(format!("configuration key '{key}'")))
}

/// Write the default configuration and return where it went.
fn cmd_config_init(file: Option<&str>, force: bool) -> Result<PathBuf> {
    let path = match file {
        Some(p) => PathBuf::from(p),
        None => CoachlinkConfig::default_config_path()
            .ok_or_else(|| Error::config("Could not determine config directory"))?,
    };

    if path.exists() && !force {
        return Err(Error::config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
    }

    let toml_str = CoachlinkConfig::default().to_toml_string()?;
    std::fs::write(&path, toml_str).map_err(|e| Error::io_with_path(e, &path))?;
    Ok(path)
}

fn export_lines(config: &CoachlinkConfig, docker_env: bool) -> Result<Vec<String>> {
    Ok(config
        .to_env_vars()?
        .into_iter()
        .map(|(key, value)| {
            if docker_env {
                format!("--env {key}={value}")
            } else {
                format!("{key}={value}")
            }
        })
        .collect())
}

// ============================================================================
// TOML dotted-key helpers
// ============================================================================

fn get_nested_value<'a>(value: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.')
        .try_fold(value, |current, part| current.as_table()?.get(part))
}

fn format_toml_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(_) | toml::Value::Table(_) => {
            toml::to_string_pretty(value).unwrap_or_else(|_| format!("{value:?}"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_value_simple_and_nested() {
        let config = CoachlinkConfig::default();
        assert_eq!(config_value(&config, "project_name").unwrap(), "coachlink");
        assert_eq!(config_value(&config, "server.port").unwrap(), "3000");
        assert_eq!(config_value(&config, "routes.coach_home").unwrap(), "/coach/dashboard");
        assert_eq!(config_value(&config, "backend.kind").unwrap(), "memory");
    }

    #[test]
    fn test_config_value_array() {
        let config = CoachlinkConfig::default();
        let rendered = config_value(&config, "routes.public").unwrap();
        assert!(rendered.contains("/signup"));
    }

    #[test]
    fn test_config_value_missing_key() {
        let config = CoachlinkConfig::default();
        let err = config_value(&config, "nonexistent.key").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.to_string().contains("nonexistent.key"));
    }

    #[test]
    fn test_cmd_config_path_explicit() {
        assert!(cmd_config_path(Some("/explicit/config.toml")).is_ok());
    }

    #[test]
    fn test_cmd_config_init_creates_loadable_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let written = cmd_config_init(Some(path.to_str().unwrap()), false).unwrap();
        assert_eq!(written, path);

        let loaded = CoachlinkConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.project_name, "coachlink");
    }

    #[test]
    fn test_cmd_config_init_refuses_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "project_name = \"mine\"").unwrap();

        assert!(cmd_config_init(Some(path.to_str().unwrap()), false).is_err());
        assert!(cmd_config_init(Some(path.to_str().unwrap()), true).is_ok());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("coachlink"));
    }

    #[test]
    fn test_export_lines() {
        let config = CoachlinkConfig::default();
        let plain = export_lines(&config, false).unwrap();
        assert!(plain.contains(&"COACHLINK_SERVER_PORT=3000".to_string()));

        let docker = export_lines(&config, true).unwrap();
        assert!(docker.iter().all(|line| line.starts_with("--env COACHLINK_")));
    }

    #[test]
    fn test_handle_config_command_get() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, CoachlinkConfig::default().to_toml_string().unwrap()).unwrap();

        let result = handle_config_command(
            Some(path.to_str().unwrap()),
            ConfigAction::Get {
                key: "gate.session_cookie".into(),
            },
        );
        assert!(result.is_ok());
    }
}
