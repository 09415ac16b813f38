//! Configuration for the Coachlink server.
//!
//! Provides the [`CoachlinkConfig`] struct that loads from TOML files,
//! environment variables, and defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `COACHLINK_CONFIG` environment variable
//! 3. XDG default: `~/.config/coachlink/config.toml`
//! 4. Built-in defaults

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use coachlink_core::{ConfigProvider, Error, Result, RouteTable};
use coachlink_gate::{DEFAULT_LOOKUP_TIMEOUT, DEFAULT_SESSION_COOKIE};
use confyg::{Confygery, env};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Prefix of environment overrides, e.g. `COACHLINK_SERVER_PORT`.
const ENV_PREFIX: &str = "COACHLINK";

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration for the Coachlink server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachlinkConfig {
    /// Project name, used for env var prefixes and default paths.
    pub project_name: String,

    /// Listener configuration.
    pub server: ServerConfig,

    /// Path classes and redirect targets.
    pub routes: RouteTable,

    /// Gate tuning.
    pub gate: GateConfig,

    /// Authentication provider and profile store.
    pub backend: BackendConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(deserialize_with = "number_or_string")]
    pub port: u16,

    /// Host address to bind to.
    pub host: String,
}

/// Gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Upper bound on session resolution and role lookup, in milliseconds.
    #[serde(deserialize_with = "number_or_string")]
    pub lookup_timeout_ms: u64,

    /// Cookie carrying the access token.
    pub session_cookie: String,
}

/// Which backend implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process maps. State is lost on restart.
    #[default]
    Memory,
    /// Hosted auth service and table API.
    Rest,
}

/// Backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend implementation.
    pub kind: BackendKind,

    /// Project base URL (required for `rest`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Project API key (required for `rest`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Server-side key for table reads and writes.
    ///
    /// Role lookups and player data queries run outside any user session, so
    /// with row-level security on they need a key that bypasses it. Without
    /// one, `api_key` is sent and policies that key on the caller will hide
    /// every row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_key: Option<String>,

    /// Per-request timeout for backend calls, in milliseconds.
    #[serde(deserialize_with = "number_or_string")]
    pub timeout_ms: u64,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for CoachlinkConfig {
    fn default() -> Self {
        Self {
            project_name: "coachlink".to_string(),
            server: ServerConfig::default(),
            routes: RouteTable::default(),
            gate: GateConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT.as_millis() as u64,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Memory,
            url: None,
            api_key: None,
            service_key: None,
            timeout_ms: 10_000,
        }
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl CoachlinkConfig {
    /// Load configuration from file, environment, and defaults.
    ///
    /// The route table is validated before the config is returned.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_from(config_path, ENV_PREFIX)
    }

    fn load_from(config_path: Option<&str>, env_prefix: &str) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path)
            && path.exists()
        {
            builder
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("config file: {e}")))?;
        }

        let mut env_opts = env::Options::with_top_level(env_prefix);
        env_opts.add_section("server");
        env_opts.add_section("routes");
        env_opts.add_section("gate");
        env_opts.add_section("backend");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        config.routes.validate()?;
        Ok(config)
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("COACHLINK_CONFIG") {
            return Some(PathBuf::from(path));
        }

        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("coachlink").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Flatten this config into environment variable pairs with `COACHLINK_` prefix.
    pub fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let value: toml::Value =
            toml::Value::try_from(self).map_err(|e| Error::config(e.to_string()))?;
        let mut vars = Vec::new();
        flatten_toml_value(&value, ENV_PREFIX, &mut vars);
        Ok(vars)
    }

    /// Address the server binds to.
    pub fn bind_address(&self, port_override: Option<u16>) -> String {
        format!(
            "{}:{}",
            self.server.host,
            port_override.unwrap_or(self.server.port)
        )
    }

    /// Backend request timeout.
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend.timeout_ms)
    }
}

// ============================================================================
// ConfigProvider implementation
// ============================================================================

impl ConfigProvider for CoachlinkConfig {
    fn project_name(&self) -> &str {
        &self.project_name
    }

    fn routes(&self) -> &RouteTable {
        &self.routes
    }

    fn session_cookie(&self) -> &str {
        &self.gate.session_cookie
    }

    fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.gate.lookup_timeout_ms)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Accept a number either as a TOML integer or as a string.
///
/// Values overlaid from the environment always arrive as strings.
fn number_or_string<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + TryFrom<i64>,
    <T as FromStr>::Err: fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => T::try_from(n).map_err(|_| D::Error::custom(format!("{n} is out of range"))),
        Raw::Str(s) => s.trim().parse().map_err(D::Error::custom),
    }
}

/// Recursively flatten a TOML value into `KEY=value` pairs.
fn flatten_toml_value(value: &toml::Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let env_key = format!("{}_{}", prefix, key.to_uppercase());
                flatten_toml_value(val, &env_key, out);
            }
        }
        toml::Value::Array(arr) => {
            if let Ok(json) = serde_json::to_string(arr) {
                out.push((prefix.to_string(), json));
            }
        }
        toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        toml::Value::Integer(i) => out.push((prefix.to_string(), i.to_string())),
        toml::Value::Float(f) => out.push((prefix.to_string(), f.to_string())),
        toml::Value::Boolean(b) => out.push((prefix.to_string(), b.to_string())),
        toml::Value::Datetime(dt) => out.push((prefix.to_string(), dt.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================
