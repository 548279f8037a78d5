//! Configuration system for Rondo.
//!
//! Precedence: environment variables over the config file over built-in
//! defaults.
//!
//! The file is looked up at:
//!   1. $RONDO_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/rondo/config.toml
//!   3. ~/.config/rondo/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RondoConfig {
    pub coordinator: CoordinatorSettings,
    pub engine: EngineSettings,
    pub api: ApiSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorSettings {
    /// How often a waiting coordinator re-checks the store, in ms.
    pub poll_interval_ms: u64,
    /// TTL applied to tasks created without an explicit one, in ms.
    pub default_ttl_ms: u64,
    /// Upper bound on one send-and-receive rendezvous, in ms.
    pub round_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Number of virtual nodes to register.
    pub num_nodes: u32,
    /// Concurrent execution slots. 0 = available parallelism.
    pub pool_size: u32,
    /// Max tasks buffered per node before pulls pause. 0 = unbounded.
    pub max_backlog: u32,
    /// How often the dispatch loop polls for new tasks, in ms.
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// HTTP port for the participant gateway. 0 = OS-assigned.
    pub port: u16,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for RondoConfig {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorSettings::default(),
            engine: EngineSettings::default(),
            api: ApiSettings::default(),
        }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 25,
            default_ttl_ms: 30_000,
            round_timeout_ms: 60_000,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            num_nodes: 16,
            pool_size: 0,
            max_backlog: 256,
            poll_interval_ms: 20,
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self { port: 9460 }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("rondo")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RondoConfig {
    /// Load the configuration, applying env overrides on top of the file
    /// (or on top of defaults when no file exists).
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            RondoConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Where the config file lives.
    pub fn file_path() -> PathBuf {
        std::env::var("RONDO_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Seed a default config file unless one already exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&RondoConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply RONDO_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RONDO_COORDINATOR__DEFAULT_TTL_MS") {
            if let Ok(n) = v.parse() {
                self.coordinator.default_ttl_ms = n;
            }
        }
        if let Ok(v) = std::env::var("RONDO_COORDINATOR__ROUND_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.coordinator.round_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("RONDO_ENGINE__NUM_NODES") {
            if let Ok(n) = v.parse() {
                self.engine.num_nodes = n;
            }
        }
        if let Ok(v) = std::env::var("RONDO_ENGINE__POOL_SIZE") {
            if let Ok(n) = v.parse() {
                self.engine.pool_size = n;
            }
        }
        if let Ok(v) = std::env::var("RONDO_ENGINE__MAX_BACKLOG") {
            if let Ok(n) = v.parse() {
                self.engine.max_backlog = n;
            }
        }
        if let Ok(v) = std::env::var("RONDO_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
    }
}
