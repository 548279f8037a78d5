//! Run model — one multi-round computation and its shared configuration.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Opaque run identifier. Random non-zero 64-bit value.
pub type RunId = u64;

/// A configuration value attached to a run. Scalar or raw bytes only;
/// nested structure belongs in task payload records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Str(v)
    }
}

impl From<Vec<u8>> for ConfigValue {
    fn from(v: Vec<u8>) -> Self {
        ConfigValue::Bytes(v)
    }
}

/// Named run-level settings, visible to every task of the run.
pub type RunConfig = BTreeMap<String, ConfigValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Active,
    Finished,
}

/// One computation: a scope for task and node traffic plus its config.
#[derive(Debug, Clone)]
pub struct Run {
    pub run_id: RunId,
    pub config: RunConfig,
    pub status: RunStatus,
    /// Unix ms of creation.
    pub created_at: u64,
}

impl Run {
    /// New active run with a fresh random id.
    pub fn new(config: RunConfig, created_at: u64) -> Self {
        let mut rng = rand::thread_rng();
        let run_id = loop {
            let id: u64 = rng.gen();
            if id != 0 {
                break id;
            }
        };
        Self {
            run_id,
            config,
            status: RunStatus::Active,
            created_at,
        }
    }

    pub fn finish(&mut self) {
        self.status = RunStatus::Finished;
    }
}
