//! Configuration for the Flow runner
//!
//! Defaults can be overridden from environment variables or a YAML document.

use serde::{Deserialize, Serialize};
use std::env;

use crate::FlowError;

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Name recorded on every run span
    #[serde(default = "default_name")]
    pub name: String,

    /// Log level used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Value the persistent store returns to report a missing key
    #[serde(default = "default_absent_sentinel")]
    pub absent_sentinel: String,
}

fn default_name() -> String {
    "flow".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_absent_sentinel() -> String {
    "__failed".to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            absent_sentinel: default_absent_sentinel(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from defaults and environment variables
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Ok(name) = env::var("FLOW_RUNNER_NAME") {
            config.name = name;
        }

        if let Ok(level) = env::var("FLOW_LOG_LEVEL") {
            config.log_level = level;
        }

        if let Ok(sentinel) = env::var("FLOW_ABSENT_SENTINEL") {
            config.absent_sentinel = sentinel;
        }

        config
    }

    /// Parse configuration from YAML; missing fields take their defaults
    pub fn from_yaml_str(source: &str) -> Result<Self, FlowError> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(source)?)
    }

    /// Override the runner name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
