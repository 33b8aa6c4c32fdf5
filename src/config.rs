//! Configuration for tools built on the loss registry

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::registry::{registry, CustomObjects};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extra names resolved per call: name → registered loss name
    pub custom_objects: BTreeMap<String, String>,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a JSON or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, target) in &self.custom_objects {
            if name.trim().is_empty() {
                return Err(Error::config("Custom object names must not be empty"));
            }
            if !registry().contains(target) {
                return Err(Error::config(format!(
                    "Custom object '{name}' refers to unknown loss '{target}'"
                )));
            }
        }

        if self.logging.level.trim().is_empty() {
            return Err(Error::config("Logging level must not be empty"));
        }

        Ok(())
    }

    /// Per-call namespace built from `custom_objects`
    pub fn custom_namespace(&self) -> Result<CustomObjects> {
        let mut custom = CustomObjects::new();
        for (name, target) in &self.custom_objects {
            custom.insert(name.clone(), registry().lookup(target)?.clone());
        }
        Ok(custom)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of plain text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
