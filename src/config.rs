//! Serializable machine configuration.

use crate::builder::ConfigurationError;
use crate::core::Patch;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declarative part of a machine: everything except actions and sub-machines.
///
/// ```
/// use arbor::config::MachineConfig;
///
/// let config = MachineConfig::from_json_str(
///     r#"{ "label": "loader", "logging": true, "initial_state": { "loadState": "new" } }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.label.as_deref(), Some("loader"));
/// assert!(config.logging);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Name used for the machine in trace output.
    pub label: Option<String>,
    /// Start with trace logging enabled.
    pub logging: bool,
    pub initial_state: Map<String, Value>,
}

impl MachineConfig {
    pub fn from_json_str(input: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(input).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigurationError> {
        serde_json::from_value(value).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    pub fn initial_patch(&self) -> Patch {
        self.initial_state.clone().into_iter().collect()
    }
}
