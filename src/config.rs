//! Resource configuration.
//!
//! A host hands every resource a [`ResourceConfig`]; its free-form
//! `attributes` object is parsed into the model's own config type.

use crate::error::Result;
use midisense_midi::{validate_settings, ReaderBuilder, TrackingMode, DEFAULT_DELIMITER};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One configured resource as it appears in a host config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    /// `namespace:family:name`
    pub model: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ResourceConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

/// Attributes of the MIDI input reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MidiInputConfig {
    #[serde(default)]
    pub in_port_name: String,
    #[serde(default)]
    pub tracking: TrackingMode,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

impl Default for MidiInputConfig {
    fn default() -> Self {
        Self {
            in_port_name: String::new(),
            tracking: TrackingMode::default(),
            delimiter: default_delimiter(),
        }
    }
}

impl MidiInputConfig {
    pub fn from_attributes(
        attributes: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            attributes.clone(),
        ))?)
    }

    /// Returns the implicit dependencies of this resource (there are none).
    pub fn validate(&self, path: &str) -> Result<Vec<String>> {
        validate_settings(&self.in_port_name, &self.delimiter).map_err(|e| {
            debug!("{}: {}", path, e);
            e
        })?;
        Ok(Vec::new())
    }

    /// Carry these settings onto a reader builder.
    pub fn apply(&self, builder: ReaderBuilder) -> ReaderBuilder {
        builder
            .port_name(self.in_port_name.clone())
            .tracking(self.tracking)
            .delimiter(self.delimiter.clone())
    }
}
