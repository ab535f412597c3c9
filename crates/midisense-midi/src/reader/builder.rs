//! Reader builder for configuring a MIDI input reader.

use std::sync::Arc;

use crate::accumulator::{Accumulator, TrackingMode};
use crate::error::{ConfigError, Result};
use crate::io::MidiDriver;
use crate::listener::{Listener, ListenerStatus};
use parking_lot::Mutex;
use tracing::info;

use super::Reader;

pub const DEFAULT_DELIMITER: &str = " ";

/// Checks reader settings before anything is opened. Shared by the builder
/// and by config front ends so both report the same errors.
pub fn validate_settings(
    port_name: &str,
    delimiter: &str,
) -> std::result::Result<(), ConfigError> {
    if port_name.is_empty() {
        return Err(ConfigError::MissingField("in_port_name"));
    }
    if delimiter.is_empty() {
        return Err(ConfigError::InvalidField {
            field: "delimiter",
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

pub struct ReaderBuilder {
    pub(super) driver: Arc<dyn MidiDriver>,
    pub(super) port_name: String,
    pub(super) tracking: TrackingMode,
    pub(super) delimiter: String,
}

impl ReaderBuilder {
    pub(super) fn new(driver: Arc<dyn MidiDriver>) -> Self {
        Self {
            driver,
            port_name: String::new(),
            tracking: TrackingMode::default(),
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }

    /// Exact name, or a case-insensitive part of it.
    pub fn port_name(mut self, name: impl Into<String>) -> Self {
        self.port_name = name.into();
        self
    }

    /// Default: `TrackingMode::KeyVelocity`
    pub fn tracking(mut self, mode: TrackingMode) -> Self {
        self.tracking = mode;
        self
    }

    /// Default: a single space
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Validates, resolves the port, and starts listening. Nothing keeps
    /// running if any step fails.
    pub fn build(self) -> Result<Reader> {
        validate_settings(&self.port_name, &self.delimiter)?;

        let device = self.driver.find_input_port(&self.port_name)?;
        let accumulator = Arc::new(Accumulator::new());
        let status = Arc::new(ListenerStatus::new());

        let listener = Listener::spawn(
            Arc::clone(&self.driver),
            device.clone(),
            Arc::clone(&accumulator),
            Arc::clone(&status),
        )?;

        info!("MIDI input reader listening on {}", device.name);
        Ok(Reader {
            port_name: device.name,
            tracking: self.tracking,
            delimiter: self.delimiter,
            accumulator,
            status,
            listener: Mutex::new(Some(listener)),
        })
    }
}
