//! Centralized error type for the midisense umbrella crate.
//!
//! Wraps the MIDI core errors so `?` propagates naturally from readers up to
//! sensors, the registry and the CLI.

use midisense_midi::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI: {0}")]
    Midi(#[from] midisense_midi::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
