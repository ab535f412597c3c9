//! Error types for the MIDI note core.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("MIDI device open error: {0}")]
    DeviceOpen(String),

    #[error("MIDI listener start error: {0}")]
    ListenerStart(String),

    #[error("MIDI driver error: {0}")]
    Driver(String),
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Driver(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::PortInfoError> for Error {
    fn from(e: midir::PortInfoError) -> Self {
        Error::DeviceOpen(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::ListenerStart(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
