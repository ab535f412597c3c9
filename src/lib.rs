//! # midisense - MIDI input as a polled sensor
//!
//! Listens on a MIDI input port in the background and reports the notes held
//! since the previous read.
//!
//! ## Architecture
//!
//! midisense is an umbrella crate that coordinates:
//! - **midisense-midi** - Note accumulation, driver capability, listener lifecycle, reader
//! - **config** - Resource configs and MIDI input attributes
//! - **sensor** - The `jalen:midi-controller:midi-input-reader` sensor model
//! - **registry** - Explicit model registry used by hosts and the CLI
//!
//! ## Quick Start
//!
//! ```ignore
//! use midisense::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = Registry::new(Arc::new(MidirDriver::new()));
//! let sensor = registry.build(&ResourceConfig::from_file("keys.json")?)?;
//!
//! let readings = sensor.readings(&Default::default())?;
//! println!("{}", serde_json::Value::Object(readings));
//!
//! sensor.close();
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Hardware MIDI input
//! - `midi-io` - Hardware MIDI input via midir

/// Re-export of midisense-midi for direct access
pub use midisense_midi as midi;

pub use midisense_midi::{
    Accumulator, ConfigError, ListenerState, MidiDriver, MidiInputDevice, NoteEvent, NoteKind,
    Reader, ReaderBuilder, Readings, Snapshot, TrackingMode, VirtualDriver, VirtualPort,
};

#[cfg(feature = "midi-io")]
pub use midisense_midi::MidirDriver;

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{MidiInputConfig, ResourceConfig};

pub mod resource;
pub use resource::{Model, Sensor, SENSOR_API};

pub mod sensor;
pub use sensor::{midi_input_reader_model, MidiInputReader};

pub mod registry;
pub use registry::{Registry, SensorConstructor};

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Error, MidiDriver, MidiInputConfig, Model, Reader, Readings, Registry, ResourceConfig,
        Result, Sensor, TrackingMode, VirtualDriver,
    };

    #[cfg(feature = "midi-io")]
    pub use crate::MidirDriver;
}
