//! MIDI note core for midisense.
//!
//! Listens on one MIDI input port and accumulates held notes until a caller
//! drains them. Reads render the drained state as delimited strings.
//!
//! Feature gates: `midi-io` (hardware input via midir).

pub mod error;
pub use error::{ConfigError, Error, Result};

pub mod event;
pub use event::{NoteEvent, NoteKind};

pub mod accumulator;
pub use accumulator::{Accumulator, HeldNote, Readings, Snapshot, TrackingMode};

pub mod io;
pub use io::{
    DriverMessage, InputConnection, InputPort, MessageCallback, MidiDriver, MidiInputDevice,
    VirtualDriver, VirtualPort,
};

#[cfg(feature = "midi-io")]
pub use io::MidirDriver;

mod listener;
pub use listener::{ListenerState, ListenerStatus};

mod reader;
pub use reader::{validate_settings, Reader, ReaderBuilder, DEFAULT_DELIMITER};
