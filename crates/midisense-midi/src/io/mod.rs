//! Driver capability for MIDI input.
//!
//! A driver enumerates named input ports, opens one, and delivers decoded
//! note events through a callback until the connection is closed. Readers
//! receive the driver explicitly, so tests can swap in [`VirtualDriver`].

#[cfg(feature = "midi-io")]
mod midir_driver;
mod virtual_driver;

#[cfg(feature = "midi-io")]
pub use midir_driver::MidirDriver;
pub use virtual_driver::{VirtualDriver, VirtualPort};

use crate::error::{Error, Result};
use crate::event::NoteEvent;

/// Information about an available MIDI input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiInputDevice {
    /// Port index at enumeration time
    pub index: usize,
    pub name: String,
}

/// Message delivered from a driver to a listener callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverMessage {
    Event(NoteEvent),
    /// The device went away; no further events will arrive.
    Lost(String),
}

/// Invoked from the driver's delivery thread, one message at a time.
pub type MessageCallback = Box<dyn FnMut(DriverMessage) + Send + 'static>;

pub trait MidiDriver: Send + Sync {
    fn input_ports(&self) -> Result<Vec<MidiInputDevice>>;

    /// Exact name match first, then the first case-insensitive partial match.
    fn find_input_port(&self, name: &str) -> Result<MidiInputDevice> {
        let ports = self.input_ports()?;
        find_port(&ports, name)
            .cloned()
            .ok_or_else(|| Error::DeviceOpen(format!("No MIDI input port matching '{}'", name)))
    }

    fn open_input(&self, device: &MidiInputDevice) -> Result<Box<dyn InputPort>>;
}

/// An opened port with no callback attached yet. Dropping it closes the port.
pub trait InputPort {
    fn name(&self) -> &str;

    /// Attach the callback. On failure the port is closed before returning.
    fn listen(self: Box<Self>, callback: MessageCallback) -> Result<Box<dyn InputConnection>>;
}

/// A port with a registered callback.
pub trait InputConnection {
    /// Deregister the callback and close the port.
    fn close(self: Box<Self>);
}

pub(crate) fn find_port<'a>(
    ports: &'a [MidiInputDevice],
    name: &str,
) -> Option<&'a MidiInputDevice> {
    let needle = name.to_lowercase();
    ports.iter().find(|p| p.name == name).or_else(|| {
        ports
            .iter()
            .find(|p| p.name.to_lowercase().contains(&needle))
    })
}
