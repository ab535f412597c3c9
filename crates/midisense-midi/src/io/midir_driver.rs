//! Hardware MIDI input via midir.
//!
//! Each call creates its own `MidiInput` client, so the driver itself holds
//! no platform handles and can be shared freely between readers.

use super::{DriverMessage, InputConnection, InputPort, MessageCallback, MidiDriver, MidiInputDevice};
use crate::error::{Error, Result};
use crate::event::NoteEvent;
use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use tracing::debug;

const DEFAULT_CLIENT_NAME: &str = "midisense";

#[derive(Debug, Clone)]
pub struct MidirDriver {
    client_name: String,
}

impl MidirDriver {
    pub fn new() -> Self {
        Self::with_client_name(DEFAULT_CLIENT_NAME)
    }

    /// `client_name` is what other MIDI software sees for this connection.
    pub fn with_client_name(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    fn client(&self, suffix: &str) -> Result<MidiInput> {
        let mut input = MidiInput::new(&format!("{}-{}", self.client_name, suffix))?;
        // Keep sysex; clock and active sensing only add callback churn
        input.ignore(Ignore::TimeAndActiveSense);
        Ok(input)
    }
}

impl Default for MidirDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiDriver for MidirDriver {
    fn input_ports(&self) -> Result<Vec<MidiInputDevice>> {
        let input = self.client("device-list")?;
        let devices = input
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| MidiInputDevice {
                index,
                name: input
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index)),
            })
            .collect();
        Ok(devices)
    }

    fn open_input(&self, device: &MidiInputDevice) -> Result<Box<dyn InputPort>> {
        let input = self.client("input")?;
        let ports = input.ports();

        // Ports can be renumbered between enumeration and open; trust the name
        let port = ports
            .iter()
            .find(|p| input.port_name(p).is_ok_and(|name| name == device.name))
            .cloned()
            .ok_or_else(|| {
                Error::DeviceOpen(format!("MIDI input port '{}' is gone", device.name))
            })?;

        debug!("Opened MIDI input port {}: {}", device.index, device.name);
        Ok(Box::new(MidirInputPort {
            input,
            port,
            name: device.name.clone(),
            client_name: self.client_name.clone(),
        }))
    }
}

struct MidirInputPort {
    input: MidiInput,
    port: MidiInputPort,
    name: String,
    client_name: String,
}

impl InputPort for MidirInputPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn listen(self: Box<Self>, mut callback: MessageCallback) -> Result<Box<dyn InputConnection>> {
        let MidirInputPort {
            input,
            port,
            name,
            client_name,
        } = *self;

        let connection = input.connect(
            &port,
            &format!("{}-in", client_name),
            move |timestamp_us, message, _| match NoteEvent::from_bytes(message, timestamp_us) {
                Ok(Some(event)) => callback(DriverMessage::Event(event)),
                Ok(None) => {}
                Err(e) => {
                    debug!("Failed to parse MIDI message {:02X?}: {:?}", message, e);
                }
            },
            (),
        )?;

        debug!("Listening on MIDI input port: {}", name);
        Ok(Box::new(MidirConnection { connection, name }))
    }
}

struct MidirConnection {
    connection: MidiInputConnection<()>,
    name: String,
}

impl InputConnection for MidirConnection {
    fn close(self: Box<Self>) {
        let MidirConnection { connection, name } = *self;
        let (input, ()) = connection.close();
        drop(input);
        debug!("Closed MIDI input port: {}", name);
    }
}
