//! In-process MIDI input ports.
//!
//! Virtual ports behave like hardware ports from a reader's point of view:
//! they are enumerated by name, opened, and deliver events through the
//! registered callback. The owning side keeps a [`VirtualPort`] handle to
//! inject events, simulate unplugging, or make open/listen fail.

use super::{
    find_port, DriverMessage, InputConnection, InputPort, MessageCallback, MidiDriver,
    MidiInputDevice,
};
use crate::error::{Error, Result};
use crate::event::NoteEvent;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

struct PortShared {
    index: usize,
    name: String,
    created: Instant,
    callback: Mutex<Option<MessageCallback>>,
    present: AtomicBool,
    fail_open: AtomicBool,
    fail_listen: AtomicBool,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

impl PortShared {
    fn deliver(&self, message: DriverMessage) -> bool {
        let mut callback = self.callback.lock();
        match callback.as_mut() {
            Some(callback) => {
                callback(message);
                true
            }
            None => false,
        }
    }

    fn release(&self) {
        self.callback.lock().take();
        self.closes.fetch_add(1, Ordering::AcqRel);
        debug!("Closed virtual MIDI input port {}: {}", self.index, self.name);
    }
}

/// Handle to one virtual input port.
#[derive(Clone)]
pub struct VirtualPort {
    shared: Arc<PortShared>,
}

impl VirtualPort {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns false when no listener is attached.
    pub fn send(&self, event: NoteEvent) -> bool {
        self.shared.deliver(DriverMessage::Event(event))
    }

    /// Decode raw bytes like a hardware driver would. Non-note and malformed
    /// messages are dropped and return false.
    pub fn send_bytes(&self, bytes: &[u8]) -> bool {
        let timestamp_us = self.shared.created.elapsed().as_micros() as u64;
        match NoteEvent::from_bytes(bytes, timestamp_us) {
            Ok(Some(event)) => self.send(event),
            Ok(None) => false,
            Err(e) => {
                debug!("Failed to parse MIDI message {:02X?}: {:?}", bytes, e);
                false
            }
        }
    }

    /// Simulate the device disappearing. The port stops being enumerated and
    /// an attached listener is told the device was lost.
    pub fn unplug(&self, reason: impl Into<String>) -> bool {
        let delivered = self.shared.deliver(DriverMessage::Lost(reason.into()));
        self.shared.present.store(false, Ordering::Release);
        delivered
    }

    /// Stop enumerating the port without telling the listener, like a
    /// backend that never reports unplugging.
    pub fn remove(&self) {
        self.shared.present.store(false, Ordering::Release);
    }

    pub fn replug(&self) {
        self.shared.present.store(true, Ordering::Release);
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.shared.fail_open.store(fail, Ordering::Release);
    }

    pub fn set_fail_listen(&self, fail: bool) {
        self.shared.fail_listen.store(fail, Ordering::Release);
    }

    pub fn is_listening(&self) -> bool {
        self.shared.callback.lock().is_some()
    }

    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::Acquire)
    }

    pub fn close_count(&self) -> usize {
        self.shared.closes.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for VirtualPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualPort")
            .field("index", &self.shared.index)
            .field("name", &self.shared.name)
            .field("listening", &self.is_listening())
            .finish()
    }
}

/// Driver over in-process ports. Clone is cheap and shares the port list.
#[derive(Clone, Default)]
pub struct VirtualDriver {
    ports: Arc<RwLock<Vec<Arc<PortShared>>>>,
}

impl VirtualDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_port(&self, name: impl Into<String>) -> VirtualPort {
        let name = name.into();
        let mut ports = self.ports.write();
        let index = ports.len();
        let shared = Arc::new(PortShared {
            index,
            name: name.clone(),
            created: Instant::now(),
            callback: Mutex::new(None),
            present: AtomicBool::new(true),
            fail_open: AtomicBool::new(false),
            fail_listen: AtomicBool::new(false),
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        });
        ports.push(Arc::clone(&shared));

        debug!("Created virtual MIDI input port {}: {}", index, name);
        VirtualPort { shared }
    }

    pub fn port(&self, name: &str) -> Option<VirtualPort> {
        self.ports
            .read()
            .iter()
            .find(|p| p.name == name)
            .map(|shared| VirtualPort {
                shared: Arc::clone(shared),
            })
    }
}

impl MidiDriver for VirtualDriver {
    fn input_ports(&self) -> Result<Vec<MidiInputDevice>> {
        let ports = self.ports.read();
        Ok(ports
            .iter()
            .filter(|p| p.present.load(Ordering::Acquire))
            .map(|p| MidiInputDevice {
                index: p.index,
                name: p.name.clone(),
            })
            .collect())
    }

    fn open_input(&self, device: &MidiInputDevice) -> Result<Box<dyn InputPort>> {
        let devices = self.input_ports()?;
        let found = find_port(&devices, &device.name)
            .ok_or_else(|| Error::DeviceOpen(format!("MIDI input port '{}' is gone", device.name)))?;

        let shared = self
            .ports
            .read()
            .get(found.index)
            .cloned()
            .ok_or_else(|| Error::DeviceOpen(format!("MIDI input port '{}' is gone", device.name)))?;

        if shared.fail_open.load(Ordering::Acquire) {
            return Err(Error::DeviceOpen(format!(
                "MIDI input port '{}' refused to open",
                shared.name
            )));
        }

        shared.opens.fetch_add(1, Ordering::AcqRel);
        debug!("Opened virtual MIDI input port {}: {}", shared.index, shared.name);
        Ok(Box::new(VirtualInputPort {
            shared: Some(shared),
        }))
    }
}

impl std::fmt::Debug for VirtualDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualDriver")
            .field("num_ports", &self.ports.read().len())
            .finish()
    }
}

struct VirtualInputPort {
    shared: Option<Arc<PortShared>>,
}

impl InputPort for VirtualInputPort {
    fn name(&self) -> &str {
        self.shared.as_ref().map_or("", |s| s.name.as_str())
    }

    fn listen(mut self: Box<Self>, callback: MessageCallback) -> Result<Box<dyn InputConnection>> {
        // Drop of `self` closes the port while `shared` is still set
        let fail = self
            .shared
            .as_ref()
            .is_some_and(|s| s.fail_listen.load(Ordering::Acquire));
        if fail {
            return Err(Error::ListenerStart(format!(
                "Failed to register callback on '{}'",
                self.name()
            )));
        }

        let shared = self
            .shared
            .take()
            .ok_or_else(|| Error::ListenerStart("port already closed".to_string()))?;
        *shared.callback.lock() = Some(callback);
        debug!("Listening on virtual MIDI input port: {}", shared.name);

        Ok(Box::new(VirtualConnection {
            shared: Some(shared),
        }))
    }
}

impl Drop for VirtualInputPort {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release();
        }
    }
}

struct VirtualConnection {
    shared: Option<Arc<PortShared>>,
}

impl InputConnection for VirtualConnection {
    fn close(mut self: Box<Self>) {
        if let Some(shared) = self.shared.take() {
            shared.release();
        }
    }
}

impl Drop for VirtualConnection {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release();
        }
    }
}
