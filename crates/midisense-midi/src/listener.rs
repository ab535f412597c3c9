//! Background listener owning one open input port.
//!
//! The port is opened and the callback registered on a dedicated thread,
//! which reports the outcome back before the constructor returns. After that
//! the thread waits on its control channel and re-checks that the port is
//! still enumerated between commands; the driver feeds the accumulator
//! directly from its own delivery thread.

use crate::accumulator::Accumulator;
use crate::error::{Error, Result};
use crate::io::{DriverMessage, MidiDriver, MidiInputDevice};
use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ListenerState {
    Created = 0,
    Listening = 1,
    Stopped = 2,
    FailedToStart = 3,
    /// The device was lost while listening.
    Faulted = 4,
}

impl ListenerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ListenerState::Created,
            1 => ListenerState::Listening,
            2 => ListenerState::Stopped,
            3 => ListenerState::FailedToStart,
            _ => ListenerState::Faulted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerState::Created => "created",
            ListenerState::Listening => "listening",
            ListenerState::Stopped => "stopped",
            ListenerState::FailedToStart => "failed_to_start",
            ListenerState::Faulted => "faulted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ListenerState::Stopped | ListenerState::FailedToStart | ListenerState::Faulted
        )
    }
}

impl std::fmt::Display for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener health shared between the listener thread and readers.
#[derive(Debug)]
pub struct ListenerStatus {
    state: AtomicU8,
    fault: ArcSwap<Option<String>>,
}

impl ListenerStatus {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ListenerState::Created as u8),
            fault: ArcSwap::from_pointee(None),
        }
    }

    pub fn state(&self) -> ListenerState {
        ListenerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn fault(&self) -> Option<String> {
        self.fault.load().as_ref().clone()
    }

    fn set(&self, state: ListenerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn fail(&self, state: ListenerState, reason: String) {
        self.fault.store(Arc::new(Some(reason)));
        self.set(state);
    }
}

impl Default for ListenerStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// How often the listener checks that its port is still present.
const PRESENCE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Commands sent to the listener thread
enum ListenerCommand {
    Shutdown,
    DeviceLost(String),
}

pub(crate) struct Listener {
    command_sender: Sender<ListenerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl Listener {
    /// Blocks until the thread reports whether the port is listening.
    pub(crate) fn spawn(
        driver: Arc<dyn MidiDriver>,
        device: MidiInputDevice,
        accumulator: Arc<Accumulator>,
        status: Arc<ListenerStatus>,
    ) -> Result<Self> {
        let (command_sender, command_receiver) = bounded(4);
        let (ready_sender, ready_receiver) = bounded(1);
        let lost_sender = command_sender.clone();
        let thread_status = Arc::clone(&status);

        let handle = thread::Builder::new()
            .name("midisense-listener".to_string())
            .spawn(move || {
                Self::listener_thread(
                    driver,
                    device,
                    accumulator,
                    thread_status,
                    command_receiver,
                    lost_sender,
                    ready_sender,
                );
            })
            .map_err(|e| {
                let reason = format!("Failed to spawn MIDI listener thread: {}", e);
                status.fail(ListenerState::FailedToStart, reason.clone());
                Error::ListenerStart(reason)
            })?;

        let started = ready_receiver.recv().unwrap_or_else(|_| {
            Err(Error::ListenerStart(
                "MIDI listener thread exited before starting".to_string(),
            ))
        });

        match started {
            Ok(()) => Ok(Self {
                command_sender,
                handle: Some(handle),
            }),
            Err(e) => {
                let _ = handle.join();
                if status.state() != ListenerState::FailedToStart {
                    status.fail(ListenerState::FailedToStart, e.to_string());
                }
                Err(e)
            }
        }
    }

    fn listener_thread(
        driver: Arc<dyn MidiDriver>,
        device: MidiInputDevice,
        accumulator: Arc<Accumulator>,
        status: Arc<ListenerStatus>,
        command_receiver: Receiver<ListenerCommand>,
        lost_sender: Sender<ListenerCommand>,
        ready_sender: Sender<Result<()>>,
    ) {
        info!("Starting MIDI input listener for port: {}", device.name);

        let port = match driver.open_input(&device) {
            Ok(port) => port,
            Err(e) => {
                error!("Failed to open MIDI input port {}: {}", device.name, e);
                status.fail(ListenerState::FailedToStart, e.to_string());
                let _ = ready_sender.send(Err(e));
                return;
            }
        };

        let connection = match port.listen(Box::new(move |message: DriverMessage| match message {
            DriverMessage::Event(event) => {
                debug!(
                    "MIDI {:?} ch={} key={} vel={} t={}ms",
                    event.kind, event.channel, event.key, event.velocity, event.timestamp_ms
                );
                accumulator.apply(event);
            }
            DriverMessage::Lost(reason) => {
                let _ = lost_sender.try_send(ListenerCommand::DeviceLost(reason));
            }
        })) {
            Ok(connection) => connection,
            Err(e) => {
                error!("Failed to start MIDI listener for port {}: {}", device.name, e);
                status.fail(ListenerState::FailedToStart, e.to_string());
                let _ = ready_sender.send(Err(e));
                return;
            }
        };

        status.set(ListenerState::Listening);
        let _ = ready_sender.send(Ok(()));

        let lost = loop {
            match command_receiver.recv_timeout(PRESENCE_POLL_INTERVAL) {
                Ok(ListenerCommand::DeviceLost(reason)) => break Some(reason),
                Ok(ListenerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break None,
                Err(RecvTimeoutError::Timeout) => {
                    // Most backends never report unplugging through the callback
                    let Some(missing) = Self::check_present(driver.as_ref(), &device) else {
                        continue;
                    };
                    // A command queued meanwhile carries the more precise outcome
                    break match command_receiver.try_recv() {
                        Ok(ListenerCommand::DeviceLost(reason)) => Some(reason),
                        Ok(ListenerCommand::Shutdown) => None,
                        Err(_) => Some(missing),
                    };
                }
            }
        };

        connection.close();
        match lost {
            Some(reason) => {
                error!("MIDI input port {} lost: {}", device.name, reason);
                status.fail(ListenerState::Faulted, reason);
            }
            None => {
                status.set(ListenerState::Stopped);
                info!("MIDI input listener stopped: {}", device.name);
            }
        }
    }

    /// Returns the fault reason when the port is no longer enumerated.
    fn check_present(driver: &dyn MidiDriver, device: &MidiInputDevice) -> Option<String> {
        match driver.input_ports() {
            Ok(ports) if ports.iter().any(|p| p.name == device.name) => None,
            Ok(_) => Some(format!(
                "MIDI input port '{}' is no longer available",
                device.name
            )),
            Err(e) => {
                debug!("Failed to enumerate MIDI inputs: {}", e);
                None
            }
        }
    }

    /// Signal the thread and wait for it to close the port.
    pub(crate) fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            // A full queue means a DeviceLost is pending; the thread exits anyway
            let _ = self.command_sender.try_send(ListenerCommand::Shutdown);
            if handle.join().is_err() {
                error!("MIDI listener thread panicked");
            }
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NoteEvent;
    use crate::io::VirtualDriver;

    fn spawn_on(
        driver: &VirtualDriver,
        name: &str,
    ) -> (Result<Listener>, Arc<Accumulator>, Arc<ListenerStatus>) {
        let device = driver.find_input_port(name).unwrap();
        let accumulator = Arc::new(Accumulator::new());
        let status = Arc::new(ListenerStatus::new());
        let listener = Listener::spawn(
            Arc::new(driver.clone()),
            device,
            accumulator.clone(),
            status.clone(),
        );
        (listener, accumulator, status)
    }

    #[test]
    fn test_state_roundtrip_through_atomic() {
        let status = ListenerStatus::new();
        assert_eq!(status.state(), ListenerState::Created);
        status.set(ListenerState::Listening);
        assert_eq!(status.state(), ListenerState::Listening);
        assert!(status.fault().is_none());
        status.fail(ListenerState::Faulted, "gone".to_string());
        assert_eq!(status.state(), ListenerState::Faulted);
        assert_eq!(status.fault().as_deref(), Some("gone"));
        assert!(status.state().is_terminal());
    }

    #[test]
    fn test_listen_and_stop() {
        let driver = VirtualDriver::new();
        let port = driver.add_port("Test Port");

        let (listener, accumulator, status) = spawn_on(&driver, "Test Port");
        let listener = listener.unwrap();
        assert_eq!(status.state(), ListenerState::Listening);

        assert!(port.send(NoteEvent::note_on(0, 60, 80)));
        assert_eq!(accumulator.peek().keys(), vec![60]);

        listener.stop();
        assert_eq!(status.state(), ListenerState::Stopped);
        assert!(!port.is_listening());
        assert_eq!(port.close_count(), 1);

        // Buffered state survives the listener
        assert_eq!(accumulator.drain_and_reset().keys(), vec![60]);
    }

    #[test]
    fn test_open_failure_reported() {
        let driver = VirtualDriver::new();
        let port = driver.add_port("Locked");
        port.set_fail_open(true);

        let (listener, _, status) = spawn_on(&driver, "Locked");
        assert!(matches!(listener, Err(Error::DeviceOpen(_))));
        assert_eq!(status.state(), ListenerState::FailedToStart);
        assert!(status.fault().is_some());
    }

    #[test]
    fn test_listen_failure_closes_port() {
        let driver = VirtualDriver::new();
        let port = driver.add_port("Flaky");
        port.set_fail_listen(true);

        let (listener, _, status) = spawn_on(&driver, "Flaky");
        assert!(matches!(listener, Err(Error::ListenerStart(_))));
        assert_eq!(status.state(), ListenerState::FailedToStart);
        assert_eq!(port.open_count(), port.close_count());
    }

    #[test]
    fn test_device_lost_faults_listener() {
        let driver = VirtualDriver::new();
        let port = driver.add_port("Keyboard");

        let (listener, _, status) = spawn_on(&driver, "Keyboard");
        let listener = listener.unwrap();

        assert!(port.unplug("USB cable removed"));
        // Joining waits for the thread to record the fault
        listener.stop();

        assert_eq!(status.state(), ListenerState::Faulted);
        assert_eq!(status.fault().as_deref(), Some("USB cable removed"));
        assert_eq!(port.close_count(), 1);
    }

    #[test]
    fn test_silently_removed_port_faults_listener() {
        let driver = VirtualDriver::new();
        let port = driver.add_port("Keyboard");

        let (listener, _, status) = spawn_on(&driver, "Keyboard");
        let listener = listener.unwrap();

        port.remove();
        for _ in 0..100 {
            if status.state() == ListenerState::Faulted {
                break;
            }
            thread::sleep(PRESENCE_POLL_INTERVAL / 5);
        }

        assert_eq!(status.state(), ListenerState::Faulted);
        assert!(status.fault().unwrap().contains("no longer available"));
        assert!(!port.is_listening());
        assert_eq!(port.close_count(), 1);

        listener.stop();
        assert_eq!(status.state(), ListenerState::Faulted);
    }

    #[test]
    fn test_present_port_keeps_listening() {
        let driver = VirtualDriver::new();
        driver.add_port("Keyboard");

        let (listener, _, status) = spawn_on(&driver, "Keyboard");
        let listener = listener.unwrap();

        thread::sleep(PRESENCE_POLL_INTERVAL * 3);
        assert_eq!(status.state(), ListenerState::Listening);

        listener.stop();
        assert_eq!(status.state(), ListenerState::Stopped);
    }

    #[test]
    fn test_drop_stops_listener() {
        let driver = VirtualDriver::new();
        let port = driver.add_port("Test Port");

        let (listener, _, status) = spawn_on(&driver, "Test Port");
        drop(listener.unwrap());

        assert_eq!(status.state(), ListenerState::Stopped);
        assert!(!port.is_listening());
    }
}
