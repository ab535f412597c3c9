//! Polled MIDI input reader.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use midisense_midi::{MidirDriver, Reader, TrackingMode};
//!
//! let reader = Reader::builder(Arc::new(MidirDriver::new()))
//!     .port_name("Keystation")
//!     .tracking(TrackingMode::ActiveSets)
//!     .build()?;
//!
//! // Notes held since the previous read; the state is cleared afterwards
//! let readings = reader.read_and_reset();
//! println!("keys={} velocities={}", readings.keys, readings.velocities);
//!
//! reader.close();
//! ```

mod builder;

pub use builder::{validate_settings, ReaderBuilder, DEFAULT_DELIMITER};

use crate::accumulator::{Accumulator, Readings, Snapshot, TrackingMode};
use crate::error::Result;
use crate::io::MidiDriver;
use crate::listener::{Listener, ListenerState, ListenerStatus};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// A MIDI input port exposed as drain-on-read note state.
///
/// Dropping the reader closes the port.
pub struct Reader {
    port_name: String,
    tracking: TrackingMode,
    delimiter: String,
    accumulator: Arc<Accumulator>,
    status: Arc<ListenerStatus>,
    listener: Mutex<Option<Listener>>,
}

impl Reader {
    pub fn builder(driver: Arc<dyn MidiDriver>) -> ReaderBuilder {
        ReaderBuilder::new(driver)
    }

    /// Open `device_name` with default tracking and delimiter.
    pub fn configure(driver: Arc<dyn MidiDriver>, device_name: &str) -> Result<Self> {
        Self::builder(driver).port_name(device_name).build()
    }

    // ==================== Reading ====================

    /// Render and clear the notes held since the previous read.
    ///
    /// Keeps working after close or a device fault; the state is then
    /// simply static.
    pub fn read_and_reset(&self) -> Readings {
        if self.status.state() == ListenerState::Faulted {
            warn!(
                "Reading from faulted MIDI input {}: {}",
                self.port_name,
                self.status.fault().unwrap_or_default()
            );
        }

        let snapshot = self.accumulator.drain_and_reset();
        debug!(
            "Read MIDI input {}: {} held notes, {} events",
            self.port_name,
            snapshot.notes().len(),
            snapshot.events_applied()
        );
        snapshot.render(self.tracking, &self.delimiter)
    }

    /// Clear and return the raw snapshot without rendering.
    pub fn drain(&self) -> Snapshot {
        self.accumulator.drain_and_reset()
    }

    /// Current state without clearing it.
    pub fn peek(&self) -> Snapshot {
        self.accumulator.peek()
    }

    // ==================== Lifecycle ====================

    /// Stop listening and close the port. Later calls do nothing.
    pub fn close(&self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.stop();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.listener.lock().is_none()
    }

    pub fn status(&self) -> ListenerState {
        self.status.state()
    }

    /// Why the listener failed, if it did.
    pub fn fault(&self) -> Option<String> {
        self.status.fault()
    }

    // ==================== Settings ====================

    /// Resolved port name (may differ from the configured partial name).
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn tracking(&self) -> TrackingMode {
        self.tracking
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("port_name", &self.port_name)
            .field("tracking", &self.tracking)
            .field("status", &self.status.state())
            .finish()
    }
}
