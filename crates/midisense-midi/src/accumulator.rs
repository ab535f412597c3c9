//! Drain-on-read note state.
//!
//! The listener thread applies events while callers drain. Both go through
//! one mutex; each drain returns what was applied since the previous drain
//! and leaves the state empty.

use crate::event::NoteEvent;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How a snapshot is projected into readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// `keys` and `velocities`, one velocity per key in key order.
    #[default]
    KeyVelocity,
    /// `keys`, `channels` and `velocities`; channels and velocities are the
    /// distinct values over the held keys. A key holds one note, so the same
    /// key pressed on a second channel replaces the first channel's note.
    ActiveSets,
}

impl TrackingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingMode::KeyVelocity => "key_velocity",
            TrackingMode::ActiveSets => "active_sets",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldNote {
    pub channel: u8,
    pub key: u8,
    pub velocity: u8,
    pub timestamp_ms: i32,
}

#[derive(Debug, Default)]
struct NoteState {
    held: HashMap<u8, HeldNote>,
    applied: u64,
}

/// Immutable copy of the accumulated state taken at drain time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    notes: Vec<HeldNote>,
    applied: u64,
}

impl Snapshot {
    pub fn notes(&self) -> &[HeldNote] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Number of note events applied between the previous drain and this one.
    pub fn events_applied(&self) -> u64 {
        self.applied
    }

    pub fn keys(&self) -> Vec<u8> {
        self.notes.iter().map(|n| n.key).collect()
    }

    pub fn velocities(&self) -> Vec<u8> {
        self.notes.iter().map(|n| n.velocity).collect()
    }

    pub fn distinct_channels(&self) -> Vec<u8> {
        distinct(self.notes.iter().map(|n| n.channel))
    }

    pub fn distinct_velocities(&self) -> Vec<u8> {
        distinct(self.notes.iter().map(|n| n.velocity))
    }

    pub fn render(&self, mode: TrackingMode, delimiter: &str) -> Readings {
        match mode {
            TrackingMode::KeyVelocity => Readings {
                keys: join(&self.keys(), delimiter),
                velocities: join(&self.velocities(), delimiter),
                channels: None,
            },
            TrackingMode::ActiveSets => Readings {
                keys: join(&self.keys(), delimiter),
                velocities: join(&self.distinct_velocities(), delimiter),
                channels: Some(join(&self.distinct_channels(), delimiter)),
            },
        }
    }
}

/// String projection of a snapshot. Empty fields render as "".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Readings {
    pub keys: String,
    pub velocities: String,
    pub channels: Option<String>,
}

impl Readings {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
            && self.velocities.is_empty()
            && self.channels.as_deref().map_or(true, str::is_empty)
    }
}

#[derive(Debug, Default)]
pub struct Accumulator {
    state: Mutex<NoteState>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, event: NoteEvent) {
        let mut state = self.state.lock();
        if event.is_press() {
            state.held.insert(
                event.key,
                HeldNote {
                    channel: event.channel,
                    key: event.key,
                    velocity: event.velocity,
                    timestamp_ms: event.timestamp_ms,
                },
            );
        } else {
            state.held.remove(&event.key);
        }
        state.applied += 1;
    }

    pub fn drain_and_reset(&self) -> Snapshot {
        let taken = std::mem::take(&mut *self.state.lock());
        Snapshot {
            notes: taken.held.into_values().collect(),
            applied: taken.applied,
        }
    }

    /// Copy of the current state without resetting it.
    pub fn peek(&self) -> Snapshot {
        let state = self.state.lock();
        Snapshot {
            notes: state.held.values().copied().collect(),
            applied: state.applied,
        }
    }
}

fn distinct(values: impl Iterator<Item = u8>) -> Vec<u8> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(*v)).collect()
}

fn join(values: &[u8], delimiter: &str) -> String {
    values
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(field: &str) -> Vec<u8> {
        let mut values: Vec<u8> = field
            .split_whitespace()
            .map(|t| t.parse().unwrap())
            .collect();
        values.sort_unstable();
        values
    }

    #[test]
    fn test_drain_resets() {
        let acc = Accumulator::new();
        acc.apply(NoteEvent::note_on(0, 60, 100));
        acc.apply(NoteEvent::note_on(0, 64, 90));

        let first = acc.drain_and_reset();
        assert_eq!(first.notes().len(), 2);
        assert_eq!(first.events_applied(), 2);

        let second = acc.drain_and_reset();
        assert!(second.is_empty());
        assert_eq!(second.events_applied(), 0);
        assert!(second.render(TrackingMode::ActiveSets, " ").is_empty());
    }

    #[test]
    fn test_note_off_clears_key() {
        let acc = Accumulator::new();
        acc.apply(NoteEvent::note_on(1, 60, 100));
        acc.apply(NoteEvent::note_off(1, 60, 0));

        let readings = acc.drain_and_reset().render(TrackingMode::KeyVelocity, " ");
        assert_eq!(readings.keys, "");
        assert_eq!(readings.velocities, "");
    }

    #[test]
    fn test_velocity_zero_note_on_releases() {
        let acc = Accumulator::new();
        acc.apply(NoteEvent::note_on(0, 60, 100));
        acc.apply(NoteEvent::note_on(0, 60, 0));
        assert!(acc.drain_and_reset().is_empty());
    }

    #[test]
    fn test_normalized_kinds() {
        let acc = Accumulator::new();
        acc.apply(NoteEvent::note_start(0, 48, 30));
        acc.apply(NoteEvent::note_start(0, 50, 31));
        acc.apply(NoteEvent::note_end(0, 48));
        assert_eq!(acc.drain_and_reset().keys(), vec![50]);
    }

    #[test]
    fn test_last_velocity_wins() {
        let acc = Accumulator::new();
        acc.apply(NoteEvent::note_on(0, 60, 20));
        acc.apply(NoteEvent::note_on(2, 60, 110).at(7));

        let snapshot = acc.drain_and_reset();
        assert_eq!(
            snapshot.notes(),
            &[HeldNote {
                channel: 2,
                key: 60,
                velocity: 110,
                timestamp_ms: 7
            }]
        );
    }

    #[test]
    fn test_release_of_unknown_key_is_harmless() {
        let acc = Accumulator::new();
        acc.apply(NoteEvent::note_off(0, 10, 0));
        let snapshot = acc.drain_and_reset();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.events_applied(), 1);
    }

    #[test]
    fn test_render_three_keys() {
        let acc = Accumulator::new();
        for key in [60, 64, 67] {
            acc.apply(NoteEvent::note_on(0, key, 100));
        }

        let readings = acc.drain_and_reset().render(TrackingMode::KeyVelocity, " ");
        let parts: Vec<&str> = readings.keys.split(' ').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(tokens(&readings.keys), vec![60, 64, 67]);
        assert_eq!(readings.velocities, "100 100 100");
        assert!(readings.channels.is_none());
    }

    #[test]
    fn test_render_custom_delimiter() {
        let acc = Accumulator::new();
        acc.apply(NoteEvent::note_on(0, 60, 1));
        acc.apply(NoteEvent::note_on(0, 61, 2));

        let readings = acc.drain_and_reset().render(TrackingMode::KeyVelocity, ",");
        let mut keys: Vec<&str> = readings.keys.split(',').collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["60", "61"]);
    }

    #[test]
    fn test_key_velocity_pairs_stay_aligned() {
        let acc = Accumulator::new();
        acc.apply(NoteEvent::note_on(0, 60, 10));
        acc.apply(NoteEvent::note_on(0, 62, 20));
        acc.apply(NoteEvent::note_on(0, 64, 30));

        let readings = acc.drain_and_reset().render(TrackingMode::KeyVelocity, " ");
        let keys = readings.keys.split(' ');
        let velocities = readings.velocities.split(' ');
        for (key, velocity) in keys.zip(velocities) {
            let key: u8 = key.parse().unwrap();
            let velocity: u8 = velocity.parse().unwrap();
            assert_eq!(velocity, (key - 58) * 5);
        }
    }

    #[test]
    fn test_active_sets_keep_shared_channel() {
        let acc = Accumulator::new();
        acc.apply(NoteEvent::note_on(0, 60, 100));
        acc.apply(NoteEvent::note_on(0, 64, 100));
        acc.apply(NoteEvent::note_on(5, 67, 80));
        // Releasing one note on channel 0 must not drop channel 0 or velocity 100
        acc.apply(NoteEvent::note_off(0, 60, 0));

        let readings = acc.drain_and_reset().render(TrackingMode::ActiveSets, " ");
        assert_eq!(tokens(&readings.keys), vec![64, 67]);
        assert_eq!(tokens(readings.channels.as_deref().unwrap()), vec![0, 5]);
        assert_eq!(tokens(&readings.velocities), vec![80, 100]);
    }

    #[test]
    fn test_same_key_on_second_channel_replaces_note() {
        let acc = Accumulator::new();
        acc.apply(NoteEvent::note_on(0, 60, 100));
        acc.apply(NoteEvent::note_on(5, 60, 90));

        let readings = acc.drain_and_reset().render(TrackingMode::ActiveSets, " ");
        assert_eq!(readings.keys, "60");
        assert_eq!(readings.channels.as_deref(), Some("5"));
        assert_eq!(readings.velocities, "90");
    }

    #[test]
    fn test_peek_does_not_reset() {
        let acc = Accumulator::new();
        acc.apply(NoteEvent::note_on(0, 60, 100));
        assert_eq!(acc.peek().keys(), vec![60]);
        assert_eq!(acc.drain_and_reset().keys(), vec![60]);
    }

    #[test]
    fn test_tracking_mode_defaults() {
        assert_eq!(TrackingMode::default(), TrackingMode::KeyVelocity);
        assert_eq!(TrackingMode::ActiveSets.as_str(), "active_sets");
    }
}
