//! Note events delivered by a driver to the accumulator.

use midi_msg::{ChannelVoiceMsg, MidiMsg};

/// Kind of a note event.
///
/// `NoteOn`/`NoteOff` mirror the raw status byte. `NoteStart`/`NoteEnd` are
/// the normalized forms for drivers that already fold "note on with
/// velocity 0" into a release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoteKind {
    NoteOn,
    NoteOff,
    NoteStart,
    NoteEnd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteEvent {
    pub kind: NoteKind,
    /// 0-based channel (0-15).
    pub channel: u8,
    pub key: u8,
    pub velocity: u8,
    /// Driver timestamp in milliseconds.
    pub timestamp_ms: i32,
}

impl NoteEvent {
    #[inline]
    pub fn new(kind: NoteKind, channel: u8, key: u8, velocity: u8, timestamp_ms: i32) -> Self {
        Self {
            kind,
            channel,
            key,
            velocity,
            timestamp_ms,
        }
    }

    #[inline]
    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        Self::new(NoteKind::NoteOn, channel, key, velocity, 0)
    }

    #[inline]
    pub fn note_off(channel: u8, key: u8, velocity: u8) -> Self {
        Self::new(NoteKind::NoteOff, channel, key, velocity, 0)
    }

    #[inline]
    pub fn note_start(channel: u8, key: u8, velocity: u8) -> Self {
        Self::new(NoteKind::NoteStart, channel, key, velocity, 0)
    }

    #[inline]
    pub fn note_end(channel: u8, key: u8) -> Self {
        Self::new(NoteKind::NoteEnd, channel, key, 0, 0)
    }

    #[inline]
    pub fn at(mut self, timestamp_ms: i32) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// True when the event marks a key going down.
    #[inline]
    pub fn is_press(&self) -> bool {
        match self.kind {
            NoteKind::NoteStart => true,
            NoteKind::NoteOn => self.velocity > 0,
            NoteKind::NoteOff | NoteKind::NoteEnd => false,
        }
    }

    /// True when the event marks a key being released, including the
    /// running-status idiom of a note on with velocity 0.
    #[inline]
    pub fn is_release(&self) -> bool {
        !self.is_press()
    }

    /// Decode raw MIDI bytes. Valid messages that are not notes (CC, pitch
    /// bend, clock, sysex...) yield `Ok(None)`.
    pub fn from_bytes(
        bytes: &[u8],
        timestamp_us: u64,
    ) -> Result<Option<Self>, midi_msg::ParseError> {
        let (msg, _len) = MidiMsg::from_midi(bytes)?;
        let MidiMsg::ChannelVoice { channel, msg } = msg else {
            return Ok(None);
        };

        let timestamp_ms = micros_to_millis(timestamp_us);
        let event = match msg {
            ChannelVoiceMsg::NoteOn { note, velocity } => {
                Self::new(NoteKind::NoteOn, channel as u8, note, velocity, timestamp_ms)
            }
            ChannelVoiceMsg::NoteOff { note, velocity } => {
                Self::new(NoteKind::NoteOff, channel as u8, note, velocity, timestamp_ms)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn micros_to_millis(timestamp_us: u64) -> i32 {
    i32::try_from(timestamp_us / 1000).unwrap_or(i32::MAX)
}
