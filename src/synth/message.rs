use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::modulate::{ModDestination, ModSource, ModulationRoute},
    synth::params::ParamId,
};

/// Highest valid MIDI pitch and velocity.
pub const MIDI_MAX: u8 = 127;

/// A key going down or up.
///
/// `timestamp` is an absolute position in engine frames. Events at or before
/// the start of a block are applied at its first sample; events later in the
/// block land on their exact sample; events beyond it wait.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NoteEvent {
    pub pitch: u8,
    pub velocity: u8,
    pub gate_on: bool,
    pub timestamp: u64,
}

impl NoteEvent {
    pub fn on(pitch: u8, velocity: u8, timestamp: u64) -> Self {
        Self {
            pitch,
            velocity,
            gate_on: true,
            timestamp,
        }
    }

    pub fn off(pitch: u8, timestamp: u64) -> Self {
        Self {
            pitch,
            velocity: 0,
            gate_on: false,
            timestamp,
        }
    }

    pub fn validate(&self) -> Result<(), ControlError> {
        if self.pitch > MIDI_MAX || self.velocity > MIDI_MAX {
            return Err(ControlError::MalformedNote {
                pitch: self.pitch,
                velocity: self.velocity,
            });
        }
        Ok(())
    }
}

/// Control thread to audio thread.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ControlMessage {
    Note(NoteEvent),
    SetParam { id: ParamId, value: f32 },
    SetRoute(ModulationRoute),
    ClearRoute {
        source: ModSource,
        destination: ModDestination,
    },
    /// Release every held key; envelopes run their release.
    AllNotesOff,
    /// Hard stop: drop pending notes, silence envelopes, flush the filter.
    Stop,
}

/// Audio thread to control thread.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EngineReport {
    /// The filter diverged `count` times in the block starting at `frame`
    /// and was reset.
    FilterReset { count: u32, frame: u64 },
    /// A timestamped note was dropped because the pending list was full.
    NoteDropped { pitch: u8, frame: u64 },
    /// A stop request was applied at `frame`.
    Stopped { frame: u64 },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    #[error("malformed note event: pitch {pitch}, velocity {velocity} (both must be 0..=127)")]
    MalformedNote { pitch: u8, velocity: u8 },
    #[error("control queue is full")]
    QueueFull,
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    #[error("voice engine has been dropped")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_note_range() {
        assert!(NoteEvent::on(60, 100, 0).validate().is_ok());
        assert!(NoteEvent::on(127, 127, 0).validate().is_ok());
        assert_eq!(
            NoteEvent::on(128, 100, 0).validate(),
            Err(ControlError::MalformedNote {
                pitch: 128,
                velocity: 100
            })
        );
        assert!(NoteEvent::on(60, 200, 0).validate().is_err());
    }

    #[test]
    fn note_off_has_no_velocity() {
        let off = NoteEvent::off(64, 10);
        assert!(!off.gate_on);
        assert_eq!(off.velocity, 0);
        assert_eq!(off.timestamp, 10);
    }
}
