//! Control-thread side of the engine.
//!
//! [`channel`] builds a [`VoiceEngine`] for the audio thread and a
//! [`SynthController`] for everything else, joined by two bounded lock-free
//! queues: control messages one way, engine reports the other.

use rtrb::{Consumer, Producer, RingBuffer};

use crate::{
    config::EngineConfig,
    dsp::modulate::{ModDestination, ModSource, ModulationRoute},
    synth::{
        engine::VoiceEngine,
        message::{ControlError, ControlMessage, EngineReport, NoteEvent},
        params::ParamId,
    },
};

/// Build a connected controller and engine.
pub fn channel(config: &EngineConfig) -> (SynthController, VoiceEngine) {
    let (control_tx, control_rx) = RingBuffer::new(config.queue_capacity.max(2));
    let (report_tx, report_rx) = RingBuffer::new(config.report_capacity.max(1));
    let engine = VoiceEngine::new(config, control_rx, report_tx);
    let controller = SynthController {
        tx: control_tx,
        reports: report_rx,
    };
    (controller, engine)
}

pub struct SynthController {
    tx: Producer<ControlMessage>,
    reports: Consumer<EngineReport>,
}

impl SynthController {
    /// Validate and enqueue a note. Malformed notes never reach the engine.
    pub fn send_note(&mut self, event: NoteEvent) -> Result<(), ControlError> {
        if let Err(err) = event.validate() {
            tracing::warn!(
                pitch = event.pitch,
                velocity = event.velocity,
                "dropping malformed note event"
            );
            return Err(err);
        }
        self.push(ControlMessage::Note(event))
    }

    pub fn note_on(&mut self, pitch: u8, velocity: u8, timestamp: u64) -> Result<(), ControlError> {
        self.send_note(NoteEvent::on(pitch, velocity, timestamp))
    }

    pub fn note_off(&mut self, pitch: u8, timestamp: u64) -> Result<(), ControlError> {
        self.send_note(NoteEvent::off(pitch, timestamp))
    }

    /// Out-of-range values are clamped by the engine, not rejected here.
    pub fn set_param(&mut self, id: ParamId, value: f32) -> Result<(), ControlError> {
        self.push(ControlMessage::SetParam { id, value })
    }

    pub fn set_param_by_name(&mut self, name: &str, value: f32) -> Result<(), ControlError> {
        let id = ParamId::from_name(name).ok_or_else(|| {
            tracing::warn!(name, "unknown parameter");
            ControlError::UnknownParameter(name.to_string())
        })?;
        self.set_param(id, value)
    }

    pub fn set_route(&mut self, route: ModulationRoute) -> Result<(), ControlError> {
        self.push(ControlMessage::SetRoute(route))
    }

    pub fn clear_route(
        &mut self,
        source: ModSource,
        destination: ModDestination,
    ) -> Result<(), ControlError> {
        self.push(ControlMessage::ClearRoute {
            source,
            destination,
        })
    }

    pub fn all_notes_off(&mut self) -> Result<(), ControlError> {
        self.push(ControlMessage::AllNotesOff)
    }

    /// Send any control message, e.g. one converted from MIDI. Notes are
    /// validated and stops use the reserved slot, as with the typed methods.
    pub fn send(&mut self, message: ControlMessage) -> Result<(), ControlError> {
        match message {
            ControlMessage::Note(event) => self.send_note(event),
            ControlMessage::Stop => self.stop(),
            other => self.push(other),
        }
    }

    /// Request a hard stop at the next block.
    ///
    /// Uses the slot every other message leaves free, so it only fails if a
    /// stop is already waiting or the engine is gone.
    pub fn stop(&mut self) -> Result<(), ControlError> {
        if self.tx.is_abandoned() {
            return Err(ControlError::Disconnected);
        }
        match self.tx.push(ControlMessage::Stop) {
            Ok(()) => Ok(()),
            Err(_) => {
                tracing::debug!("stop already pending");
                Ok(())
            }
        }
    }

    fn push(&mut self, message: ControlMessage) -> Result<(), ControlError> {
        if self.tx.is_abandoned() {
            return Err(ControlError::Disconnected);
        }
        // Keep one slot in reserve for `stop`.
        if self.tx.slots() <= 1 {
            tracing::debug!(?message, "control queue full, dropping message");
            return Err(ControlError::QueueFull);
        }
        self.tx
            .push(message)
            .map_err(|_| ControlError::QueueFull)
    }

    /// Free slots for ordinary messages.
    pub fn capacity_left(&self) -> usize {
        self.tx.slots().saturating_sub(1)
    }

    /// Take every report the engine has posted, logging the noteworthy ones.
    pub fn drain_reports(&mut self) -> impl Iterator<Item = EngineReport> + '_ {
        std::iter::from_fn(move || self.reports.pop().ok()).inspect(|report| match report {
            EngineReport::FilterReset { count, frame } => {
                tracing::warn!(count, frame, "ladder filter diverged and was reset");
            }
            EngineReport::NoteDropped { pitch, frame } => {
                tracing::warn!(pitch, frame, "pending note list full, note dropped");
            }
            EngineReport::Stopped { frame } => {
                tracing::debug!(frame, "engine stopped");
            }
        })
    }
}
