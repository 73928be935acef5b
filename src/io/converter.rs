use crate::{
    io::midi::MidiEvent,
    synth::{
        message::{ControlMessage, NoteEvent},
        params::ParamId,
    },
};

// Controller numbers the voice listens to.
pub const CC_MOD_WHEEL: u8 = 1;
pub const CC_GLIDE_TIME: u8 = 5;
pub const CC_VOLUME: u8 = 7;
pub const CC_LEGATO: u8 = 68;
pub const CC_RESONANCE: u8 = 71;
pub const CC_CUTOFF: u8 = 74;
pub const CC_ALL_SOUND_OFF: u8 = 120;
pub const CC_ALL_NOTES_OFF: u8 = 123;

/// Translate a MIDI message on `channel_filter` into a control message.
///
/// Notes are stamped with `timestamp` (engine frames). Note-on with velocity
/// 0 is a note-off, as the MIDI spec allows. Unmapped messages give `None`.
pub fn midi_to_control(midi: MidiEvent, channel_filter: u8, timestamp: u64) -> Option<ControlMessage> {
    if midi.channel() != channel_filter {
        return None;
    }
    match midi {
        MidiEvent::NoteOn { key, velocity, .. } if velocity > 0 => {
            Some(ControlMessage::Note(NoteEvent::on(key, velocity, timestamp)))
        }
        MidiEvent::NoteOn { key, .. } | MidiEvent::NoteOff { key, .. } => {
            Some(ControlMessage::Note(NoteEvent::off(key, timestamp)))
        }
        MidiEvent::PitchBend { value, .. } => Some(ControlMessage::SetParam {
            id: ParamId::PitchBend,
            value: value as f32 / 8192.0,
        }),
        MidiEvent::ControlChange {
            controller, value, ..
        } => control_change(controller, value),
        MidiEvent::ProgramChange { .. } => None,
    }
}

fn control_change(controller: u8, value: u8) -> Option<ControlMessage> {
    let unit = value as f32 / 127.0;
    let set = |id, value| Some(ControlMessage::SetParam { id, value });
    match controller {
        CC_MOD_WHEEL => set(ParamId::Lfo1Depth, unit),
        CC_GLIDE_TIME => set(ParamId::Glide, unit * unit * ParamId::Glide.spec().max),
        CC_VOLUME => set(ParamId::MasterVolume, unit),
        CC_LEGATO => set(ParamId::Legato, if value >= 64 { 1.0 } else { 0.0 }),
        CC_RESONANCE => set(ParamId::FilterResonance, unit * 4.0),
        // 20 Hz .. 20 kHz, evenly spaced in octaves.
        CC_CUTOFF => set(ParamId::FilterCutoff, 20.0 * 1000.0_f32.powf(unit)),
        CC_ALL_SOUND_OFF => Some(ControlMessage::Stop),
        CC_ALL_NOTES_OFF => Some(ControlMessage::AllNotesOff),
        _ => None,
    }
}
