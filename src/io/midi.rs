/// Raw MIDI channel messages, as they come off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Centered on 0, -8192..=8191.
    PitchBend { channel: u8, value: i16 },
    ProgramChange { channel: u8, program: u8 },
}

impl MidiEvent {
    /// Decode one channel message. Returns `None` for system messages,
    /// truncated input and anything else the voice has no use for.
    pub fn parse(bytes: &[u8]) -> Option<MidiEvent> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0f;
        let data_byte = |i: usize| data.get(i).copied().filter(|b| *b < 0x80);

        match status & 0xf0 {
            0x80 => Some(MidiEvent::NoteOff {
                channel,
                key: data_byte(0)?,
                velocity: data_byte(1)?,
            }),
            0x90 => Some(MidiEvent::NoteOn {
                channel,
                key: data_byte(0)?,
                velocity: data_byte(1)?,
            }),
            0xb0 => Some(MidiEvent::ControlChange {
                channel,
                controller: data_byte(0)?,
                value: data_byte(1)?,
            }),
            0xc0 => Some(MidiEvent::ProgramChange {
                channel,
                program: data_byte(0)?,
            }),
            0xe0 => {
                let lsb = data_byte(0)? as i16;
                let msb = data_byte(1)? as i16;
                Some(MidiEvent::PitchBend {
                    channel,
                    value: ((msb << 7) | lsb) - 8192,
                })
            }
            _ => None,
        }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. }
            | MidiEvent::ProgramChange { channel, .. } => channel,
        }
    }
}
