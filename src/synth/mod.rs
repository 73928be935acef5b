// Purpose: the monophonic voice, its parameters and the control/audio thread split
// This layer sits above the dsp primitives and wires them into one instrument

pub mod controller;
pub mod engine;
pub mod message;
pub mod params;
pub mod voice;

pub use controller::{channel, SynthController};
pub use engine::VoiceEngine;
pub use message::{ControlError, ControlMessage, EngineReport, NoteEvent};
pub use params::{ParamId, ParameterSet};
