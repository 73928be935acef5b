pub mod config; // Engine construction settings
pub mod dsp;
pub mod io; // Render boundary and MIDI conversion
pub mod synth; // The monophonic voice and its control plumbing

pub use config::EngineConfig;

pub const MAX_BLOCK_SIZE: usize = 2048;
