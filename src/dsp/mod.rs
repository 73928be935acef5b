//! Low-level DSP primitives used by the voice engine.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside the voice. They stay focused on the signal-processing
//! math; orchestration and modulation wiring live in `synth`.

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Four-pole transistor ladder low-pass filter.
pub mod filter;
/// Triangle, sine, square and sample-and-hold modulation oscillator.
pub mod lfo;
/// Weighted oscillator/noise summing with soft clipping.
pub mod mix;
/// Modulation sources, destinations and the routing matrix.
pub mod modulate;
/// White and pink noise.
pub mod noise;
/// Band-limited oscillators and the three-oscillator bank.
pub mod oscillator;
/// Linear parameter ramps.
pub mod smooth;

pub use envelope::{Envelope, EnvelopeCurve, EnvelopeStage};
pub use filter::{LadderFilter, Oversampling};
pub use lfo::{Lfo, LfoShape};
pub use mix::{MixLevels, Mixer};
pub use modulate::{ModDestination, ModSource, ModulationMatrix, ModulationRoute};
pub use noise::{NoiseColor, NoiseGenerator};
pub use oscillator::{Oscillator, OscillatorBank, Waveform};
pub use smooth::LinearRamp;
