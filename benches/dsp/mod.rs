//! Benchmarks for low-level DSP primitives.

mod envelope;
mod filter;
mod mix;
mod modulate;
mod oscillator;

pub use envelope::bench_envelope;
pub use filter::bench_filter;
pub use mix::bench_mix;
pub use modulate::bench_modulation;
pub use oscillator::bench_oscillator;
