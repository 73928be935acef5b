//! Benchmarks for DSP primitives and the full voice.
//!
//! Run with: cargo bench
//!
//! These benchmarks measure the performance of core DSP operations to ensure
//! they complete well within real-time audio deadlines.
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Low-level primitives (oscillator, filter, envelope, etc.)
//!   - scenarios/*  Whole-engine patches and the device render path

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

pub const SAMPLE_RATE: f32 = 48_000.0;

criterion_group!(
    benches,
    // Low-level DSP primitives
    dsp::bench_oscillator,
    dsp::bench_filter,
    dsp::bench_envelope,
    dsp::bench_mix,
    dsp::bench_modulation,
    // Whole voice
    scenarios::bench_voice,
    scenarios::bench_render,
);
criterion_main!(benches);
