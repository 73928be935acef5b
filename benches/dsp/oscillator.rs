//! Benchmarks for band-limited oscillators.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_mono::dsp::oscillator::{
    note_to_frequency, phase_increment, Oscillator, OscillatorBank, Waveform,
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let dt = phase_increment(note_to_frequency(69.0), SAMPLE_RATE);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for waveform in Waveform::ALL {
            let mut osc = Oscillator::new(waveform);
            let name = format!("{waveform:?}").to_lowercase();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for sample in buffer.iter_mut() {
                        *sample = osc.tick(black_box(dt), None).sample;
                    }
                })
            });
        }

        // All three running, two of them hard-synced to the first
        let mut bank = OscillatorBank::new();
        bank.set_sync(1, true);
        bank.set_sync(2, true);
        let increments = [dt, dt * 1.51, dt * 2.23];
        group.bench_with_input(BenchmarkId::new("bank_synced", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    let [a, b2, c2] = bank.tick(black_box(increments));
                    *sample = a + b2 + c2;
                }
            })
        });
    }

    group.finish();
}
