//! Benchmarks for the ladder filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_mono::dsp::filter::{LadderFilter, Oversampling};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sawtooth-like ramp)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        for (name, oversampling) in [("ladder_x1", Oversampling::X1), ("ladder_x2", Oversampling::X2)] {
            let mut filter = LadderFilter::new(SAMPLE_RATE).with_oversampling(oversampling);
            filter.set_cutoff(1_000.0);
            filter.set_resonance(2.0);
            let mut buffer = input.clone();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    filter.render(black_box(&mut buffer));
                })
            });
        }

        // Cutoff moving every sample, as under envelope modulation
        let mut filter = LadderFilter::new(SAMPLE_RATE);
        filter.set_resonance(3.0);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("ladder_swept", size), &size, |b, _| {
            b.iter(|| {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    filter.set_cutoff(200.0 + 40.0 * i as f32);
                    *sample = filter.process(black_box(input[i]));
                }
            })
        });

        // Self-oscillating with no input
        let mut filter = LadderFilter::new(SAMPLE_RATE);
        filter.set_self_oscillation(true);
        filter.set_cutoff(440.0);
        filter.set_resonance(4.5);
        filter.process(1.0);
        let mut buffer = vec![0.0f32; size];
        group.bench_with_input(BenchmarkId::new("self_oscillating", size), &size, |b, _| {
            b.iter(|| {
                buffer.fill(0.0);
                filter.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
