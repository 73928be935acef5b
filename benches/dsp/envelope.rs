//! Benchmarks for the ADSR envelope generator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_mono::dsp::envelope::{Envelope, EnvelopeCurve};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, curve) in [("linear", EnvelopeCurve::Linear), ("exponential", EnvelopeCurve::Exponential)] {
            // Long attack so every iteration stays inside a moving segment
            let mut env = Envelope::adsr(SAMPLE_RATE, 20_000.0, 100.0, 0.7, 300.0).with_curve(curve);
            env.gate_on();
            group.bench_with_input(BenchmarkId::new(format!("attack_{name}"), size), &size, |b, _| {
                b.iter(|| {
                    env.render(black_box(&mut buffer));
                })
            });
        }

        // Sustain phase (holding steady)
        let mut env = Envelope::adsr(SAMPLE_RATE, 1.0, 1.0, 0.7, 300.0);
        env.gate_on();
        for _ in 0..200 {
            env.next_sample();
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
