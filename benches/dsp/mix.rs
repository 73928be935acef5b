//! Benchmarks for the mixer and noise source.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_mono::dsp::{
    mix::{MixLevels, Mixer},
    noise::{NoiseColor, NoiseGenerator},
};

use crate::BLOCK_SIZES;

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/mix");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for color in [NoiseColor::White, NoiseColor::Pink] {
            let mut noise = NoiseGenerator::seeded(7);
            noise.set_color(color);
            let name = format!("noise_{color:?}").to_lowercase();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for sample in buffer.iter_mut() {
                        *sample = noise.next_sample();
                    }
                })
            });
        }

        // Three oscillators plus noise, loud enough to hit the soft clipper
        let oscillators: Vec<[f32; 3]> = (0..size)
            .map(|i| {
                let t = i as f32 * 0.1;
                [t.sin(), (t * 1.5).cos(), (t * 0.5).sin()]
            })
            .collect();
        let mixer = Mixer::new(MixLevels {
            oscillators: [1.0, 0.8, 0.6],
            noise: 0.3,
        });
        let mut noise = NoiseGenerator::seeded(8);
        group.bench_with_input(BenchmarkId::new("mixer", size), &size, |b, _| {
            b.iter(|| {
                for (sample, oscs) in buffer.iter_mut().zip(&oscillators) {
                    *sample = mixer.mix(black_box(*oscs), noise.next_white());
                }
            })
        });
    }

    group.finish();
}
