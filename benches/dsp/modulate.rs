//! Benchmarks for the modulation matrix.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_mono::dsp::modulate::{
    ModDestination, ModSource, ModSources, ModulationMatrix, ModulationRoute,
};

use crate::BLOCK_SIZES;

pub fn bench_modulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/modulation");

    let mut full = ModulationMatrix::new();
    for (i, source) in ModSource::ALL.into_iter().enumerate() {
        for (j, destination) in ModDestination::ALL.into_iter().enumerate() {
            let depth = ((i * 5 + j) as f32 * 0.37).sin();
            full.set_route(ModulationRoute::new(source, destination, depth));
        }
    }

    for &size in BLOCK_SIZES {
        let sources: Vec<ModSources> = (0..size)
            .map(|i| {
                let t = i as f32 / size as f32;
                ModSources::default()
                    .with(ModSource::FilterEnvelope, t)
                    .with(ModSource::AmpEnvelope, 1.0 - t)
                    .with(ModSource::Lfo1, (t * 6.0).sin())
                    .with(ModSource::Lfo2, (t * 2.0).cos())
                    .with(ModSource::Velocity, 0.8)
                    .with(ModSource::KeyTrack, 0.1)
            })
            .collect();

        for (name, matrix) in [("classic", ModulationMatrix::classic()), ("full", full.clone())] {
            let mut sink = 0.0f32;
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for s in &sources {
                        let offsets = matrix.resolve_all(black_box(s));
                        sink += offsets.get(ModDestination::Cutoff);
                    }
                    black_box(sink)
                })
            });
        }
    }

    group.finish();
}
