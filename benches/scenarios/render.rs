//! Benchmarks for the device render path.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_mono::{io::RenderLoop, synth::channel, EngineConfig};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/render");

    for &size in BLOCK_SIZES {
        // Generous budget: a missed deadline would only add an Err to the result.
        let config = EngineConfig::new(SAMPLE_RATE)
            .with_noise_seed(2)
            .with_deadline_ratio(100.0);
        let (mut ctl, engine) = channel(&config);
        let _ = ctl.note_on(57, 100, 0);
        let mut render_loop = RenderLoop::new(engine, &config);

        let mut mono = vec![0.0f32; size];
        group.bench_with_input(BenchmarkId::new("mono", size), &size, |b, &size| {
            b.iter(|| black_box(render_loop.render(black_box(&mut mono), size)))
        });

        let mut stereo = vec![0.0f32; size * 2];
        group.bench_with_input(BenchmarkId::new("stereo_interleaved", size), &size, |b, _| {
            b.iter(|| black_box(render_loop.render_interleaved(black_box(&mut stereo), 2)))
        });
    }

    group.finish();
}
