//! Benchmarks for complete voice patches.
//!
//! Each patch holds one note and renders steady-state blocks, so the
//! numbers cover the full per-sample chain plus one parameter pass per block.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_mono::{
    dsp::{ModDestination, ModSource, ModulationRoute},
    synth::{channel, ParamId, SynthController, VoiceEngine},
    EngineConfig,
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn held(size: usize, patch: &[(ParamId, f32)], routes: &[ModulationRoute]) -> (SynthController, VoiceEngine) {
    let config = EngineConfig::new(SAMPLE_RATE)
        .with_block_size(size)
        .with_noise_seed(1);
    let (mut ctl, mut engine) = channel(&config);
    for &(id, value) in patch {
        let _ = ctl.set_param(id, value);
    }
    for &route in routes {
        let _ = ctl.set_route(route);
    }
    let _ = ctl.note_on(45, 100, 0);
    let mut warmup = vec![0.0f32; 4_096];
    engine.render(&mut warmup);
    (ctl, engine)
}

pub fn bench_voice(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voice");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === INIT PATCH ===
        // one saw through the filter, filter envelope on cutoff
        let (_ctl, mut engine) = held(size, &[], &[]);
        group.bench_with_input(BenchmarkId::new("init", size), &size, |b, _| {
            b.iter(|| engine.render(black_box(&mut buffer)))
        });

        // === FAT BASS ===
        // three detuned oscillators, pink noise, resonant filter
        let (_ctl, mut engine) = held(
            size,
            &[
                (ParamId::Osc2Level, 0.8),
                (ParamId::Osc3Level, 0.6),
                (ParamId::Osc2Waveform, 1.0),
                (ParamId::Osc3Octave, -1.0),
                (ParamId::Osc2Detune, 7.0),
                (ParamId::Osc3Detune, -5.0),
                (ParamId::NoiseLevel, 0.1),
                (ParamId::NoiseColor, 1.0),
                (ParamId::FilterCutoff, 400.0),
                (ParamId::FilterResonance, 3.2),
            ],
            &[],
        );
        group.bench_with_input(BenchmarkId::new("fat_bass", size), &size, |b, _| {
            b.iter(|| engine.render(black_box(&mut buffer)))
        });

        // === SYNC LEAD ===
        // hard sync, vibrato and tremolo from one LFO, pulse width from the other
        let (_ctl, mut engine) = held(
            size,
            &[
                (ParamId::Osc2Level, 1.0),
                (ParamId::Osc2Sync, 1.0),
                (ParamId::Osc2Interval, 7.0),
                (ParamId::Osc1Waveform, 1.0),
                (ParamId::Lfo1Shape, 1.0),
                (ParamId::Lfo1Rate, 6.0),
                (ParamId::Lfo2Rate, 0.5),
            ],
            &[
                ModulationRoute::new(ModSource::Lfo1, ModDestination::Pitch, 0.02),
                ModulationRoute::new(ModSource::Lfo2, ModDestination::PulseWidth, 0.3),
                ModulationRoute::new(ModSource::Lfo1, ModDestination::Amplitude, 0.2),
                ModulationRoute::new(ModSource::KeyTrack, ModDestination::Cutoff, 0.5),
            ],
        );
        group.bench_with_input(BenchmarkId::new("sync_lead", size), &size, |b, _| {
            b.iter(|| engine.render(black_box(&mut buffer)))
        });

        // === PARAMETER SWEEP ===
        // a new cutoff every block, so every block carries a ramp
        let (mut ctl, mut engine) = held(size, &[(ParamId::FilterResonance, 2.0)], &[]);
        let mut step = 0u32;
        group.bench_with_input(BenchmarkId::new("cutoff_sweep", size), &size, |b, _| {
            b.iter(|| {
                step = step.wrapping_add(1);
                let cutoff = 200.0 + (step % 64) as f32 * 100.0;
                let _ = ctl.set_param(ParamId::FilterCutoff, cutoff);
                engine.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
