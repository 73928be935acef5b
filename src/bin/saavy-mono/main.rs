//! saavy-mono - plays a short arpeggio on the default output device
//!
//! Run with: cargo run --bin saavy-mono
//! Set RUST_LOG=debug to see every engine report.

mod audio;

use std::{sync::atomic::Ordering, thread, time::Duration};

use tracing_subscriber::EnvFilter;

use saavy_mono::{
    dsp::modulate::{ModDestination, ModSource, ModulationRoute},
    io::{converter::midi_to_control, midi::MidiEvent},
    synth::{channel, ParamId, SynthController},
    EngineConfig,
};

const ARPEGGIO: [u8; 8] = [48, 55, 60, 63, 67, 63, 60, 55];
const STEP: Duration = Duration::from_millis(220);
const MIDI_CHANNEL: u8 = 0;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let device = audio::default_output()?;
    tracing::info!(
        "Audio: {} Hz, {} channels",
        device.sample_rate,
        device.channels
    );

    let config = EngineConfig::new(device.sample_rate);
    let (mut ctl, engine) = channel(&config);
    patch(&mut ctl)?;

    let (_stream, overruns) = audio::start_stream(device, engine, &config)?;

    // Played as raw MIDI bytes, the way a keyboard would send them. Each
    // round opens the filter a little further with CC 74.
    for round in 0..4u8 {
        send_midi(&mut ctl, &[0xb0 | MIDI_CHANNEL, 74, 60 + round * 12])?;
        for &pitch in &ARPEGGIO {
            send_midi(&mut ctl, &[0x90 | MIDI_CHANNEL, pitch, 90 + round * 10])?;
            thread::sleep(STEP);
            send_midi(&mut ctl, &[0x80 | MIDI_CHANNEL, pitch, 0])?;
            for report in ctl.drain_reports() {
                tracing::debug!(?report, "engine report");
            }
        }
    }

    thread::sleep(Duration::from_millis(600));
    ctl.stop()?;
    thread::sleep(Duration::from_millis(50));
    ctl.drain_reports().for_each(drop);

    let missed = overruns.load(Ordering::Relaxed);
    if missed > 0 {
        tracing::warn!(missed, "render deadline missed");
    }
    Ok(())
}

/// Decode one MIDI message and forward it, stamped to play immediately.
fn send_midi(ctl: &mut SynthController, bytes: &[u8]) -> color_eyre::Result<()> {
    let Some(event) = MidiEvent::parse(bytes) else {
        tracing::warn!(?bytes, "unparseable MIDI message");
        return Ok(());
    };
    if let Some(message) = midi_to_control(event, MIDI_CHANNEL, 0) {
        ctl.send(message)?;
    }
    Ok(())
}

/// Two slightly detuned saws an octave apart, a swept filter and a little
/// vibrato.
fn patch(ctl: &mut SynthController) -> color_eyre::Result<()> {
    let settings = [
        (ParamId::Osc1Level, 0.7),
        (ParamId::Osc2Level, 0.5),
        (ParamId::Osc2Octave, -1.0),
        (ParamId::Osc2Detune, 7.0),
        (ParamId::Osc3Waveform, 1.0),
        (ParamId::Osc3Level, 0.3),
        (ParamId::FilterCutoff, 600.0),
        (ParamId::FilterResonance, 2.5),
        (ParamId::FilterEnvDecay, 350.0),
        (ParamId::FilterEnvSustain, 0.2),
        (ParamId::AmpEnvRelease, 180.0),
        (ParamId::Glide, 40.0),
        (ParamId::Lfo1Rate, 5.5),
        (ParamId::Lfo2Rate, 2.0),
        (ParamId::VelocitySensitivity, 0.6),
    ];
    for (id, value) in settings {
        ctl.set_param(id, value)?;
    }
    ctl.set_route(ModulationRoute::new(ModSource::Lfo1, ModDestination::Pitch, 0.01))?;
    ctl.set_route(ModulationRoute::new(ModSource::Lfo2, ModDestination::Amplitude, 0.15))?;
    ctl.set_route(ModulationRoute::new(ModSource::KeyTrack, ModDestination::Cutoff, 0.5))?;
    Ok(())
}
