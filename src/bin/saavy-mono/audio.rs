//! Binds a `RenderLoop` to the default cpal output device.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use saavy_mono::{io::RenderLoop, synth::VoiceEngine, EngineConfig};

pub struct DeviceInfo {
    pub sample_rate: f32,
    pub channels: usize,
    pub device: cpal::Device,
    pub config: cpal::SupportedStreamConfig,
}

pub fn default_output() -> EyreResult<DeviceInfo> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    Ok(DeviceInfo {
        sample_rate: config.sample_rate().0 as f32,
        channels: config.channels() as usize,
        device,
        config,
    })
}

/// Start streaming. The returned counter tracks render overruns, which the
/// callback cannot log itself.
pub fn start_stream(
    info: DeviceInfo,
    engine: VoiceEngine,
    engine_config: &EngineConfig,
) -> EyreResult<(cpal::Stream, Arc<AtomicU32>)> {
    let overruns = Arc::new(AtomicU32::new(0));
    let overruns_cb = overruns.clone();
    let channels = info.channels;
    let mut render_loop = RenderLoop::new(engine, engine_config);

    let stream = info
        .device
        .build_output_stream(
            &info.config.into(),
            move |data: &mut [f32], _| {
                if render_loop.render_interleaved(data, channels).is_err() {
                    overruns_cb.fetch_add(1, Ordering::Relaxed);
                }
            },
            |err| tracing::error!("audio stream error: {err}"),
            None,
        )
        .wrap_err("failed to build output stream")?;

    stream.play().wrap_err("failed to start output stream")?;
    Ok((stream, overruns))
}
