//! The real-time boundary: what the audio callback calls.
//!
//! Everything reachable from [`RenderLoop::render`] is allocation-free and
//! lock-free. The loop checks its own timing against the real time the
//! request covers and reports an overrun instead of hiding it.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::{config::EngineConfig, synth::engine::VoiceEngine, MAX_BLOCK_SIZE};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// The buffer is shorter than the number of samples asked for. Nothing
    /// was rendered and no engine state changed.
    #[error("buffer holds {available} samples but {requested} were requested")]
    BufferTooSmall { requested: usize, available: usize },
    /// Rendering took longer than the audio it produced lasts. The buffer
    /// still holds valid samples.
    #[error("render took {elapsed:?}, over the {budget:?} budget")]
    DeadlineMissed { elapsed: Duration, budget: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderReport {
    pub frames: usize,
    pub elapsed: Duration,
    pub budget: Duration,
}

pub struct RenderLoop {
    engine: VoiceEngine,
    deadline_ratio: f32,
    scratch: Box<[f32]>,
}

impl RenderLoop {
    pub fn new(engine: VoiceEngine, config: &EngineConfig) -> Self {
        Self {
            engine,
            deadline_ratio: config.effective_deadline_ratio(),
            scratch: vec![0.0; MAX_BLOCK_SIZE].into_boxed_slice(),
        }
    }

    pub fn engine(&self) -> &VoiceEngine {
        &self.engine
    }

    pub fn into_engine(self) -> VoiceEngine {
        self.engine
    }

    fn budget(&self, frames: usize) -> Duration {
        let seconds = frames as f32 / self.engine.sample_rate() * self.deadline_ratio;
        // Too large to represent is as good as no deadline.
        Duration::try_from_secs_f32(seconds.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Fill exactly `count` samples of `buffer` with the mono voice.
    pub fn render(&mut self, buffer: &mut [f32], count: usize) -> Result<RenderReport, RenderError> {
        if buffer.len() < count {
            return Err(RenderError::BufferTooSmall {
                requested: count,
                available: buffer.len(),
            });
        }
        let started = Instant::now();
        self.engine.render(&mut buffer[..count]);
        self.finish(count, started)
    }

    /// Fill an interleaved device buffer, copying the mono voice into every
    /// channel.
    pub fn render_interleaved(
        &mut self,
        data: &mut [f32],
        channels: usize,
    ) -> Result<RenderReport, RenderError> {
        if channels == 0 {
            return Ok(RenderReport::default());
        }
        let started = Instant::now();
        let frames = data.len() / channels;
        let mut written = 0;
        while written < frames {
            let todo = (frames - written).min(MAX_BLOCK_SIZE);
            let block = &mut self.scratch[..todo];
            self.engine.render(block);

            let out = &mut data[written * channels..(written + todo) * channels];
            for (frame, &sample) in out.chunks_exact_mut(channels).zip(block.iter()) {
                frame.fill(sample);
            }
            written += todo;
        }
        // A trailing partial frame gets silence.
        data[frames * channels..].fill(0.0);
        self.finish(frames, started)
    }

    fn finish(&self, frames: usize, started: Instant) -> Result<RenderReport, RenderError> {
        let elapsed = started.elapsed();
        let budget = self.budget(frames);
        if elapsed > budget {
            return Err(RenderError::DeadlineMissed { elapsed, budget });
        }
        Ok(RenderReport {
            frames,
            elapsed,
            budget,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::controller::channel;

    fn render_loop(config: EngineConfig) -> (crate::synth::SynthController, RenderLoop) {
        let (ctl, engine) = channel(&config);
        (ctl, RenderLoop::new(engine, &config))
    }

    // Debug builds on a busy machine should not trip the deadline.
    fn relaxed() -> EngineConfig {
        EngineConfig::default()
            .with_noise_seed(1)
            .with_deadline_ratio(100.0)
    }

    #[test]
    fn short_buffer_is_rejected_without_rendering() {
        let (_ctl, mut rl) = render_loop(relaxed());
        let mut buffer = [0.0f32; 64];
        assert_eq!(
            rl.render(&mut buffer, 128),
            Err(RenderError::BufferTooSmall {
                requested: 128,
                available: 64
            })
        );
        assert_eq!(rl.engine().frame(), 0);
    }

    #[test]
    fn renders_exactly_count_samples() {
        let (mut ctl, mut rl) = render_loop(relaxed());
        ctl.note_on(60, 100, 0).unwrap();
        let mut buffer = [7.0f32; 600];
        let report = rl.render(&mut buffer, 500).unwrap();
        assert_eq!(report.frames, 500);
        assert_eq!(rl.engine().frame(), 500);
        assert!(buffer[500..].iter().all(|&s| s == 7.0));
    }

    #[test]
    fn longer_than_max_block_is_split() {
        let (_ctl, mut rl) = render_loop(relaxed());
        let mut buffer = vec![0.0f32; MAX_BLOCK_SIZE * 2 + 5];
        let count = buffer.len();
        rl.render(&mut buffer, count).unwrap();
        assert_eq!(rl.engine().frame(), count as u64);
    }

    #[test]
    fn interleaved_copies_mono_to_every_channel() {
        let (mut ctl, mut rl) = render_loop(relaxed());
        ctl.note_on(57, 100, 0).unwrap();
        let mut data = vec![0.0f32; 2 * 1_000];
        let report = rl.render_interleaved(&mut data, 2).unwrap();
        assert_eq!(report.frames, 1_000);
        for frame in data.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(data.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn out_of_range_settings_do_not_panic() {
        let config = EngineConfig {
            sample_rate: 40.0,
            deadline_ratio: f32::INFINITY,
            ..EngineConfig::default()
        }
        .with_noise_seed(1);
        let (mut ctl, mut rl) = render_loop(config);
        ctl.note_on(60, 100, 0).unwrap();
        let mut buffer = vec![0.0f32; 1_024];
        let report = rl.render(&mut buffer, 1_024).unwrap();
        assert!(report.budget >= Duration::from_secs(1));
        assert!(buffer.iter().all(|s| s.is_finite()));
        assert!(buffer.iter().any(|&s| s != 0.0));
        assert_eq!(rl.engine().sample_rate(), crate::config::MIN_SAMPLE_RATE);
    }

    #[test]
    fn overrun_is_reported_but_audio_is_kept() {
        let config = EngineConfig::default()
            .with_noise_seed(1)
            .with_deadline_ratio(0.0);
        let (mut ctl, mut rl) = render_loop(config);
        ctl.note_on(60, 100, 0).unwrap();
        let mut buffer = vec![0.0f32; 4_800];
        match rl.render(&mut buffer, 4_800) {
            Err(RenderError::DeadlineMissed { budget, .. }) => assert_eq!(budget, Duration::ZERO),
            other => panic!("expected a missed deadline, got {other:?}"),
        }
        assert_eq!(rl.engine().frame(), 4_800);
        assert!(buffer.iter().any(|&s| s != 0.0));

        // The next call carries on from where the last one stopped.
        let _ = rl.render(&mut buffer, 4_800);
        assert_eq!(rl.engine().frame(), 9_600);
    }
}
