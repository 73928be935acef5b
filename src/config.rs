//! Engine construction settings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{dsp::filter::Oversampling, MAX_BLOCK_SIZE};

pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;
pub const MIN_SAMPLE_RATE: f32 = 8_000.0;
pub const MAX_SAMPLE_RATE: f32 = 768_000.0;

/// Ceiling for `deadline_ratio`; anything larger is no deadline at all.
pub const MAX_DEADLINE_RATIO: f32 = 1_000.0;

fn sanitize_sample_rate(sample_rate: f32) -> f32 {
    if sample_rate.is_nan() {
        DEFAULT_SAMPLE_RATE
    } else {
        sample_rate.clamp(MIN_SAMPLE_RATE, MAX_SAMPLE_RATE)
    }
}

fn sanitize_deadline_ratio(ratio: f32) -> f32 {
    if ratio.is_nan() {
        1.0
    } else {
        ratio.clamp(0.0, MAX_DEADLINE_RATIO)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Host rate in Hz, kept within `MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE`.
    pub sample_rate: f32,
    /// Samples per internal block. Parameter ramps span one block.
    pub block_size: usize,
    /// Control messages that can wait between two blocks. Also sizes the
    /// engine's list of future timestamped notes.
    pub queue_capacity: usize,
    pub report_capacity: usize,
    /// `Some` for reproducible noise, `None` to seed from the OS.
    pub noise_seed: Option<u64>,
    pub oversampling: Oversampling,
    /// Render budget as a fraction of the real time a request covers.
    pub deadline_ratio: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: 128,
            queue_capacity: 256,
            report_capacity: 64,
            noise_seed: None,
            oversampling: Oversampling::X2,
            deadline_ratio: 1.0,
        }
    }
}

impl EngineConfig {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate: sanitize_sample_rate(sample_rate),
            ..Self::default()
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sanitize_sample_rate(sample_rate);
        self
    }

    /// Clamped to `1..=MAX_BLOCK_SIZE`.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.clamp(1, MAX_BLOCK_SIZE);
        self
    }

    /// At least 2: one slot is always kept free for a stop request.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(2);
        self
    }

    pub fn with_report_capacity(mut self, capacity: usize) -> Self {
        self.report_capacity = capacity.max(1);
        self
    }

    pub fn with_noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = Some(seed);
        self
    }

    pub fn with_oversampling(mut self, oversampling: Oversampling) -> Self {
        self.oversampling = oversampling;
        self
    }

    /// Clamped to `0..=MAX_DEADLINE_RATIO`; NaN means 1.
    pub fn with_deadline_ratio(mut self, ratio: f32) -> Self {
        self.deadline_ratio = sanitize_deadline_ratio(ratio);
        self
    }

    /// Block size actually used, whatever was written into the field.
    pub fn effective_block_size(&self) -> usize {
        self.block_size.clamp(1, MAX_BLOCK_SIZE)
    }

    /// Sample rate actually used, whatever was written into the field.
    pub fn effective_sample_rate(&self) -> f32 {
        sanitize_sample_rate(self.sample_rate)
    }

    pub fn effective_deadline_ratio(&self) -> f32 {
        sanitize_deadline_ratio(self.deadline_ratio)
    }
}
