use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Transistor Ladder Filter
========================

Four identical one-pole low-pass stages in series, with the output of the
last stage fed back (inverted) to the input:

          +--------------------- k * y4 ----------------------+
          |                                                   |
    x --(-)--> tanh --> [LP1] --> tanh --> [LP2] --> ... --> [LP4] --> y4

| parameter   | range               | effect                                 |
| ----------- | ------------------- | -------------------------------------- |
| cutoff      | 20 Hz .. 0.45 * sr  | where the -24 dB/octave slope begins   |
| resonance k | 0 .. 4 (.. 4.5)     | feedback gain; peak at cutoff          |
| tanh        | fixed               | transistor saturation of each stage    |


Resonance and Self-Oscillation
------------------------------

Each stage shifts phase by up to 90 degrees. Where the four stages together
reach 180 degrees the inverted feedback turns positive. With every stage
sitting at the cutoff that happens at fc, each stage has 1/sqrt(2) gain
there, and the loop gain is k / 4. At k = 4 the loop sustains itself: the
filter becomes a sine oscillator at fc. Above 4 the linear model grows
without bound; only the tanh stages keep the amplitude finite.

By default resonance is clamped to STABLE_RESONANCE_LIMIT, just below the
boundary. Enabling self-oscillation raises the ceiling to MAX_RESONANCE.


Discretization
--------------

Each stage is a trapezoidal (topology-preserving) integrator, and the
feedback loop is solved without a unit delay ("zero-delay feedback"). The
linear part of the loop is solved exactly each sample:

    y4 = (G^4 * x + S) / (1 + k * G^4)

where S collects the stage states. The trapezoidal rule maps the whole
analog s-plane into the unit circle, so the linear recurrence is stable for
any cutoff below Nyquist.


Oversampling
------------

In X2 mode the ladder runs at twice the host rate to push the harmonics
created by the tanh stages away from Nyquist before they fold. The rate
change goes through a windowed-sinc half-band filter in both directions:

    x --> [zero-stuff, half-band] --> ladder x2 --> [half-band, decimate] --> y

Half of the half-band taps are zero and the centre tap is 1/2, so each
direction costs one multiply per non-zero side tap. The passband is flat to
about 0.41 of the host rate, so the cutoff calibration below still holds
for cutoffs up to the ceiling.


Cutoff Calibration
------------------

Four stages that each sit at the cutoff would be -12 dB there, not -3 dB.
Without resonance each stage is therefore placed at

    fc / sqrt(2^(1/4) - 1)  ~=  2.299 * fc

which puts the cascade's -3 dB point at fc. That placement would move the
resonant peak up to 2.3 * fc, so the stage scale is blended back towards 1
as k rises:

    scale(k) = 1 + 1.299 * (1 - k / 4)^2

At k = 0 the -3 dB point sits at fc; from k = 4 on the stages sit at fc and
the filter peaks and self-oscillates there. The prewarped tan() makes both
hold after discretization, not just in the analog prototype.
*/

/// Resonance ceiling in normal mode, just below the self-oscillation boundary.
pub const STABLE_RESONANCE_LIMIT: f32 = 3.9;

/// Loop gain at which the linear ladder starts oscillating on its own.
pub const SELF_OSCILLATION_BOUNDARY: f32 = 4.0;

/// Resonance ceiling with self-oscillation enabled.
pub const MAX_RESONANCE: f32 = 4.5;

pub const MIN_CUTOFF_HZ: f32 = 20.0;

/// Cutoff ceiling as a fraction of the host sample rate.
pub const MAX_CUTOFF_RATIO: f32 = 0.45;

/// Any stage value beyond this is treated as divergence.
pub const DIVERGENCE_LIMIT: f32 = 16.0;

// 1 / sqrt(2^(1/4) - 1)
const STAGE_SCALE: f32 = 2.298_961;

/// Stage placement relative to the cutoff for feedback gain `k`.
fn stage_scale(k: f32) -> f32 {
    let toward_boundary = 1.0 - (k / SELF_OSCILLATION_BOUNDARY).clamp(0.0, 1.0);
    1.0 + (STAGE_SCALE - 1.0) * toward_boundary * toward_boundary
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Oversampling {
    X1,
    #[default]
    X2,
}

impl Oversampling {
    pub fn ratio(self) -> usize {
        match self {
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
        }
    }
}

// Non-zero side taps of the half-band kernel; the kernel is 2 * SIDE_TAPS - 1 long.
const SIDE_TAPS: usize = 32;
const HALF_BAND_LEN: usize = 2 * SIDE_TAPS - 1;
const HALF_BAND_CENTRE: usize = SIDE_TAPS - 1;

/// Side taps at odd offsets `2i - (SIDE_TAPS - 1)` from the centre,
/// Blackman-windowed and normalized to sum to 1/2.
fn half_band_taps() -> [f32; SIDE_TAPS] {
    let span = (HALF_BAND_LEN - 1) as f64;
    let mut taps = [0.0f64; SIDE_TAPS];
    for (i, tap) in taps.iter_mut().enumerate() {
        let offset = 2.0 * i as f64 - HALF_BAND_CENTRE as f64;
        let n = offset + HALF_BAND_CENTRE as f64;
        let window = 0.42 - 0.5 * (std::f64::consts::TAU * n / span).cos()
            + 0.08 * (2.0 * std::f64::consts::TAU * n / span).cos();
        let sinc = (std::f64::consts::FRAC_PI_2 * offset).sin() / (std::f64::consts::PI * offset);
        *tap = sinc * window;
    }
    let norm = 0.5 / taps.iter().sum::<f64>();
    taps.map(|tap| (tap * norm) as f32)
}

/// 2x up- and down-sampler around the ladder.
struct HalfBand {
    taps: [f32; SIDE_TAPS],
    input: [f32; SIDE_TAPS],     // host-rate history, newest first
    internal: [f32; HALF_BAND_LEN], // internal-rate history, newest first
}

impl HalfBand {
    fn new() -> Self {
        Self {
            taps: half_band_taps(),
            input: [0.0; SIDE_TAPS],
            internal: [0.0; HALF_BAND_LEN],
        }
    }

    /// One host sample in, two internal samples out (oldest first).
    #[inline]
    fn upsample(&mut self, x: f32) -> [f32; 2] {
        self.input.copy_within(0..SIDE_TAPS - 1, 1);
        self.input[0] = x;
        let between: f32 = self.taps.iter().zip(&self.input).map(|(h, x)| h * x).sum();
        [2.0 * between, self.input[SIDE_TAPS / 2 - 1]]
    }

    /// Two internal samples in (oldest first), one host sample out.
    #[inline]
    fn downsample(&mut self, [a, b]: [f32; 2]) -> f32 {
        self.internal.copy_within(0..HALF_BAND_LEN - 2, 2);
        self.internal[1] = a;
        self.internal[0] = b;
        let side: f32 = self
            .taps
            .iter()
            .zip(self.internal.iter().step_by(2))
            .map(|(h, v)| h * v)
            .sum();
        0.5 * self.internal[HALF_BAND_CENTRE] + side
    }

    fn clear(&mut self) {
        self.input = [0.0; SIDE_TAPS];
        self.internal = [0.0; HALF_BAND_LEN];
    }
}

pub struct LadderFilter {
    stages: [f32; 4], // trapezoidal integrator states

    cutoff_hz: f32,
    resonance: f32,
    allow_self_oscillation: bool,

    sample_rate: f32,
    oversampling: Oversampling,
    warped: f32, // tan(pi * fc / internal rate)
    gain: f32,   // per-stage G = g / (1 + g)
    half_band: HalfBand,

    resets: u32,
}

impl LadderFilter {
    pub fn new(sample_rate: f32) -> Self {
        let mut filter = Self {
            stages: [0.0; 4],
            cutoff_hz: 1_000.0,
            resonance: 0.0,
            allow_self_oscillation: false,
            sample_rate,
            oversampling: Oversampling::default(),
            warped: 0.0,
            gain: 0.0,
            half_band: HalfBand::new(),
            resets: 0,
        };
        filter.update_warp();
        filter
    }

    pub fn with_oversampling(mut self, oversampling: Oversampling) -> Self {
        self.oversampling = oversampling;
        self.update_warp();
        self
    }

    fn update_warp(&mut self) {
        let internal_rate = self.sample_rate * self.oversampling.ratio() as f32;
        self.warped = (PI * self.cutoff_hz / internal_rate).tan();
        self.update_gain();
    }

    fn update_gain(&mut self) {
        let g = self.warped * stage_scale(self.resonance);
        self.gain = g / (1.0 + g);
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        let max = (self.sample_rate * MAX_CUTOFF_RATIO).max(MIN_CUTOFF_HZ);
        let cutoff = if cutoff_hz.is_nan() {
            MIN_CUTOFF_HZ
        } else {
            cutoff_hz.clamp(MIN_CUTOFF_HZ, max)
        };
        if cutoff != self.cutoff_hz {
            self.cutoff_hz = cutoff;
            self.update_warp();
        }
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    pub fn resonance_limit(&self) -> f32 {
        if self.allow_self_oscillation {
            MAX_RESONANCE
        } else {
            STABLE_RESONANCE_LIMIT
        }
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        let resonance = if resonance.is_nan() {
            0.0
        } else {
            resonance.clamp(0.0, self.resonance_limit())
        };
        if resonance != self.resonance {
            self.resonance = resonance;
            self.update_gain();
        }
    }

    pub fn allows_self_oscillation(&self) -> bool {
        self.allow_self_oscillation
    }

    /// Switching self-oscillation off re-clamps the current resonance.
    pub fn set_self_oscillation(&mut self, allow: bool) {
        self.allow_self_oscillation = allow;
        self.set_resonance(self.resonance);
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.set_cutoff(self.cutoff_hz);
        self.update_warp();
    }

    /// Stage values, exposed for diagnostics.
    pub fn state(&self) -> [f32; 4] {
        self.stages
    }

    /// Number of safety resets since the last call.
    pub fn take_reset_count(&mut self) -> u32 {
        std::mem::take(&mut self.resets)
    }

    /// One internal-rate sample; `None` when the stages diverged and were reset.
    #[inline]
    fn step(&mut self, x: f32) -> Option<f32> {
        let g = self.gain;
        let k = self.resonance;
        let [s0, s1, s2, s3] = self.stages;

        // Solve the linear feedback loop for the predicted ladder output.
        let b = 1.0 - g;
        let g2 = g * g;
        let g4 = g2 * g2;
        let sigma = g2 * g * b * s0 + g2 * b * s1 + g * b * s2 + b * s3;
        let predicted = (g4 * x + sigma) / (1.0 + k * g4);

        let mut input = (x - k * predicted).tanh();
        let mut output: f32 = 0.0;
        for (i, s) in self.stages.iter_mut().enumerate() {
            if i > 0 {
                input = output.tanh();
            }
            let v = (input - *s) * g;
            output = v + *s;
            *s = output + v;
        }

        if self
            .stages
            .iter()
            .any(|s| !s.is_finite() || s.abs() > DIVERGENCE_LIMIT)
        {
            self.reset_after_divergence();
            return None;
        }
        Some(output)
    }

    fn reset_after_divergence(&mut self) {
        self.reset();
        self.resets = self.resets.saturating_add(1);
    }

    /// Filter one sample at the host rate.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        match self.oversampling {
            Oversampling::X1 => self.step(input).unwrap_or(0.0),
            Oversampling::X2 => {
                let [a, b] = self.half_band.upsample(input);
                let Some(a) = self.step(a) else { return 0.0 };
                let Some(b) = self.step(b) else { return 0.0 };
                self.half_band.downsample([a, b])
            }
        }
    }

    /// Filter a block in place at a fixed cutoff and resonance.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.stages = [0.0; 4];
        self.half_band.clear();
    }
}
