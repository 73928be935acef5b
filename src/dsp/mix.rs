//! Oscillator and noise mixing with a soft-clipping output stage.

/*
The Mixer
=========

Before the filter sits a plain summing mixer: three oscillators plus noise,
each with its own level knob.

Vocabulary
----------

  level         Per-input gain, 0.0 (off) to 1.0 (full). Out-of-range values
                are clamped, never rejected.

  raw sum       The weighted sum of all inputs before any limiting. With
                every level at 1.0 and all sources in phase it reaches 4.0.

  knee          The point where the soft clipper starts bending the signal.
                Below the knee the mixer is perfectly linear.

  bound         The absolute maximum the mixer will ever emit (1.0).


Clipping Risk
-------------

Unlike a crossfade, the weights here do NOT sum to 1.0. Four full-scale
sources in phase produce 4.0:

    osc1:   [ 1.0,  0.5, -0.5, -1.0]
    osc2:   [ 1.0,  0.8,  0.2, -0.5]
    osc3:   [ 1.0,  0.9,  0.0, -0.9]
    noise:  [ 0.3, -0.1,  0.4,  0.2]
    sum:    [ 3.3,  2.1,  0.1, -2.2]  <- far outside +-1.0

Overdriving the mixer into the filter is a classic trick on the original
hardware, so instead of scaling everything down we bend the peaks:

    |x| <= knee   y = x
    |x| >  knee   y = sign(x) * (knee + (1 - knee) * tanh((|x| - knee) / (1 - knee)))

Both value and slope are continuous at the knee, and because tanh < 1 the
output approaches the bound without ever reaching it.
*/

/// Absolute bound of the mixer output.
pub const MIXER_CLIP_BOUND: f32 = 1.0;

/// Soft clipper knee. Samples inside +-SOFT_CLIP_KNEE pass unchanged.
pub const SOFT_CLIP_KNEE: f32 = 0.8;

/// Soft-clip a sample into `(-MIXER_CLIP_BOUND, MIXER_CLIP_BOUND)`.
#[inline]
pub fn soft_clip(sample: f32) -> f32 {
    let magnitude = sample.abs();
    if magnitude <= SOFT_CLIP_KNEE {
        return sample;
    }
    if magnitude.is_nan() {
        return 0.0;
    }
    let headroom = MIXER_CLIP_BOUND - SOFT_CLIP_KNEE;
    let bent = SOFT_CLIP_KNEE + headroom * ((magnitude - SOFT_CLIP_KNEE) / headroom).tanh();
    bent.min(MIXER_CLIP_BOUND).copysign(sample)
}

/// Input levels of the mixer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixLevels {
    pub oscillators: [f32; 3],
    pub noise: f32,
}

impl Default for MixLevels {
    fn default() -> Self {
        Self {
            oscillators: [1.0, 0.0, 0.0],
            noise: 0.0,
        }
    }
}

impl MixLevels {
    /// Copy with every level clamped to [0, 1].
    pub fn clamped(self) -> Self {
        let clamp = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self {
            oscillators: self.oscillators.map(clamp),
            noise: clamp(self.noise),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mixer {
    levels: MixLevels,
}

impl Mixer {
    pub fn new(levels: MixLevels) -> Self {
        Self {
            levels: levels.clamped(),
        }
    }

    pub fn levels(&self) -> MixLevels {
        self.levels
    }

    pub fn set_levels(&mut self, levels: MixLevels) {
        self.levels = levels.clamped();
    }

    /// Weighted sum before clipping.
    #[inline]
    pub fn raw_sum(&self, oscillators: [f32; 3], noise: f32) -> f32 {
        let l = &self.levels;
        oscillators[0] * l.oscillators[0]
            + oscillators[1] * l.oscillators[1]
            + oscillators[2] * l.oscillators[2]
            + noise * l.noise
    }

    /// Mix one frame of oscillator and noise samples.
    #[inline]
    pub fn mix(&self, oscillators: [f32; 3], noise: f32) -> f32 {
        soft_clip(self.raw_sum(oscillators, noise))
    }
}
