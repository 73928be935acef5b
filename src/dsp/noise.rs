//! White and pink noise sources.
//!
//! The generator wraps a small non-cryptographic PRNG. Seeding it makes the
//! stream reproducible, which the tests and offline renders rely on; the
//! free-running mode draws its seed from the operating system once, at
//! construction, so nothing in the audio path ever touches the OS.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseColor {
    /// Equal energy per hertz.
    #[default]
    White,
    /// Equal energy per octave (-3 dB/octave).
    Pink,
}

impl NoiseColor {
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            NoiseColor::White
        } else {
            NoiseColor::Pink
        }
    }
}

// Scales the Kellet filter sum back into roughly [-1, 1].
const PINK_GAIN: f32 = 0.11;

#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    rng: oorandom::Rand32,
    color: NoiseColor,
    pink: [f32; 7],
}

impl NoiseGenerator {
    /// Reproducible stream: the same seed always yields the same samples.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: oorandom::Rand32::new(seed),
            color: NoiseColor::White,
            pink: [0.0; 7],
        }
    }

    /// Stream seeded from the operating system's entropy source.
    pub fn free_running() -> Self {
        Self::seeded(generate_seed())
    }

    /// `Some(seed)` gives [`NoiseGenerator::seeded`], `None` gives
    /// [`NoiseGenerator::free_running`].
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::free_running(),
        }
    }

    pub fn color(&self) -> NoiseColor {
        self.color
    }

    pub fn set_color(&mut self, color: NoiseColor) {
        self.color = color;
    }

    /// Uniform white noise in [-1, 1).
    #[inline]
    pub fn next_white(&mut self) -> f32 {
        self.rng.rand_float() * 2.0 - 1.0
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let white = self.next_white();
        match self.color {
            NoiseColor::White => white,
            NoiseColor::Pink => self.pink_from(white),
        }
    }

    // Paul Kellet's refined pink filter: six leaky integrators at staggered
    // corner frequencies approximate a -3 dB/octave slope.
    #[inline]
    fn pink_from(&mut self, white: f32) -> f32 {
        let b = &mut self.pink;
        b[0] = 0.99886 * b[0] + white * 0.055_517_9;
        b[1] = 0.99332 * b[1] + white * 0.075_075_9;
        b[2] = 0.96900 * b[2] + white * 0.153_852;
        b[3] = 0.86650 * b[3] + white * 0.310_485_6;
        b[4] = 0.55000 * b[4] + white * 0.532_952_2;
        b[5] = -0.7616 * b[5] - white * 0.016_898;
        let pink = b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362;
        b[6] = white * 0.115_926;
        (pink * PINK_GAIN).clamp(-1.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.pink = [0.0; 7];
    }
}

/// Seed for free-running noise. Falls back to the wall clock if the OS
/// entropy source is unavailable.
pub fn generate_seed() -> u64 {
    let mut bytes = [0u8; 8];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes),
        Err(_) => std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5eed),
    }
}
