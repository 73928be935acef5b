//! Low Frequency Oscillator (LFO).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Low Frequency Oscillators
=========================

An LFO is an oscillator running at sub-audio rates. It makes no sound of its
own; routed through the modulation matrix it wobbles pitch (vibrato), cutoff
(filter sweeps) or amplitude (tremolo). The voice runs two of them with
independent settings, so a vibrato and a tremolo can move at different rates.

Vocabulary
----------

  control-rate    Frequencies below hearing, here 0.1 Hz to 20 Hz.

  bipolar         Output swings positive AND negative: -1.0 to +1.0. Every
                  shape here is bipolar; the route depth decides the sign of
                  the effect.

  depth           Output scale, 0.0 to 1.0. Depth 0 silences the LFO without
                  touching any routes.

  free-running    The phase keeps going between notes, so each note catches
                  the wobble at a different point. This is the default.

  retrigger       Gate on resets the phase to zero, so every note gets the
                  same modulation shape from the start.


Shapes
------

TRIANGLE   constant rate of change, starts at 0 rising.   /\/\/\
SINE       smooth, starts at 0 rising.                    ~~~~~~
SQUARE     +1 for the first half cycle, -1 for the second. _|‾|_|‾
SAMPLE & HOLD
           a new random level at the start of every cycle, held flat until
           the next one. The classic "computer bleep" modulation.

No shape here is band-limited: at 20 Hz and below the steps in SQUARE and
SAMPLE & HOLD alias nowhere near the audio band.


Random Levels
-------------

The generator hands out unipolar floats in [0, 1). Sample & hold maps each
one onto the bipolar range:

    bipolar = unipolar * 2.0 - 1.0

    unipolar  bipolar
    0.0       -1.0
    0.5        0.0
    1.0       +1.0
*/

pub const MIN_LFO_RATE: f32 = 0.1;
pub const MAX_LFO_RATE: f32 = 20.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoShape {
    #[default]
    Triangle,
    Sine,
    Square,
    SampleAndHold,
}

impl LfoShape {
    pub const ALL: [LfoShape; 4] = [
        LfoShape::Triangle,
        LfoShape::Sine,
        LfoShape::Square,
        LfoShape::SampleAndHold,
    ];

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }
}

/// Convert unipolar signal (0.0 to 1.0) to bipolar (-1.0 to +1.0).
#[inline]
pub fn unipolar_to_bipolar(unipolar: f32) -> f32 {
    (unipolar * 2.0) - 1.0
}

pub struct Lfo {
    phase: f32, // 0.0 .. 1.0
    rate_hz: f32,
    depth: f32,
    shape: LfoShape,
    retrigger: bool,
    sample_rate: f32,

    held: f32, // current sample-and-hold level
    rng: oorandom::Rand32,
}

impl Lfo {
    /// `seed` drives the sample-and-hold shape.
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        let mut rng = oorandom::Rand32::new(seed);
        let held = unipolar_to_bipolar(rng.rand_float());
        Self {
            phase: 0.0,
            rate_hz: 5.0,
            depth: 1.0,
            shape: LfoShape::default(),
            retrigger: false,
            sample_rate,
            held,
            rng,
        }
    }

    pub fn rate(&self) -> f32 {
        self.rate_hz
    }

    pub fn set_rate(&mut self, rate_hz: f32) {
        self.rate_hz = if rate_hz.is_nan() {
            MIN_LFO_RATE
        } else {
            rate_hz.clamp(MIN_LFO_RATE, MAX_LFO_RATE)
        };
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = if depth.is_nan() { 0.0 } else { depth.clamp(0.0, 1.0) };
    }

    pub fn shape(&self) -> LfoShape {
        self.shape
    }

    pub fn set_shape(&mut self, shape: LfoShape) {
        self.shape = shape;
    }

    pub fn retrigger(&self) -> bool {
        self.retrigger
    }

    pub fn set_retrigger(&mut self, retrigger: bool) {
        self.retrigger = retrigger;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Note start. Only resets the phase when retrigger is enabled.
    pub fn gate_on(&mut self) {
        if self.retrigger {
            self.phase = 0.0;
            self.held = self.draw();
        }
    }

    fn draw(&mut self) -> f32 {
        unipolar_to_bipolar(self.rng.rand_float())
    }

    #[inline]
    fn shape_at(&self, phase: f32) -> f32 {
        match self.shape {
            LfoShape::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            LfoShape::Sine => (std::f32::consts::TAU * phase).sin(),
            LfoShape::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoShape::SampleAndHold => self.held,
        }
    }

    /// Current output, then advance one sample.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let value = self.shape_at(self.phase) * self.depth;

        self.phase += self.rate_hz / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
            self.held = self.draw();
        }
        value
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    #[test]
    fn test_unipolar_to_bipolar() {
        assert_eq!(unipolar_to_bipolar(0.0), -1.0);
        assert_eq!(unipolar_to_bipolar(0.5), 0.0);
        assert_eq!(unipolar_to_bipolar(1.0), 1.0);
    }

    #[test]
    fn triangle_period_matches_rate() {
        let mut lfo = Lfo::new(SAMPLE_RATE, 1);
        lfo.set_rate(4.0);
        let samples: Vec<f32> = (0..1_100).map(|_| lfo.next_sample()).collect();

        // Upward zero crossings: one per cycle, near 250, 500, 750 and 1000.
        let crossings = samples.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count();
        assert_eq!(crossings, 4);
        assert!((samples[62] - 0.992).abs() < 0.01, "quarter-cycle peak {}", samples[62]);
    }

    #[test]
    fn output_is_scaled_by_depth() {
        for shape in LfoShape::ALL {
            let mut lfo = Lfo::new(SAMPLE_RATE, 9);
            lfo.set_shape(shape);
            lfo.set_rate(7.0);
            lfo.set_depth(0.25);
            for _ in 0..2_000 {
                let s = lfo.next_sample();
                assert!(s.abs() <= 0.25 + 1e-6, "{shape:?} produced {s}");
            }
        }
    }

    #[test]
    fn square_alternates_halves() {
        let mut lfo = Lfo::new(SAMPLE_RATE, 1);
        lfo.set_shape(LfoShape::Square);
        lfo.set_rate(1.0);
        let samples: Vec<f32> = (0..1_000).map(|_| lfo.next_sample()).collect();
        assert!(samples[1..499].iter().all(|&s| s == 1.0));
        assert!(samples[501..990].iter().all(|&s| s == -1.0));
    }

    #[test]
    fn free_running_ignores_gate() {
        let mut lfo = Lfo::new(SAMPLE_RATE, 1);
        lfo.set_rate(2.0);
        for _ in 0..100 {
            lfo.next_sample();
        }
        let phase = lfo.phase();
        lfo.gate_on();
        assert_eq!(lfo.phase(), phase);

        lfo.set_retrigger(true);
        lfo.gate_on();
        assert_eq!(lfo.phase(), 0.0);
    }

    #[test]
    fn sample_and_hold_steps_once_per_cycle() {
        let mut lfo = Lfo::new(SAMPLE_RATE, 77);
        lfo.set_shape(LfoShape::SampleAndHold);
        lfo.set_rate(2.0);
        let samples: Vec<f32> = (0..1_000).map(|_| lfo.next_sample()).collect();

        let changes = samples.windows(2).filter(|w| w[0] != w[1]).count();
        assert!(changes <= 2, "{changes} changes in one second at 2 Hz");
        assert!(samples[..500].iter().all(|&s| s == samples[0]));

        let mut again = Lfo::new(SAMPLE_RATE, 77);
        again.set_shape(LfoShape::SampleAndHold);
        again.set_rate(2.0);
        assert!(samples.iter().all(|&s| s == again.next_sample()));
    }

    #[test]
    fn rate_and_depth_are_clamped() {
        let mut lfo = Lfo::new(SAMPLE_RATE, 1);
        lfo.set_rate(100.0);
        assert_eq!(lfo.rate(), MAX_LFO_RATE);
        lfo.set_rate(0.0);
        assert_eq!(lfo.rate(), MIN_LFO_RATE);
        lfo.set_depth(3.0);
        assert_eq!(lfo.depth(), 1.0);
        lfo.set_depth(f32::NAN);
        assert_eq!(lfo.depth(), 0.0);
    }
}
