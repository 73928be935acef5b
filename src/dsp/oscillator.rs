#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Band-Limited Oscillators
========================

A naive oscillator computes its waveform straight from the phase:

    saw(p)   = 2p - 1
    pulse(p) = +1 if p < width else -1
    tri(p)   = V-shaped ramp between -1 and +1

Every hard corner in those shapes contains energy at infinitely high
frequencies. Anything above Nyquist folds back into the audible band as
inharmonic "aliasing" hiss, which gets worse the higher the note.


Vocabulary
----------

  phase       Position inside one cycle, in [0, 1).

  increment   How far the phase moves each sample: frequency / sample_rate.
              Written `dt` below. One cycle takes 1/dt samples.

  step        A jump in value (saw reset, pulse edges, hard-sync reset).

  corner      A jump in slope (the two tips of the triangle).

  BLEP        Band-Limited stEP. The difference between an ideal band-limited
              step and the naive one. Adding it to the samples right around a
              step removes most of the aliasing.

  BLAMP       Band-Limited rAMP. The integral of the BLEP; the same trick for
              corners instead of steps.


PolyBLEP
--------

The ideal BLEP is a windowed sinc integral, expensive to evaluate. PolyBLEP
replaces it with a two-sample polynomial that touches only the sample just
before and the sample just after the discontinuity:

    t in [0, dt)       (just after the step)   r = 2x - x^2 - 1,  x = t/dt
    t in (1 - dt, 1)   (just before the step)  r = x^2 + 2x + 1,  x = (t-1)/dt

The polynomials are written for a step of height 2 (the saw reset), so a
step of height `h` is corrected with `h/2 * r`.


Hard Sync
---------

With sync enabled, oscillator 2 or 3 restarts its cycle whenever oscillator
1 wraps. The restart is a step of arbitrary height, so it gets the same
two-sample correction, split across the sample before the reset (applied
immediately) and the sample after (carried to the next tick).


Frequency Range
---------------

The polynomials assume dt < 0.5. Frequencies are clamped to
NYQUIST_SAFE_RATIO * sample_rate, which keeps every waveform well-formed even
when glide, bend and modulation all push upward at once.
*/

/// Highest fraction of the sample rate an oscillator is allowed to run at.
pub const NYQUIST_SAFE_RATIO: f32 = 0.45;

/// Number of oscillators in the bank.
pub const OSCILLATOR_COUNT: usize = 3;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sawtooth,
    Pulse,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 3] = [Waveform::Sawtooth, Waveform::Pulse, Waveform::Triangle];

    /// Waveform for a front-panel switch position. Out-of-range positions
    /// clamp to the nearest valid one.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Convert a (possibly fractional) MIDI pitch to frequency in Hz.
/// A4 = 440 Hz = pitch 69.
#[inline]
pub fn note_to_frequency(pitch: f32) -> f32 {
    440.0 * 2.0_f32.powf((pitch - 69.0) / 12.0)
}

/// Frequency ratio for an oscillator's octave switch, coarse interval and
/// fine detune.
#[inline]
pub fn pitch_ratio(octave: i32, interval: i32, detune_cents: f32) -> f32 {
    let semitones = (12 * octave + interval) as f32 + detune_cents / 100.0;
    2.0_f32.powf(semitones / 12.0)
}

/// Phase increment for `frequency`, clamped to `[0, NYQUIST_SAFE_RATIO]`.
/// Non-finite input yields a stopped oscillator instead of poisoning the phase.
#[inline]
pub fn phase_increment(frequency: f32, sample_rate: f32) -> f32 {
    if !frequency.is_finite() || sample_rate <= 0.0 {
        return 0.0;
    }
    (frequency / sample_rate).clamp(0.0, NYQUIST_SAFE_RATIO)
}

#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if t < dt {
        let x = t / dt;
        2.0 * x - x * x - 1.0
    } else if t > 1.0 - dt {
        let x = (t - 1.0) / dt;
        x * x + 2.0 * x + 1.0
    } else {
        0.0
    }
}

/// PolyBLEP with the post-step half suppressed. Used on the tick right after a
/// hard-sync reset, where the real step was already corrected with its own
/// height.
#[inline]
fn poly_blep_before_only(t: f32, dt: f32) -> f32 {
    if t > 1.0 - dt {
        poly_blep(t, dt)
    } else {
        0.0
    }
}

#[inline]
fn poly_blamp(t: f32, dt: f32) -> f32 {
    if t < dt {
        let x = t / dt - 1.0;
        -x * x * x / 3.0
    } else if t > 1.0 - dt {
        let x = (t - 1.0) / dt + 1.0;
        x * x * x / 3.0
    } else {
        0.0
    }
}

#[inline]
fn wrap_unit(phase: f32) -> f32 {
    phase - phase.floor()
}

/// Result of advancing one oscillator by one sample.
#[derive(Debug, Clone, Copy)]
pub struct OscTick {
    pub sample: f32,
    /// Set when the cycle restarted before the next sample: how many samples
    /// (0..1) before the next sample the restart happened.
    pub wrapped: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    phase: f32,
    waveform: Waveform,
    pulse_width: f32,
    // Post-step half of a hard-sync correction, added to the next sample.
    sync_residual: f32,
    just_synced: bool,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(Waveform::Sawtooth)
    }
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            phase: 0.0,
            waveform,
            pulse_width: 0.5,
            sync_residual: 0.0,
            just_synced: false,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn pulse_width(&self) -> f32 {
        self.pulse_width
    }

    /// Pulse width is kept away from 0 and 1, where the pulse would vanish.
    pub fn set_pulse_width(&mut self, width: f32) {
        self.pulse_width = width.clamp(0.05, 0.95);
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.sync_residual = 0.0;
        self.just_synced = false;
    }

    #[inline]
    fn naive(&self, phase: f32) -> f32 {
        match self.waveform {
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Pulse => {
                if phase < self.pulse_width {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
        }
    }

    /// Produce the sample at the current phase, then advance by `dt`.
    ///
    /// `sync` carries the master's wrap offset when hard sync is engaged.
    #[inline]
    pub fn tick(&mut self, dt: f32, sync: Option<f32>) -> OscTick {
        let t = self.phase;
        let mut sample = self.naive(t);

        // Corrections for the oscillator's own discontinuities.
        let blep: fn(f32, f32) -> f32 = if self.just_synced {
            poly_blep_before_only
        } else {
            poly_blep
        };
        if dt > 0.0 {
            match self.waveform {
                Waveform::Sawtooth => sample -= blep(t, dt),
                Waveform::Pulse => {
                    sample += blep(t, dt);
                    sample -= poly_blep(wrap_unit(t - self.pulse_width), dt);
                }
                Waveform::Triangle => {
                    let rising = if self.just_synced { 0.0 } else { poly_blamp(t, dt) };
                    sample += 4.0 * dt * (rising - poly_blamp(wrap_unit(t + 0.5), dt));
                }
            }
        }

        sample += self.sync_residual;
        self.sync_residual = 0.0;
        self.just_synced = false;

        let mut wrapped = None;
        let next = match sync {
            Some(offset) if dt > 0.0 => {
                let offset = offset.clamp(0.0, 1.0);
                let at_reset = wrap_unit(t + (1.0 - offset) * dt);
                let height = self.naive(0.0) - self.naive(at_reset);
                sample += 0.5 * height * offset * offset;
                let after = 1.0 - offset;
                self.sync_residual = -0.5 * height * after * after;
                self.just_synced = true;
                wrapped = Some(offset);
                offset * dt
            }
            _ => {
                let mut next = t + dt;
                if next >= 1.0 {
                    next -= 1.0;
                    wrapped = Some(if dt > 0.0 { next / dt } else { 0.0 });
                }
                next
            }
        };
        self.phase = next;

        OscTick { sample, wrapped }
    }
}

/// The three oscillators of the voice, with oscillator 1 as the hard-sync
/// master of oscillators 2 and 3.
#[derive(Debug, Clone)]
pub struct OscillatorBank {
    oscillators: [Oscillator; OSCILLATOR_COUNT],
    sync: [bool; OSCILLATOR_COUNT],
}

impl Default for OscillatorBank {
    fn default() -> Self {
        Self::new()
    }
}

impl OscillatorBank {
    pub fn new() -> Self {
        Self {
            oscillators: [
                Oscillator::new(Waveform::Sawtooth),
                Oscillator::new(Waveform::Sawtooth),
                Oscillator::new(Waveform::Sawtooth),
            ],
            sync: [false; OSCILLATOR_COUNT],
        }
    }

    pub fn oscillator(&self, index: usize) -> &Oscillator {
        &self.oscillators[index]
    }

    pub fn oscillator_mut(&mut self, index: usize) -> &mut Oscillator {
        &mut self.oscillators[index]
    }

    /// Enable hard sync of oscillator `index` to oscillator 1. Oscillator 1
    /// itself has no sync source, so index 0 is ignored.
    pub fn set_sync(&mut self, index: usize, enabled: bool) {
        if index > 0 && index < OSCILLATOR_COUNT {
            self.sync[index] = enabled;
        }
    }

    pub fn sync(&self, index: usize) -> bool {
        self.sync[index]
    }

    /// Advance every oscillator by one sample.
    #[inline]
    pub fn tick(&mut self, increments: [f32; OSCILLATOR_COUNT]) -> [f32; OSCILLATOR_COUNT] {
        let master = self.oscillators[0].tick(increments[0], None);
        let mut out = [master.sample, 0.0, 0.0];
        for i in 1..OSCILLATOR_COUNT {
            let sync = if self.sync[i] { master.wrapped } else { None };
            out[i] = self.oscillators[i].tick(increments[i], sync).sample;
        }
        out
    }

    pub fn reset(&mut self) {
        for osc in &mut self.oscillators {
            osc.reset();
        }
    }
}
