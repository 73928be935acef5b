#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
ADSR Envelope Generator
=======================

The envelope shapes a value over the life of a note. The voice runs two of
them: one opens the filter, one drives the amplitude.

Vocabulary
----------

  level       The envelope's current output value (0.0 to 1.0).

  stage       Which phase of the envelope we're in: Idle, Attack, Decay,
              Sustain, or Release.

  event       Something that can move the envelope to another stage: the
              gate going high or low, or the current segment running out.

  segment     One timed ramp from a start level to a target level. Attack,
              Decay and Release are segments; Idle and Sustain just hold.

  curve       How a segment travels from start to target. Linear is a
              straight line. Exponential is the RC charge/discharge shape of
              the analog circuit, rescaled so the segment still lands exactly
              on its target when its time is up.


The State Machine
-----------------

    ┌──────┐  gate on   ┌────────┐  done   ┌───────┐  done   ┌─────────┐
    │ Idle │ ─────────→ │ Attack │ ──────→ │ Decay │ ──────→ │ Sustain │
    └──────┘            └────────┘         └───────┘         └─────────┘
        ↑                 ↑    │ gate off      │ gate off         │ gate off
        │          gate on│    ↓               ↓                  ↓
        │   done        ┌──────────────────────────────────────────────┐
        └────────────── │                   Release                    │
                        └──────────────────────────────────────────────┘

The whole table lives in `transition()`. Anything not listed there is
ignored: gate off while Idle, gate on while already attacking.


Retriggering Without Clicks
---------------------------

Every segment starts from the CURRENT level, never from zero. Gate on during
Release picks up wherever the level has fallen to and climbs again, so the
output is continuous. An attack that starts part way up only has the
remaining distance to cover, so it takes that fraction of the attack time.

Release always takes the full release time, from whatever level it began at.


Segment Math
------------

    p      = elapsed / total                   (0 → 1)
    level  = start + (target - start) * shape(p)

    Linear:       shape(p) = p
    Exponential:  shape(p) = (1 - e^(-5p)) / (1 - e^(-5))

Both shapes give shape(1) = 1, and the last sample of a segment is pinned to
the target, so Decay lands on the sustain level exactly.


Moving the Sustain Level
------------------------

A new sustain level during Decay retargets the running segment: it restarts
from the current level towards the new target over the decay time still
left. During Sustain the level glides linearly to the new value over
SUSTAIN_GLIDE_MS. Either way the output never jumps.
*/

// Steepness of the exponential curve: 5 time constants per segment.
const RC_STEEPNESS: f32 = 5.0;

/// How long a held note takes to follow a sustain change.
pub const SUSTAIN_GLIDE_MS: f32 = 5.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeCurve {
    #[default]
    Linear,
    Exponential,
}

impl EnvelopeCurve {
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            EnvelopeCurve::Linear
        } else {
            EnvelopeCurve::Exponential
        }
    }

    /// Normalized shape: 0 at p = 0, 1 at p = 1.
    #[inline]
    pub fn shape(self, p: f32) -> f32 {
        let p = p.clamp(0.0, 1.0);
        match self {
            EnvelopeCurve::Linear => p,
            EnvelopeCurve::Exponential => {
                (1.0 - (-RC_STEEPNESS * p).exp()) / (1.0 - (-RC_STEEPNESS).exp())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeEvent {
    GateOn,
    GateOff,
    /// The running segment reached its target.
    SegmentDone,
}

/// Stage transition table. `None` means the event is ignored.
pub fn transition(stage: EnvelopeStage, event: EnvelopeEvent) -> Option<EnvelopeStage> {
    use EnvelopeEvent::*;
    use EnvelopeStage::*;

    match (stage, event) {
        (Attack, GateOn) => None,
        (_, GateOn) => Some(Attack),

        (Idle | Release, GateOff) => None,
        (_, GateOff) => Some(Release),

        (Attack, SegmentDone) => Some(Decay),
        (Decay, SegmentDone) => Some(Sustain),
        (Release, SegmentDone) => Some(Idle),
        (Idle | Sustain, SegmentDone) => None,
    }
}

/// Convert a stage time in milliseconds to a whole number of samples (>= 1).
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> u32 {
    let samples = (ms.max(0.0) * 0.001 * sample_rate).round();
    if samples.is_finite() {
        samples.max(1.0) as u32
    } else {
        1
    }
}

pub struct Envelope {
    // Shape parameters
    attack_ms: f32,
    decay_ms: f32,
    sustain_level: f32,
    release_ms: f32,
    curve: EnvelopeCurve,
    sample_rate: f32,

    stage: EnvelopeStage,
    level: f32,

    // Current segment
    start: f32,
    target: f32,
    total: u32,
    elapsed: u32,
}

pub const MAX_STAGE_MS: f32 = 20_000.0;

impl Envelope {
    pub fn new(sample_rate: f32) -> Self {
        Self::adsr(sample_rate, 10.0, 100.0, 0.7, 300.0)
    }

    /// Times in milliseconds, sustain as a level.
    pub fn adsr(sample_rate: f32, attack_ms: f32, decay_ms: f32, sustain: f32, release_ms: f32) -> Self {
        let mut env = Self {
            attack_ms: 0.0,
            decay_ms: 0.0,
            sustain_level: 0.0,
            release_ms: 0.0,
            curve: EnvelopeCurve::default(),
            sample_rate,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            start: 0.0,
            target: 0.0,
            total: 1,
            elapsed: 0,
        };
        env.set_attack(attack_ms);
        env.set_decay(decay_ms);
        env.set_sustain(sustain);
        env.set_release(release_ms);
        env
    }

    pub fn with_curve(mut self, curve: EnvelopeCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn set_attack(&mut self, ms: f32) {
        self.attack_ms = clamp_time(ms);
    }

    pub fn set_decay(&mut self, ms: f32) {
        self.decay_ms = clamp_time(ms);
    }

    /// Retargets a running decay, or glides a held level to the new value.
    pub fn set_sustain(&mut self, level: f32) {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        if level == self.sustain_level {
            return;
        }
        self.sustain_level = level;
        match self.stage {
            EnvelopeStage::Decay => {
                self.total = self.total.saturating_sub(self.elapsed).max(1);
            }
            EnvelopeStage::Sustain => {
                self.total = ms_to_samples(SUSTAIN_GLIDE_MS, self.sample_rate);
            }
            _ => return,
        }
        self.start = self.level;
        self.target = level;
        self.elapsed = 0;
    }

    pub fn set_release(&mut self, ms: f32) {
        self.release_ms = clamp_time(ms);
    }

    pub fn set_curve(&mut self, curve: EnvelopeCurve) {
        self.curve = curve;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn sustain(&self) -> f32 {
        self.sustain_level
    }

    pub fn curve(&self) -> EnvelopeCurve {
        self.curve
    }

    /// Gate high: attack from the current level.
    pub fn gate_on(&mut self) {
        self.handle(EnvelopeEvent::GateOn);
    }

    /// Gate low: release from the current level.
    pub fn gate_off(&mut self) {
        self.handle(EnvelopeEvent::GateOff);
    }

    fn handle(&mut self, event: EnvelopeEvent) {
        if let Some(next) = transition(self.stage, event) {
            self.enter(next);
        }
    }

    fn enter(&mut self, stage: EnvelopeStage) {
        self.stage = stage;
        self.start = self.level;
        self.elapsed = 0;
        match stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
                self.target = 0.0;
            }
            EnvelopeStage::Attack => {
                self.target = 1.0;
                let full = ms_to_samples(self.attack_ms, self.sample_rate) as f32;
                let remaining = (1.0 - self.level).clamp(0.0, 1.0);
                self.total = (full * remaining).round().max(1.0) as u32;
            }
            EnvelopeStage::Decay => {
                self.target = self.sustain_level;
                self.total = ms_to_samples(self.decay_ms, self.sample_rate);
            }
            EnvelopeStage::Sustain => {
                self.level = self.sustain_level;
                self.target = self.sustain_level;
                self.total = 1;
                self.elapsed = 1;
            }
            EnvelopeStage::Release => {
                self.target = 0.0;
                self.total = ms_to_samples(self.release_ms, self.sample_rate);
            }
        }
    }

    /// Advance one sample and return the new level.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => self.level = 0.0,
            EnvelopeStage::Sustain if self.elapsed < self.total => {
                self.elapsed += 1;
                let p = self.elapsed as f32 / self.total as f32;
                self.level = (self.start + (self.target - self.start) * p).clamp(0.0, 1.0);
            }
            EnvelopeStage::Sustain => self.level = self.sustain_level,
            EnvelopeStage::Attack | EnvelopeStage::Decay | EnvelopeStage::Release => {
                self.elapsed = self.elapsed.saturating_add(1);
                if self.elapsed >= self.total {
                    self.level = self.target;
                    self.handle(EnvelopeEvent::SegmentDone);
                } else {
                    let p = self.elapsed as f32 / self.total as f32;
                    let shaped = self.curve.shape(p);
                    self.level = (self.start + (self.target - self.start) * shaped).clamp(0.0, 1.0);
                }
            }
        }
        self.level
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.start = 0.0;
        self.target = 0.0;
        self.elapsed = 0;
        self.total = 1;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }
}

fn clamp_time(ms: f32) -> f32 {
    if ms.is_nan() {
        0.0
    } else {
        ms.clamp(0.0, MAX_STAGE_MS)
    }
}
