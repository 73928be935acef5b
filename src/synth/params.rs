//! The instrument's knobs and switches.
//!
//! Every parameter is a flat `f32` with a documented range and default.
//! Values from outside are clamped on the way in, never rejected. Switches
//! and selectors are stored as whole numbers and rounded when set.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a parameter change reaches the sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Ramped linearly across the block after the change.
    Continuous,
    /// Takes effect at the next block boundary without a ramp.
    Stepped,
    /// Whole-number selector or on/off switch, applied at the block boundary.
    Discrete,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub kind: ParamKind,
}

impl ParamSpec {
    const fn new(name: &'static str, min: f32, max: f32, default: f32, kind: ParamKind) -> Self {
        Self {
            name,
            min,
            max,
            default,
            kind,
        }
    }

    /// Clamp (and round, for discrete parameters) a raw value into range.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        let value = value.clamp(self.min, self.max);
        match self.kind {
            ParamKind::Discrete => value.round(),
            _ => value,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    Osc1Level,
    Osc2Level,
    Osc3Level,
    Osc1Waveform,
    Osc2Waveform,
    Osc3Waveform,
    Osc1PulseWidth,
    Osc2PulseWidth,
    Osc3PulseWidth,
    Osc1Octave,
    Osc2Octave,
    Osc3Octave,
    Osc1Interval,
    Osc2Interval,
    Osc3Interval,
    Osc1Detune,
    Osc2Detune,
    Osc3Detune,
    Osc2Sync,
    Osc3Sync,
    NoiseLevel,
    NoiseColor,
    FilterCutoff,
    FilterResonance,
    FilterSelfOscillation,
    FilterEnvAttack,
    FilterEnvDecay,
    FilterEnvSustain,
    FilterEnvRelease,
    AmpEnvAttack,
    AmpEnvDecay,
    AmpEnvSustain,
    AmpEnvRelease,
    EnvelopeCurve,
    Lfo1Rate,
    Lfo1Depth,
    Lfo1Shape,
    Lfo1Retrigger,
    Lfo2Rate,
    Lfo2Depth,
    Lfo2Shape,
    Lfo2Retrigger,
    Glide,
    Legato,
    PitchBend,
    BendRange,
    VelocitySensitivity,
    MasterVolume,
}

use ParamKind::{Continuous, Discrete, Stepped};

const SPECS: [ParamSpec; ParamId::COUNT] = [
    ParamSpec::new("osc1_level", 0.0, 1.0, 1.0, Continuous),
    ParamSpec::new("osc2_level", 0.0, 1.0, 0.0, Continuous),
    ParamSpec::new("osc3_level", 0.0, 1.0, 0.0, Continuous),
    ParamSpec::new("osc1_waveform", 0.0, 2.0, 0.0, Discrete),
    ParamSpec::new("osc2_waveform", 0.0, 2.0, 0.0, Discrete),
    ParamSpec::new("osc3_waveform", 0.0, 2.0, 0.0, Discrete),
    ParamSpec::new("osc1_pulse_width", 0.05, 0.95, 0.5, Continuous),
    ParamSpec::new("osc2_pulse_width", 0.05, 0.95, 0.5, Continuous),
    ParamSpec::new("osc3_pulse_width", 0.05, 0.95, 0.5, Continuous),
    ParamSpec::new("osc1_octave", -2.0, 3.0, 0.0, Discrete),
    ParamSpec::new("osc2_octave", -2.0, 3.0, 0.0, Discrete),
    ParamSpec::new("osc3_octave", -2.0, 3.0, 0.0, Discrete),
    ParamSpec::new("osc1_interval", -8.0, 8.0, 0.0, Discrete),
    ParamSpec::new("osc2_interval", -8.0, 8.0, 0.0, Discrete),
    ParamSpec::new("osc3_interval", -8.0, 8.0, 0.0, Discrete),
    ParamSpec::new("osc1_detune", -100.0, 100.0, 0.0, Stepped),
    ParamSpec::new("osc2_detune", -100.0, 100.0, 0.0, Stepped),
    ParamSpec::new("osc3_detune", -100.0, 100.0, 0.0, Stepped),
    ParamSpec::new("osc2_sync", 0.0, 1.0, 0.0, Discrete),
    ParamSpec::new("osc3_sync", 0.0, 1.0, 0.0, Discrete),
    ParamSpec::new("noise_level", 0.0, 1.0, 0.0, Continuous),
    ParamSpec::new("noise_color", 0.0, 1.0, 0.0, Discrete),
    ParamSpec::new("filter_cutoff", 20.0, 20_000.0, 2_000.0, Continuous),
    ParamSpec::new("filter_resonance", 0.0, 4.5, 0.0, Continuous),
    ParamSpec::new("filter_self_oscillation", 0.0, 1.0, 0.0, Discrete),
    ParamSpec::new("filter_env_attack", 0.0, 20_000.0, 10.0, Stepped),
    ParamSpec::new("filter_env_decay", 0.0, 20_000.0, 200.0, Stepped),
    ParamSpec::new("filter_env_sustain", 0.0, 1.0, 0.5, Stepped),
    ParamSpec::new("filter_env_release", 0.0, 20_000.0, 300.0, Stepped),
    ParamSpec::new("amp_env_attack", 0.0, 20_000.0, 10.0, Stepped),
    ParamSpec::new("amp_env_decay", 0.0, 20_000.0, 100.0, Stepped),
    ParamSpec::new("amp_env_sustain", 0.0, 1.0, 0.7, Stepped),
    ParamSpec::new("amp_env_release", 0.0, 20_000.0, 300.0, Stepped),
    ParamSpec::new("envelope_curve", 0.0, 1.0, 0.0, Discrete),
    ParamSpec::new("lfo1_rate", 0.1, 20.0, 5.0, Stepped),
    ParamSpec::new("lfo1_depth", 0.0, 1.0, 1.0, Continuous),
    ParamSpec::new("lfo1_shape", 0.0, 3.0, 0.0, Discrete),
    ParamSpec::new("lfo1_retrigger", 0.0, 1.0, 0.0, Discrete),
    ParamSpec::new("lfo2_rate", 0.1, 20.0, 3.0, Stepped),
    ParamSpec::new("lfo2_depth", 0.0, 1.0, 1.0, Continuous),
    ParamSpec::new("lfo2_shape", 0.0, 3.0, 1.0, Discrete),
    ParamSpec::new("lfo2_retrigger", 0.0, 1.0, 0.0, Discrete),
    ParamSpec::new("glide", 0.0, 5_000.0, 0.0, Stepped),
    ParamSpec::new("legato", 0.0, 1.0, 1.0, Discrete),
    ParamSpec::new("pitch_bend", -1.0, 1.0, 0.0, Continuous),
    ParamSpec::new("bend_range", 0.0, 12.0, 2.0, Stepped),
    ParamSpec::new("velocity_sensitivity", 0.0, 1.0, 0.0, Stepped),
    ParamSpec::new("master_volume", 0.0, 1.0, 0.8, Continuous),
];

impl ParamId {
    pub const COUNT: usize = 48;

    pub const ALL: [ParamId; Self::COUNT] = [
        ParamId::Osc1Level,
        ParamId::Osc2Level,
        ParamId::Osc3Level,
        ParamId::Osc1Waveform,
        ParamId::Osc2Waveform,
        ParamId::Osc3Waveform,
        ParamId::Osc1PulseWidth,
        ParamId::Osc2PulseWidth,
        ParamId::Osc3PulseWidth,
        ParamId::Osc1Octave,
        ParamId::Osc2Octave,
        ParamId::Osc3Octave,
        ParamId::Osc1Interval,
        ParamId::Osc2Interval,
        ParamId::Osc3Interval,
        ParamId::Osc1Detune,
        ParamId::Osc2Detune,
        ParamId::Osc3Detune,
        ParamId::Osc2Sync,
        ParamId::Osc3Sync,
        ParamId::NoiseLevel,
        ParamId::NoiseColor,
        ParamId::FilterCutoff,
        ParamId::FilterResonance,
        ParamId::FilterSelfOscillation,
        ParamId::FilterEnvAttack,
        ParamId::FilterEnvDecay,
        ParamId::FilterEnvSustain,
        ParamId::FilterEnvRelease,
        ParamId::AmpEnvAttack,
        ParamId::AmpEnvDecay,
        ParamId::AmpEnvSustain,
        ParamId::AmpEnvRelease,
        ParamId::EnvelopeCurve,
        ParamId::Lfo1Rate,
        ParamId::Lfo1Depth,
        ParamId::Lfo1Shape,
        ParamId::Lfo1Retrigger,
        ParamId::Lfo2Rate,
        ParamId::Lfo2Depth,
        ParamId::Lfo2Shape,
        ParamId::Lfo2Retrigger,
        ParamId::Glide,
        ParamId::Legato,
        ParamId::PitchBend,
        ParamId::BendRange,
        ParamId::VelocitySensitivity,
        ParamId::MasterVolume,
    ];

    /// Per-oscillator parameters, indexed by oscillator.
    pub const LEVELS: [ParamId; 3] = [ParamId::Osc1Level, ParamId::Osc2Level, ParamId::Osc3Level];
    pub const WAVEFORMS: [ParamId; 3] = [ParamId::Osc1Waveform, ParamId::Osc2Waveform, ParamId::Osc3Waveform];
    pub const PULSE_WIDTHS: [ParamId; 3] = [
        ParamId::Osc1PulseWidth,
        ParamId::Osc2PulseWidth,
        ParamId::Osc3PulseWidth,
    ];
    pub const OCTAVES: [ParamId; 3] = [ParamId::Osc1Octave, ParamId::Osc2Octave, ParamId::Osc3Octave];
    pub const INTERVALS: [ParamId; 3] = [
        ParamId::Osc1Interval,
        ParamId::Osc2Interval,
        ParamId::Osc3Interval,
    ];
    pub const DETUNES: [ParamId; 3] = [ParamId::Osc1Detune, ParamId::Osc2Detune, ParamId::Osc3Detune];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> &'static ParamSpec {
        &SPECS[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn kind(self) -> ParamKind {
        self.spec().kind
    }

    /// Look a parameter up by its snake_case name.
    pub fn from_name(name: &str) -> Option<ParamId> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }
}

/// Current value of every parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    values: [f32; ParamId::COUNT],
}

impl Default for ParameterSet {
    fn default() -> Self {
        let mut values = [0.0; ParamId::COUNT];
        for id in ParamId::ALL {
            values[id.index()] = id.spec().default;
        }
        Self { values }
    }
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        self.values[id.index()]
    }

    /// Store a clamped value and return what was stored.
    pub fn set(&mut self, id: ParamId, value: f32) -> f32 {
        let clamped = id.spec().clamp(value);
        self.values[id.index()] = clamped;
        clamped
    }

    pub fn get_bool(&self, id: ParamId) -> bool {
        self.get(id) >= 0.5
    }

    /// Selector position; negative positions map to 0.
    pub fn get_index(&self, id: ParamId) -> usize {
        self.get(id).max(0.0) as usize
    }

    pub fn get_int(&self, id: ParamId) -> i32 {
        self.get(id) as i32
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, f32)> + '_ {
        ParamId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }
}
