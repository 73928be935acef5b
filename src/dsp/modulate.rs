//! Modulation routing: sources, destinations and the matrix that joins them.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Parameter Modulation
====================

Modulation is using one signal to continuously vary a parameter of another.

Vocabulary
----------

  source        A signal doing the controlling: an envelope, one of the two
                LFOs, the note's velocity, or its position on the keyboard.

  destination   The parameter being pushed around: pitch, cutoff, resonance,
                amplitude or pulse width.

  route         One (source, destination, depth) connection.

  depth         How strongly the source moves the destination, -1.0 to +1.0.
                Negative depth inverts the source.

  offset        What the matrix hands back for a destination: a normalized
                amount the voice adds on top of the knob value.


The Math
--------

For each destination, every route into it contributes source * depth:

    offset = clamp( sum(source_i * depth_i), range.min, range.max )

The sum is plain addition, so the matrix is linear before the clamp. Routes
live in a fixed table indexed by (destination, source), and the sum always
runs over sources in the same order. Adding routes in a different order can
therefore never change the floating-point result, not even in the last bit.


Destinations
------------

| destination | offset range  | one unit means                          |
| ----------- | ------------- | --------------------------------------- |
| Pitch       | -1.0 .. 1.0   | 12 semitones (vibrato)                  |
| Cutoff      | -1.0 .. 1.0   | 6 octaves                               |
| Resonance   | -1.0 .. 1.0   | 4.0 resonance                           |
| Amplitude   | -1.0 .. 1.0   | see below (tremolo)                     |
| PulseWidth  | -0.45 .. 0.45 | pulse width shift                       |


Amplitude
---------

Amplitude never boosts. Its offset is read against the headroom, the summed
|depth| of every route into Amplitude (at most 1.0):

    gain = 1 - (headroom - offset) / 2

A bipolar source at +1 gives full gain and at -1 takes away its whole depth,
so an LFO at depth d swings the level evenly between 1 - d and 1.


Sources
-------

    FilterEnvelope, AmpEnvelope   0 .. 1
    Lfo1, Lfo2                    -1 .. 1 (already scaled by LFO depth)
    Velocity                      0 .. 1  (velocity / 127)
    KeyTrack                      (pitch - 60) / 72, so depth 1.0 into
                                  Cutoff tracks the keyboard 1:1
*/

/// Semitones covered by one unit of the key-tracking source.
pub const KEY_TRACK_SPAN: f32 = 72.0;

/// Center key of the key-tracking source.
pub const KEY_TRACK_CENTER: f32 = 60.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModSource {
    FilterEnvelope,
    AmpEnvelope,
    Lfo1,
    Lfo2,
    Velocity,
    KeyTrack,
}

impl ModSource {
    pub const COUNT: usize = 6;
    pub const ALL: [ModSource; Self::COUNT] = [
        ModSource::FilterEnvelope,
        ModSource::AmpEnvelope,
        ModSource::Lfo1,
        ModSource::Lfo2,
        ModSource::Velocity,
        ModSource::KeyTrack,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ModSource::FilterEnvelope => "filter_envelope",
            ModSource::AmpEnvelope => "amp_envelope",
            ModSource::Lfo1 => "lfo1",
            ModSource::Lfo2 => "lfo2",
            ModSource::Velocity => "velocity",
            ModSource::KeyTrack => "key_track",
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModDestination {
    Pitch,
    Cutoff,
    Resonance,
    Amplitude,
    PulseWidth,
}

impl ModDestination {
    pub const COUNT: usize = 5;
    pub const ALL: [ModDestination; Self::COUNT] = [
        ModDestination::Pitch,
        ModDestination::Cutoff,
        ModDestination::Resonance,
        ModDestination::Amplitude,
        ModDestination::PulseWidth,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Valid offset range, `(min, max)`.
    pub fn range(self) -> (f32, f32) {
        match self {
            ModDestination::Pitch => (-1.0, 1.0),
            ModDestination::Cutoff => (-1.0, 1.0),
            ModDestination::Resonance => (-1.0, 1.0),
            ModDestination::Amplitude => (-1.0, 1.0),
            ModDestination::PulseWidth => (-0.45, 0.45),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ModDestination::Pitch => "pitch",
            ModDestination::Cutoff => "cutoff",
            ModDestination::Resonance => "resonance",
            ModDestination::Amplitude => "amplitude",
            ModDestination::PulseWidth => "pulse_width",
        }
    }
}

/// Calculate the modulated parameter value: base + (modulator × depth).
#[inline]
pub fn apply_modulation(base_value: f32, modulator: f32, depth: f32) -> f32 {
    base_value + (modulator * depth)
}

/// Current value of every modulation source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModSources {
    values: [f32; ModSource::COUNT],
}

impl ModSources {
    #[inline]
    pub fn get(&self, source: ModSource) -> f32 {
        self.values[source.index()]
    }

    #[inline]
    pub fn set(&mut self, source: ModSource, value: f32) {
        self.values[source.index()] = value;
    }

    pub fn with(mut self, source: ModSource, value: f32) -> Self {
        self.set(source, value);
        self
    }
}

/// Gain factor in [0, 1] for an Amplitude offset and the summed route depth
/// behind it.
#[inline]
pub fn amplitude_gain(offset: f32, headroom: f32) -> f32 {
    (1.0 - 0.5 * (headroom.min(1.0) - offset)).clamp(0.0, 1.0)
}

/// Key-tracking source value for a note pitch.
#[inline]
pub fn key_track(pitch: f32) -> f32 {
    (pitch - KEY_TRACK_CENTER) / KEY_TRACK_SPAN
}

/// Resolved, clamped offset for every destination.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModOffsets {
    values: [f32; ModDestination::COUNT],
}

impl ModOffsets {
    #[inline]
    pub fn get(&self, destination: ModDestination) -> f32 {
        self.values[destination.index()]
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationRoute {
    pub source: ModSource,
    pub destination: ModDestination,
    pub depth: f32,
}

impl ModulationRoute {
    pub fn new(source: ModSource, destination: ModDestination, depth: f32) -> Self {
        Self {
            source,
            destination,
            depth,
        }
    }
}

/// Fixed-capacity routing table, one slot per (destination, source) pair.
#[derive(Debug, Clone, Default)]
pub struct ModulationMatrix {
    depths: [[Option<f32>; ModSource::COUNT]; ModDestination::COUNT],
}

impl ModulationMatrix {
    pub const CAPACITY: usize = ModSource::COUNT * ModDestination::COUNT;

    pub fn new() -> Self {
        Self::default()
    }

    /// The instrument's stock patch: filter envelope opens the cutoff.
    pub fn classic() -> Self {
        let mut matrix = Self::new();
        matrix.set_route(ModulationRoute::new(
            ModSource::FilterEnvelope,
            ModDestination::Cutoff,
            0.5,
        ));
        matrix
    }

    /// Insert or replace the route for this (source, destination) pair.
    /// Depth is clamped to [-1, 1].
    pub fn set_route(&mut self, route: ModulationRoute) {
        let depth = if route.depth.is_nan() {
            0.0
        } else {
            route.depth.clamp(-1.0, 1.0)
        };
        self.depths[route.destination.index()][route.source.index()] = Some(depth);
    }

    pub fn clear_route(&mut self, source: ModSource, destination: ModDestination) {
        self.depths[destination.index()][source.index()] = None;
    }

    pub fn clear(&mut self) {
        self.depths = Default::default();
    }

    pub fn route(&self, source: ModSource, destination: ModDestination) -> Option<ModulationRoute> {
        self.depths[destination.index()][source.index()]
            .map(|depth| ModulationRoute::new(source, destination, depth))
    }

    pub fn len(&self) -> usize {
        self.depths.iter().flatten().filter(|d| d.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Routes in canonical (destination, source) order.
    pub fn routes(&self) -> impl Iterator<Item = ModulationRoute> + '_ {
        ModDestination::ALL.into_iter().flat_map(move |destination| {
            ModSource::ALL
                .into_iter()
                .filter_map(move |source| self.route(source, destination))
        })
    }

    /// Summed |depth| of the routes into `destination`.
    pub fn headroom(&self, destination: ModDestination) -> f32 {
        self.depths[destination.index()]
            .iter()
            .flatten()
            .map(|depth| depth.abs())
            .sum()
    }

    /// Unclamped weighted sum for one destination.
    #[inline]
    pub fn resolve_raw(&self, destination: ModDestination, sources: &ModSources) -> f32 {
        let row = &self.depths[destination.index()];
        let mut sum = 0.0;
        for source in ModSource::ALL {
            if let Some(depth) = row[source.index()] {
                sum += sources.get(source) * depth;
            }
        }
        sum
    }

    /// Weighted sum for one destination, clamped to its range.
    #[inline]
    pub fn resolve(&self, destination: ModDestination, sources: &ModSources) -> f32 {
        let (min, max) = destination.range();
        let raw = self.resolve_raw(destination, sources);
        if raw.is_nan() {
            0.0
        } else {
            raw.clamp(min, max)
        }
    }

    pub fn resolve_all(&self, sources: &ModSources) -> ModOffsets {
        let mut offsets = ModOffsets::default();
        for destination in ModDestination::ALL {
            offsets.values[destination.index()] = self.resolve(destination, sources);
        }
        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(values: [f32; ModSource::COUNT]) -> ModSources {
        ModSource::ALL
            .into_iter()
            .zip(values)
            .fold(ModSources::default(), |s, (source, v)| s.with(source, v))
    }

    #[test]
    fn test_apply_modulation() {
        assert_eq!(apply_modulation(1000.0, 0.0, 500.0), 1000.0);
        assert_eq!(apply_modulation(1000.0, 1.0, 500.0), 1500.0);
        assert_eq!(apply_modulation(1000.0, -1.0, 500.0), 500.0);
        assert_eq!(apply_modulation(1000.0, 0.5, 500.0), 1250.0);
    }

    #[test]
    fn empty_matrix_resolves_to_zero() {
        let matrix = ModulationMatrix::new();
        let s = sources([1.0; ModSource::COUNT]);
        for destination in ModDestination::ALL {
            assert_eq!(matrix.resolve(destination, &s), 0.0);
        }
    }

    #[test]
    fn summation_is_linear_before_clamp() {
        let mut matrix = ModulationMatrix::new();
        matrix.set_route(ModulationRoute::new(ModSource::FilterEnvelope, ModDestination::Cutoff, 0.5));
        matrix.set_route(ModulationRoute::new(ModSource::Lfo1, ModDestination::Cutoff, -0.25));
        matrix.set_route(ModulationRoute::new(ModSource::KeyTrack, ModDestination::Cutoff, 1.0));

        let a = sources([0.8, 0.0, 0.4, 0.0, 0.0, 0.1]);
        let b = sources([0.2, 0.0, -0.6, 0.0, 0.0, 0.3]);
        let sum = sources([1.0, 0.0, -0.2, 0.0, 0.0, 0.4]);

        let ra = matrix.resolve_raw(ModDestination::Cutoff, &a);
        let rb = matrix.resolve_raw(ModDestination::Cutoff, &b);
        let rsum = matrix.resolve_raw(ModDestination::Cutoff, &sum);
        assert!((ra + rb - rsum).abs() < 1e-6, "{ra} + {rb} != {rsum}");

        let expected = 0.8 * 0.5 + 0.4 * -0.25 + 0.1 * 1.0;
        assert!((ra - expected).abs() < 1e-6);

        // Scaling the sources scales the result.
        let doubled = sources([1.6, 0.0, 0.8, 0.0, 0.0, 0.2]);
        let rd = matrix.resolve_raw(ModDestination::Cutoff, &doubled);
        assert!((rd - 2.0 * ra).abs() < 1e-6);
    }

    #[test]
    fn insertion_order_does_not_change_result() {
        let routes = [
            ModulationRoute::new(ModSource::FilterEnvelope, ModDestination::Pitch, 0.3),
            ModulationRoute::new(ModSource::Lfo1, ModDestination::Pitch, 0.1),
            ModulationRoute::new(ModSource::Lfo2, ModDestination::Pitch, -0.05),
            ModulationRoute::new(ModSource::Velocity, ModDestination::Pitch, -0.7),
            ModulationRoute::new(ModSource::KeyTrack, ModDestination::Pitch, 0.013),
        ];
        let s = sources([0.123, 0.0, -0.987, 0.25, 0.555, 0.333]);

        let mut forward = ModulationMatrix::new();
        routes.iter().for_each(|r| forward.set_route(*r));
        let mut backward = ModulationMatrix::new();
        routes.iter().rev().for_each(|r| backward.set_route(*r));

        let f = forward.resolve_raw(ModDestination::Pitch, &s);
        let b = backward.resolve_raw(ModDestination::Pitch, &s);
        assert_eq!(f.to_bits(), b.to_bits());
    }

    #[test]
    fn resolved_values_stay_in_range() {
        let mut matrix = ModulationMatrix::new();
        for destination in ModDestination::ALL {
            for source in ModSource::ALL {
                matrix.set_route(ModulationRoute::new(source, destination, 1.0));
            }
        }
        assert_eq!(matrix.len(), ModulationMatrix::CAPACITY);

        for value in [-5.0, -1.0, 0.0, 0.5, 1.0, 5.0] {
            let s = sources([value; ModSource::COUNT]);
            for destination in ModDestination::ALL {
                let (min, max) = destination.range();
                let resolved = matrix.resolve(destination, &s);
                assert!(
                    (min..=max).contains(&resolved),
                    "{destination:?} resolved to {resolved}"
                );
            }
        }
    }

    #[test]
    fn set_route_replaces_and_clamps() {
        let mut matrix = ModulationMatrix::new();
        matrix.set_route(ModulationRoute::new(ModSource::Lfo1, ModDestination::Amplitude, -0.2));
        matrix.set_route(ModulationRoute::new(ModSource::Lfo1, ModDestination::Amplitude, -3.0));
        assert_eq!(matrix.len(), 1);
        let route = matrix.route(ModSource::Lfo1, ModDestination::Amplitude);
        assert_eq!(route.map(|r| r.depth), Some(-1.0));

        matrix.clear_route(ModSource::Lfo1, ModDestination::Amplitude);
        assert!(matrix.is_empty());
    }

    #[test]
    fn routes_iterate_in_canonical_order() {
        let mut matrix = ModulationMatrix::new();
        matrix.set_route(ModulationRoute::new(ModSource::Lfo1, ModDestination::PulseWidth, 0.2));
        matrix.set_route(ModulationRoute::new(ModSource::Velocity, ModDestination::Pitch, 0.1));
        matrix.set_route(ModulationRoute::new(ModSource::FilterEnvelope, ModDestination::Pitch, 0.1));

        let order: Vec<_> = matrix.routes().map(|r| (r.destination, r.source)).collect();
        assert_eq!(
            order,
            vec![
                (ModDestination::Pitch, ModSource::FilterEnvelope),
                (ModDestination::Pitch, ModSource::Velocity),
                (ModDestination::PulseWidth, ModSource::Lfo1),
            ]
        );
    }

    #[test]
    fn amplitude_swings_evenly_below_full_gain() {
        let mut matrix = ModulationMatrix::new();
        matrix.set_route(ModulationRoute::new(ModSource::Lfo2, ModDestination::Amplitude, 0.6));
        let headroom = matrix.headroom(ModDestination::Amplitude);
        assert!((headroom - 0.6).abs() < 1e-6);

        let gain_for = |lfo: f32| {
            let s = ModSources::default().with(ModSource::Lfo2, lfo);
            amplitude_gain(matrix.resolve(ModDestination::Amplitude, &s), headroom)
        };
        assert!((gain_for(1.0) - 1.0).abs() < 1e-6);
        assert!((gain_for(0.0) - 0.7).abs() < 1e-6);
        assert!((gain_for(-1.0) - 0.4).abs() < 1e-6);
        // Symmetric around the midpoint.
        assert!((gain_for(0.5) - 0.7 - (0.7 - gain_for(-0.5))).abs() < 1e-6);

        // Inverted depth swaps the ends, still never above unity.
        matrix.set_route(ModulationRoute::new(ModSource::Lfo2, ModDestination::Amplitude, -0.6));
        let headroom = matrix.headroom(ModDestination::Amplitude);
        let s = ModSources::default().with(ModSource::Lfo2, -1.0);
        let top = amplitude_gain(matrix.resolve(ModDestination::Amplitude, &s), headroom);
        assert!((top - 1.0).abs() < 1e-6);
    }

    #[test]
    fn amplitude_gain_stays_in_unit_range() {
        for headroom in [0.0, 0.5, 1.0, 2.0] {
            for offset in [-1.0, -0.5, 0.0, 0.5, 1.0] {
                let gain = amplitude_gain(offset, headroom);
                assert!((0.0..=1.0).contains(&gain), "{offset} / {headroom}: {gain}");
            }
        }
        assert_eq!(amplitude_gain(0.0, 0.0), 1.0);
    }

    #[test]
    fn key_tracking_is_centered_on_middle_c() {
        assert_eq!(key_track(60.0), 0.0);
        assert!((key_track(72.0) * 6.0 - 1.0).abs() < 1e-6);
    }
}
