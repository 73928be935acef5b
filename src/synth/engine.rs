/*
The Voice Engine
================

The engine owns everything that makes sound and runs on the audio thread.
Nothing in here allocates, locks or logs after construction.

Per Block
---------

    1. drain the control queue
         notes      → pending list, sorted by timestamp
         parameters → parameter set
         routes     → modulation matrix
         stop       → hard reset
    2. apply parameters
         continuous → ramp from old to new value across this block
         stepped    → take the new value now
    3. walk the block sample by sample, applying each pending note at the
       sample its timestamp names

Per Sample
----------

    glide ─→ pitch ─┐
    filter env ─┐   │
    amp env ────┤   │
    lfo 1, 2 ───┼─→ matrix ─→ offsets
    velocity ───┤            │
    key track ──┘            ↓
           oscillators → mixer → ladder filter → × amp env × gain → out


Modulation Scaling
------------------

The matrix returns normalized offsets. The engine turns them into units:

    pitch      offset × 12 semitones
    cutoff     base × 2^(offset × 6)
    resonance  base + offset × 4
    amplitude  gain × (1 - (headroom - offset) / 2)
    pulse wdth base + offset
*/

use std::collections::VecDeque;

use rtrb::{Consumer, Producer};

use crate::{
    config::EngineConfig,
    dsp::{
        envelope::{Envelope, EnvelopeCurve, EnvelopeStage},
        filter::LadderFilter,
        lfo::{Lfo, LfoShape},
        mix::{MixLevels, Mixer},
        modulate::{
            amplitude_gain, apply_modulation, key_track, ModDestination, ModSource, ModSources,
            ModulationMatrix,
        },
        noise::{generate_seed, NoiseColor, NoiseGenerator},
        oscillator::{
            note_to_frequency, phase_increment, pitch_ratio, OscillatorBank, Waveform,
            OSCILLATOR_COUNT,
        },
        smooth::LinearRamp,
    },
    synth::{
        message::{ControlMessage, EngineReport, NoteEvent, MIDI_MAX},
        params::{ParamId, ParameterSet},
        voice::{GateChange, Voice},
    },
};

pub const PITCH_MOD_SEMITONES: f32 = 12.0;
pub const CUTOFF_MOD_OCTAVES: f32 = 6.0;
pub const RESONANCE_MOD_SCALE: f32 = 4.0;

// Keep the LFOs' sample-and-hold streams apart from the noise stream.
const LFO_SEED_SALTS: [u64; 2] = [0x9e37_79b9_7f4a_7c15, 0xc2b2_ae3d_27d4_eb4f];

/// Velocity-sensitivity gain: `1 - s + s * velocity / 127`.
#[inline]
pub fn velocity_gain(velocity: u8, sensitivity: f32) -> f32 {
    let v = velocity.min(MIDI_MAX) as f32 / MIDI_MAX as f32;
    1.0 - sensitivity + sensitivity * v
}

struct Ramps {
    levels: [LinearRamp; OSCILLATOR_COUNT],
    noise: LinearRamp,
    pulse_widths: [LinearRamp; OSCILLATOR_COUNT],
    cutoff: LinearRamp,
    resonance: LinearRamp,
    lfo_depths: [LinearRamp; 2],
    bend: LinearRamp,
    volume: LinearRamp,
}

impl Ramps {
    fn new(params: &ParameterSet) -> Self {
        let ramp = |id: ParamId| LinearRamp::new(params.get(id));
        Self {
            levels: ParamId::LEVELS.map(ramp),
            noise: ramp(ParamId::NoiseLevel),
            pulse_widths: ParamId::PULSE_WIDTHS.map(ramp),
            cutoff: ramp(ParamId::FilterCutoff),
            resonance: ramp(ParamId::FilterResonance),
            lfo_depths: LfoParams::ALL.map(|ids| ramp(ids.depth)),
            bend: ramp(ParamId::PitchBend),
            volume: ramp(ParamId::MasterVolume),
        }
    }

    fn retarget(&mut self, params: &ParameterSet, samples: u32) {
        for i in 0..OSCILLATOR_COUNT {
            self.levels[i].ramp_to(params.get(ParamId::LEVELS[i]), samples);
            self.pulse_widths[i].ramp_to(params.get(ParamId::PULSE_WIDTHS[i]), samples);
        }
        self.noise.ramp_to(params.get(ParamId::NoiseLevel), samples);
        self.cutoff.ramp_to(params.get(ParamId::FilterCutoff), samples);
        self.resonance.ramp_to(params.get(ParamId::FilterResonance), samples);
        for (ramp, ids) in self.lfo_depths.iter_mut().zip(LfoParams::ALL) {
            ramp.ramp_to(params.get(ids.depth), samples);
        }
        self.bend.ramp_to(params.get(ParamId::PitchBend), samples);
        self.volume.ramp_to(params.get(ParamId::MasterVolume), samples);
    }
}

/// Parameter ids driving one LFO.
#[derive(Clone, Copy)]
struct LfoParams {
    rate: ParamId,
    depth: ParamId,
    shape: ParamId,
    retrigger: ParamId,
}

impl LfoParams {
    const ALL: [LfoParams; 2] = [
        LfoParams {
            rate: ParamId::Lfo1Rate,
            depth: ParamId::Lfo1Depth,
            shape: ParamId::Lfo1Shape,
            retrigger: ParamId::Lfo1Retrigger,
        },
        LfoParams {
            rate: ParamId::Lfo2Rate,
            depth: ParamId::Lfo2Depth,
            shape: ParamId::Lfo2Shape,
            retrigger: ParamId::Lfo2Retrigger,
        },
    ];
}

pub struct VoiceEngine {
    sample_rate: f32,
    block_size: usize,

    params: ParameterSet,
    ramps: Ramps,
    matrix: ModulationMatrix,

    voice: Voice,
    bank: OscillatorBank,
    noise: NoiseGenerator,
    mixer: Mixer,
    filter: LadderFilter,
    filter_env: Envelope,
    amp_env: Envelope,
    lfos: [Lfo; 2],

    // Resolved once per block
    ratios: [f32; OSCILLATOR_COUNT],
    glide_samples: f32,
    bend_range: f32,
    velocity_sensitivity: f32,
    legato: bool,
    amp_headroom: f32,

    // Sorted by timestamp; never grows past `pending_limit`.
    pending: VecDeque<NoteEvent>,
    pending_limit: usize,
    frame: u64,

    rx: Consumer<ControlMessage>,
    reports: Producer<EngineReport>,
}

impl VoiceEngine {
    pub(crate) fn new(
        config: &EngineConfig,
        rx: Consumer<ControlMessage>,
        reports: Producer<EngineReport>,
    ) -> Self {
        let sample_rate = config.effective_sample_rate();
        let params = ParameterSet::new();
        let lfos = LFO_SEED_SALTS.map(|salt| {
            let seed = config
                .noise_seed
                .map(|seed| seed ^ salt)
                .unwrap_or_else(generate_seed);
            Lfo::new(sample_rate, seed)
        });
        let pending_limit = config.queue_capacity.max(2);

        let mut engine = Self {
            sample_rate,
            block_size: config.effective_block_size(),
            ramps: Ramps::new(&params),
            params,
            matrix: ModulationMatrix::classic(),
            voice: Voice::new(),
            bank: OscillatorBank::new(),
            noise: NoiseGenerator::from_seed(config.noise_seed),
            mixer: Mixer::default(),
            filter: LadderFilter::new(sample_rate).with_oversampling(config.oversampling),
            filter_env: Envelope::new(sample_rate),
            amp_env: Envelope::new(sample_rate),
            lfos,
            ratios: [1.0; OSCILLATOR_COUNT],
            glide_samples: 0.0,
            bend_range: 0.0,
            velocity_sensitivity: 0.0,
            legato: true,
            amp_headroom: 0.0,
            pending: VecDeque::with_capacity(pending_limit),
            pending_limit,
            frame: 0,
            rx,
            reports,
        };
        engine.apply_params(0);
        engine
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Frames rendered so far. Note timestamps count in the same frames.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn matrix(&self) -> &ModulationMatrix {
        &self.matrix
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    pub fn amp_stage(&self) -> EnvelopeStage {
        self.amp_env.stage()
    }

    pub fn filter_stage(&self) -> EnvelopeStage {
        self.filter_env.stage()
    }

    pub fn pending_notes(&self) -> usize {
        self.pending.len()
    }

    /// True while the amplitude envelope is producing sound.
    pub fn is_sounding(&self) -> bool {
        self.amp_env.is_active()
    }

    /// Render `out.len()` samples, split into internal blocks.
    pub fn render(&mut self, out: &mut [f32]) {
        for block in out.chunks_mut(self.block_size) {
            self.render_block(block);
        }
    }

    fn render_block(&mut self, out: &mut [f32]) {
        self.drain_messages();
        let len = out.len();
        self.apply_params(len as u32);

        let block_start = self.frame;
        let mut offset = 0;
        while offset < len {
            let now = block_start + offset as u64;
            while let Some(&event) = self.pending.front() {
                if event.timestamp > now {
                    break;
                }
                self.pending.pop_front();
                self.apply_note(event);
            }

            let end = match self.pending.front() {
                Some(event) => ((event.timestamp - block_start) as usize).min(len),
                None => len,
            };
            for sample in &mut out[offset..end] {
                *sample = self.next_sample();
            }
            offset = end;
        }
        self.frame += len as u64;

        let resets = self.filter.take_reset_count();
        if resets > 0 {
            self.report(EngineReport::FilterReset {
                count: resets,
                frame: block_start,
            });
        }
    }

    fn drain_messages(&mut self) {
        while let Ok(message) = self.rx.pop() {
            match message {
                ControlMessage::Note(event) => self.schedule(event),
                ControlMessage::SetParam { id, value } => {
                    self.params.set(id, value);
                }
                ControlMessage::SetRoute(route) => self.matrix.set_route(route),
                ControlMessage::ClearRoute {
                    source,
                    destination,
                } => self.matrix.clear_route(source, destination),
                ControlMessage::AllNotesOff => self.all_notes_off(),
                ControlMessage::Stop => self.stop(),
            }
        }
    }

    fn schedule(&mut self, event: NoteEvent) {
        if self.pending.len() >= self.pending_limit {
            self.report(EngineReport::NoteDropped {
                pitch: event.pitch,
                frame: self.frame,
            });
            return;
        }
        // After any event with the same timestamp, so arrival order holds.
        let index = self
            .pending
            .partition_point(|queued| queued.timestamp <= event.timestamp);
        self.pending.insert(index, event);
    }

    fn apply_note(&mut self, event: NoteEvent) {
        if event.gate_on {
            let change = self.voice.press(event.pitch, event.velocity, self.glide_samples);
            if change == GateChange::Started || !self.legato {
                self.trigger();
            }
        } else {
            match self.voice.release(event.pitch, self.glide_samples) {
                GateChange::Released => {
                    self.filter_env.gate_off();
                    self.amp_env.gate_off();
                }
                GateChange::Returned if !self.legato => self.trigger(),
                _ => {}
            }
        }
    }

    fn trigger(&mut self) {
        self.filter_env.gate_on();
        self.amp_env.gate_on();
        for lfo in &mut self.lfos {
            lfo.gate_on();
        }
    }

    fn all_notes_off(&mut self) {
        self.pending.clear();
        self.voice.release_all();
        self.filter_env.gate_off();
        self.amp_env.gate_off();
    }

    fn stop(&mut self) {
        self.pending.clear();
        self.voice.release_all();
        self.filter_env.reset();
        self.amp_env.reset();
        self.filter.reset();
        self.report(EngineReport::Stopped { frame: self.frame });
    }

    fn report(&mut self, report: EngineReport) {
        // Best effort: a full report queue drops the report.
        let _ = self.reports.push(report);
    }

    fn apply_params(&mut self, block_len: u32) {
        let p = &self.params;
        self.ramps.retarget(p, block_len);

        for i in 0..OSCILLATOR_COUNT {
            self.ratios[i] = pitch_ratio(
                p.get_int(ParamId::OCTAVES[i]),
                p.get_int(ParamId::INTERVALS[i]),
                p.get(ParamId::DETUNES[i]),
            );
            let waveform = Waveform::from_index(p.get_index(ParamId::WAVEFORMS[i]));
            self.bank.oscillator_mut(i).set_waveform(waveform);
        }
        self.bank.set_sync(1, p.get_bool(ParamId::Osc2Sync));
        self.bank.set_sync(2, p.get_bool(ParamId::Osc3Sync));
        self.noise
            .set_color(NoiseColor::from_index(p.get_index(ParamId::NoiseColor)));

        self.filter
            .set_self_oscillation(p.get_bool(ParamId::FilterSelfOscillation));

        let curve = EnvelopeCurve::from_index(p.get_index(ParamId::EnvelopeCurve));
        let envelopes = [
            (
                &mut self.filter_env,
                [
                    ParamId::FilterEnvAttack,
                    ParamId::FilterEnvDecay,
                    ParamId::FilterEnvSustain,
                    ParamId::FilterEnvRelease,
                ],
            ),
            (
                &mut self.amp_env,
                [
                    ParamId::AmpEnvAttack,
                    ParamId::AmpEnvDecay,
                    ParamId::AmpEnvSustain,
                    ParamId::AmpEnvRelease,
                ],
            ),
        ];
        for (env, [attack, decay, sustain, release]) in envelopes {
            env.set_attack(p.get(attack));
            env.set_decay(p.get(decay));
            env.set_sustain(p.get(sustain));
            env.set_release(p.get(release));
            env.set_curve(curve);
        }

        for (lfo, ids) in self.lfos.iter_mut().zip(LfoParams::ALL) {
            lfo.set_rate(p.get(ids.rate));
            lfo.set_shape(LfoShape::from_index(p.get_index(ids.shape)));
            lfo.set_retrigger(p.get_bool(ids.retrigger));
        }
        self.amp_headroom = self.matrix.headroom(ModDestination::Amplitude);

        self.glide_samples = p.get(ParamId::Glide) * 0.001 * self.sample_rate;
        self.bend_range = p.get(ParamId::BendRange);
        self.velocity_sensitivity = p.get(ParamId::VelocitySensitivity);
        self.legato = p.get_bool(ParamId::Legato);
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        let pitch = self.voice.tick();
        let velocity = self.voice.velocity();

        // Modulation sources
        let filter_level = self.filter_env.next_sample();
        let amp_level = self.amp_env.next_sample();
        let mut lfo = [0.0; 2];
        for (i, out) in lfo.iter_mut().enumerate() {
            self.lfos[i].set_depth(self.ramps.lfo_depths[i].tick());
            *out = self.lfos[i].next_sample();
        }

        let mut sources = ModSources::default();
        sources.set(ModSource::FilterEnvelope, filter_level);
        sources.set(ModSource::AmpEnvelope, amp_level);
        sources.set(ModSource::Lfo1, lfo[0]);
        sources.set(ModSource::Lfo2, lfo[1]);
        sources.set(ModSource::Velocity, velocity as f32 / MIDI_MAX as f32);
        sources.set(ModSource::KeyTrack, key_track(pitch));
        let offsets = self.matrix.resolve_all(&sources);

        // Oscillators
        let bend = self.ramps.bend.tick() * self.bend_range;
        let note = apply_modulation(
            pitch + bend,
            offsets.get(ModDestination::Pitch),
            PITCH_MOD_SEMITONES,
        );
        let frequency = note_to_frequency(note);
        let mut increments = [0.0; OSCILLATOR_COUNT];
        let width_offset = offsets.get(ModDestination::PulseWidth);
        for (i, increment) in increments.iter_mut().enumerate() {
            *increment = phase_increment(frequency * self.ratios[i], self.sample_rate);
            let width = self.ramps.pulse_widths[i].tick() + width_offset;
            self.bank.oscillator_mut(i).set_pulse_width(width);
        }
        let oscillators = self.bank.tick(increments);

        // Mixer
        self.mixer.set_levels(MixLevels {
            oscillators: [
                self.ramps.levels[0].tick(),
                self.ramps.levels[1].tick(),
                self.ramps.levels[2].tick(),
            ],
            noise: self.ramps.noise.tick(),
        });
        let mixed = self.mixer.mix(oscillators, self.noise.next_sample());

        // Filter
        let cutoff = self.ramps.cutoff.tick()
            * (offsets.get(ModDestination::Cutoff) * CUTOFF_MOD_OCTAVES).exp2();
        self.filter.set_cutoff(cutoff);
        self.filter.set_resonance(apply_modulation(
            self.ramps.resonance.tick(),
            offsets.get(ModDestination::Resonance),
            RESONANCE_MOD_SCALE,
        ));
        let filtered = self.filter.process(mixed);

        // Amplifier
        let gain = amp_level
            * amplitude_gain(offsets.get(ModDestination::Amplitude), self.amp_headroom)
            * velocity_gain(velocity, self.velocity_sensitivity)
            * self.ramps.volume.tick();
        filtered * gain
    }
}
