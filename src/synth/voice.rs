/*
The Monophonic Voice
====================

One voice, many keys. The voice remembers every key still held, plays the
most recent one, and falls back to the previous one when it is released.

Vocabulary
----------

  note stack   Held keys in press order, newest on top. Fixed capacity; if
               more keys are held than fit, the oldest is forgotten.

  target       The pitch the voice wants to be at: the top of the stack.

  current      The pitch the voice is actually playing this sample. With no
               glide it equals the target; with glide it travels toward it.

  glide        Linear movement of `current` toward `target`, in semitones,
               taking the configured glide time for the whole interval.

  legato       A key pressed while another is held only changes pitch; the
               envelopes keep running. With legato off every new key
               retriggers them.


Last-Note Priority
------------------

    press A        stack [A]        target A   (envelopes start)
    press B        stack [A, B]     target B   (legato: pitch only)
    release B      stack [A]        target A   (glides back)
    release A      stack []         voice releases
*/

/// Keys remembered by the note stack.
pub const NOTE_STACK_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct NoteStack {
    notes: [u8; NOTE_STACK_CAPACITY],
    len: usize,
}

impl Default for NoteStack {
    fn default() -> Self {
        Self {
            notes: [0; NOTE_STACK_CAPACITY],
            len: 0,
        }
    }
}

impl NoteStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `pitch` on top. A key already held moves to the top.
    pub fn push(&mut self, pitch: u8) {
        self.remove(pitch);
        if self.len == NOTE_STACK_CAPACITY {
            self.notes.copy_within(1.., 0);
            self.len -= 1;
        }
        self.notes[self.len] = pitch;
        self.len += 1;
    }

    /// Returns true if the key was held.
    pub fn remove(&mut self, pitch: u8) -> bool {
        let found = self.as_slice().iter().position(|&n| n == pitch);
        match found {
            Some(index) => {
                self.notes.copy_within(index + 1..self.len, index);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    pub fn top(&self) -> Option<u8> {
        self.as_slice().last().copied()
    }

    pub fn contains(&self, pitch: u8) -> bool {
        self.as_slice().contains(&pitch)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.notes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// What a note event did to the voice, so the engine knows whether to
/// touch the envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateChange {
    /// First key down: start the envelopes.
    Started,
    /// Another key while one is held: pitch change only.
    Legato,
    /// Returned to a still-held key after the top one was released.
    Returned,
    /// Last key up: release the envelopes.
    Released,
    /// Nothing audible changed (e.g. releasing a key that is not on top).
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct Voice {
    stack: NoteStack,
    velocity: u8,

    current: f32, // semitones, fractional while gliding
    target: f32,
    glide_step: f32, // semitones per sample
    has_played: bool,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            stack: NoteStack::new(),
            velocity: 0,
            current: 60.0,
            target: 60.0,
            glide_step: 0.0,
            has_played: false,
        }
    }
}

impl Voice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key down. `glide_samples` is the glide time for this move.
    pub fn press(&mut self, pitch: u8, velocity: u8, glide_samples: f32) -> GateChange {
        let was_held = !self.stack.is_empty();
        self.stack.push(pitch);
        self.velocity = velocity;
        self.glide_to(pitch as f32, glide_samples);
        if was_held {
            GateChange::Legato
        } else {
            GateChange::Started
        }
    }

    /// Key up. Falls back to the next held key if the released key was on top.
    pub fn release(&mut self, pitch: u8, glide_samples: f32) -> GateChange {
        let was_top = self.stack.top() == Some(pitch);
        if !self.stack.remove(pitch) {
            return GateChange::Unchanged;
        }
        match self.stack.top() {
            None => GateChange::Released,
            Some(next) if was_top => {
                self.glide_to(next as f32, glide_samples);
                GateChange::Returned
            }
            Some(_) => GateChange::Unchanged,
        }
    }

    fn glide_to(&mut self, target: f32, glide_samples: f32) {
        self.target = target;
        if !self.has_played || glide_samples < 1.0 {
            self.current = target;
            self.glide_step = 0.0;
            self.has_played = true;
        } else {
            self.glide_step = (target - self.current).abs() / glide_samples;
        }
    }

    /// Advance glide one sample; returns the current pitch in semitones.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        if self.current != self.target {
            let delta = self.target - self.current;
            if delta.abs() <= self.glide_step || self.glide_step <= 0.0 {
                self.current = self.target;
            } else {
                self.current += self.glide_step.copysign(delta);
            }
        }
        self.current
    }

    pub fn pitch(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn is_gated(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn held(&self) -> &[u8] {
        self.stack.as_slice()
    }

    /// Forget every held key; pitch stays where it is.
    pub fn release_all(&mut self) {
        self.stack.clear();
        self.target = self.current;
        self.glide_step = 0.0;
    }
}
