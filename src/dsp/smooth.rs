//! Block-length linear parameter ramps.
//!
//! A knob moved on the control thread lands at a block boundary. Jumping to
//! the new value there would click, so continuous parameters glide to it in
//! a straight line over the following block instead.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRamp {
    current: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl LinearRamp {
    pub fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Ramp from the current value to `target` over `samples` ticks.
    /// Zero samples jumps straight there.
    pub fn ramp_to(&mut self, target: f32, samples: u32) {
        if samples == 0 || target == self.current {
            self.jump(target);
            return;
        }
        self.target = target;
        self.step = (target - self.current) / samples as f32;
        self.remaining = samples;
    }

    pub fn jump(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.remaining = 0;
    }

    /// Advance one sample and return the new value.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.current = if self.remaining == 0 {
                self.target
            } else {
                self.current + self.step
            };
        }
        self.current
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }
}
