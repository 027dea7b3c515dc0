//! Quadrature encoder decoding
//!
//! Direction comes from the relative phase of the two lines on each clock
//! edge. Edges are accumulated and only a full `threshold` worth in one
//! direction yields a logical step, which absorbs contact noise on cheap
//! mechanical encoders.

/// Clock edges per logical step
pub const DEFAULT_STEP_THRESHOLD: u32 = 4;

/// Largest accepted threshold
pub const MAX_STEP_THRESHOLD: u32 = 64;

fn clamp_threshold(threshold: u32) -> i32 {
    // Bounded by MAX_STEP_THRESHOLD, so the cast is lossless
    threshold.clamp(1, MAX_STEP_THRESHOLD) as i32
}

#[derive(Debug, Clone)]
pub struct EncoderDecoder {
    last_clock: bool,
    last_data: bool,
    accumulator: i32,
    threshold: i32,
}

impl EncoderDecoder {
    /// Both lines idle high (pull-ups)
    pub fn new(threshold: u32) -> Self {
        Self {
            last_clock: true,
            last_data: true,
            accumulator: 0,
            threshold: clamp_threshold(threshold),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold as u32
    }

    /// Change the threshold; pending edges are dropped
    pub fn set_threshold(&mut self, threshold: u32) {
        self.threshold = clamp_threshold(threshold);
        self.accumulator = 0;
    }

    /// Feed one sample, returning -1, 0 or +1
    pub fn sample(&mut self, clock: bool, data: bool) -> i32 {
        let mut step = 0;

        if clock != self.last_clock {
            let direction = if data == clock { -1 } else { 1 };
            self.accumulator += direction;

            if self.accumulator >= self.threshold {
                step = 1;
                self.accumulator = 0;
            } else if self.accumulator <= -self.threshold {
                step = -1;
                self.accumulator = 0;
            }
        }

        self.last_clock = clock;
        self.last_data = data;
        step
    }

    /// Last (clock, data) pair seen
    pub fn last_lines(&self) -> (bool, bool) {
        (self.last_clock, self.last_data)
    }
}

impl Default for EncoderDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_THRESHOLD)
    }
}
