//! Drift-free fixed-step sample clock.
//!
//! Tick durations vary, but samples must land on exact multiples of `step`.
//! The clock accumulates real elapsed time and, on every advance, emits one
//! timestamp for each step boundary that elapsed time has reached. A tick
//! spanning several boundaries emits several samples (catch-up sampling);
//! none are skipped or repeated.

/// Catch-up sampler over real elapsed seconds.
#[derive(Debug, Clone)]
pub struct SampleClock {
    step: f64,
    elapsed: f64,
    /// Index of the next sample to emit. Its timestamp is `next_index * step`.
    next_index: u64,
}

impl SampleClock {
    pub fn new(step: f32) -> Self {
        Self {
            step: f64::from(step),
            elapsed: 0.0,
            next_index: 0,
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Timestamp of the next sample not yet emitted.
    pub fn next_sample_time(&self) -> f64 {
        self.next_index as f64 * self.step
    }

    /// Number of samples emitted so far.
    pub fn samples_emitted(&self) -> u64 {
        self.next_index
    }

    /// Whether the step can ever move the next boundary forward.
    pub fn has_valid_step(&self) -> bool {
        self.step.is_finite() && self.step > 0.0
    }

    /// Advance by `dt` seconds and return every sample timestamp now due, in
    /// increasing order. Negative `dt` is treated as zero. A clock with a
    /// non-positive or non-finite step never emits.
    pub fn advance(&mut self, dt: f64) -> Vec<f64> {
        self.elapsed += dt.max(0.0);
        let mut due = Vec::new();
        if !self.has_valid_step() {
            return due;
        }
        while self.elapsed >= self.next_sample_time() {
            due.push(self.next_sample_time());
            self.next_index += 1;
        }
        due
    }
}
