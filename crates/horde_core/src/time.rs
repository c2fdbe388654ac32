//! Virtual time
//!
//! Delayed actions are timers advanced by the tick loop rather than
//! suspended tasks. `FixedStep` turns variable frame deltas into a fixed
//! cadence, `SimClock` tracks virtual elapsed time.

use serde::{Deserialize, Serialize};

/// Accumulates frame time and reports how many fixed steps elapsed
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FixedStep {
    step: f32,
    #[serde(skip)]
    accumulator: f32,
}

impl FixedStep {
    /// Create a fixed step of `step` seconds. Non-positive steps are clamped.
    pub fn new(step: f32) -> Self {
        Self {
            step: step.max(f32::EPSILON),
            accumulator: 0.0,
        }
    }

    /// Step length in seconds
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Add frame time and return the number of whole steps to run
    pub fn advance(&mut self, dt: f32) -> u32 {
        if !dt.is_finite() || dt <= 0.0 {
            return 0;
        }
        self.accumulator += dt;
        if self.accumulator < self.step {
            return 0;
        }
        let steps = (self.accumulator / self.step).floor();
        let remainder = self.accumulator - steps * self.step;
        // Rounding at huge totals can leave the remainder outside one step
        self.accumulator = if (0.0..self.step).contains(&remainder) { remainder } else { 0.0 };
        // Saturating cast
        steps as u32
    }

    /// Time accumulated toward the next step
    pub fn pending(&self) -> f32 {
        self.accumulator
    }

    /// Drop any accumulated time
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Monotonic virtual clock driven by the tick loop
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimClock {
    elapsed: f64,
    frame: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one frame of `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        if dt > 0.0 {
            self.elapsed += dt as f64;
        }
        self.frame += 1;
    }

    /// Seconds since the clock started
    pub fn now(&self) -> f64 {
        self.elapsed
    }

    /// Frames advanced so far
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_step_cadence() {
        let mut step = FixedStep::new(0.25);
        assert_eq!(step.advance(0.125), 0);
        assert_eq!(step.advance(0.125), 1);
        assert_eq!(step.advance(0.75), 3);
        assert_eq!(step.pending(), 0.0);
        assert_eq!(step.advance(-1.0), 0);
    }

    #[test]
    fn test_fixed_step_after_long_pause() {
        let mut step = FixedStep::new(0.25);
        assert_eq!(step.advance(5.0e6), 20_000_000);
        assert!(step.pending() < step.step());

        assert_eq!(step.advance(f32::MAX), u32::MAX);
        assert!(step.pending() < step.step());
        assert_eq!(step.advance(0.25), 1);
        assert_eq!(step.advance(f32::INFINITY), 0);
    }

    #[test]
    fn test_clock() {
        let mut clock = SimClock::new();
        clock.advance(0.5);
        clock.advance(0.25);
        assert_eq!(clock.now(), 0.75);
        assert_eq!(clock.frame(), 2);
    }
}
