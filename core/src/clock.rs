//! Simulation clock: tick counter plus model time.

use crate::types::Tick;
use chrono::Duration;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STEP_SECONDS: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub current_tick:    Tick,
    pub step_seconds:    i64,
    pub elapsed_seconds: i64,
}

impl SimClock {
    pub fn new(step_seconds: i64) -> Self {
        assert!(step_seconds > 0, "step_seconds must be > 0");
        Self {
            current_tick:    0,
            step_seconds,
            elapsed_seconds: 0,
        }
    }

    /// Advance one tick. Returns the new tick number.
    pub fn advance(&mut self) -> Tick {
        self.current_tick += 1;
        self.elapsed_seconds += self.step_seconds;
        self.current_tick
    }

    pub fn model_time(&self) -> Duration {
        Duration::seconds(self.elapsed_seconds)
    }

    pub fn timedelta_per_step(&self) -> Duration {
        Duration::seconds(self.step_seconds)
    }

    /// Hour of the current model day, 0..24.
    pub fn hour_of_day(&self) -> u32 {
        let since_midnight = self.model_time().num_seconds().rem_euclid(SECONDS_PER_DAY);
        (since_midnight / 3_600) as u32
    }

    /// Fraction of a day covered by one step.
    pub fn days_per_step(&self) -> f64 {
        self.timedelta_per_step().num_seconds() as f64 / SECONDS_PER_DAY as f64
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_SECONDS)
    }
}
