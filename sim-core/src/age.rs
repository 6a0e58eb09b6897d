//! Simulated plant age derived from wall-clock time.
//!
//! Age is measured in "day units": 100 units correspond to one simulated
//! day. The clock only moves forward and saturates at the configured
//! maximum age.

use crate::config::AgeConfig;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Age units per simulated day.
pub const DAY_UNITS: f64 = 100.0;

const SECONDS_PER_DAY: f64 = 60.0 * 60.0 * 24.0;

/// Where the simulated age starts from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgeSeed {
    /// Age is the time elapsed since this planting timestamp.
    PlantedAt { unix_secs: u64 },
    /// Age starts at a fixed value, in day units.
    Explicit { age: f64 },
}

impl Default for AgeSeed {
    fn default() -> Self {
        AgeSeed::Explicit { age: 0.0 }
    }
}

/// Returns the (fractional) number of days from `earlier` to `later`.
///
/// A clock that moved backwards contributes zero days.
pub fn days_between(earlier: SystemTime, later: SystemTime) -> f64 {
    later
        .duration_since(earlier)
        .map(|d| d.as_secs_f64() / SECONDS_PER_DAY)
        .unwrap_or(0.0)
}

#[derive(Debug, Clone)]
pub struct AgeClock {
    simulated_age: f64,
    last_observed: SystemTime,
    max_age: f64,
    mature_age: f64,
}

impl AgeClock {
    /// Creates a clock seeded from `seed` as observed at `now`.
    ///
    /// ### Parameters
    /// - `seed` - Planting timestamp or explicit starting age.
    /// - `cfg` - Maturity and maximum age, in days.
    /// - `now` - Current wall-clock time; becomes the last observation.
    pub fn new(seed: AgeSeed, cfg: &AgeConfig, now: SystemTime) -> Self {
        let initial = match seed {
            // A timestamp past what `SystemTime` can hold is in the future.
            AgeSeed::PlantedAt { unix_secs } => UNIX_EPOCH
                .checked_add(Duration::from_secs(unix_secs))
                .map_or(0.0, |planted| days_between(planted, now) * DAY_UNITS),
            AgeSeed::Explicit { age } => age,
        };
        let max_age = cfg.max_age_days * DAY_UNITS;
        Self {
            simulated_age: initial.max(0.0).min(max_age),
            last_observed: now,
            max_age,
            mature_age: cfg.mature_age_days * DAY_UNITS,
        }
    }

    /// Moves the clock forward to `now` and returns the new age factor.
    pub fn advance(&mut self, now: SystemTime) -> f32 {
        let gained = days_between(self.last_observed, now) * DAY_UNITS;
        self.simulated_age = (self.simulated_age + gained).max(0.0).min(self.max_age);
        self.last_observed = now;
        self.age_factor()
    }

    /// Simulated age in day units.
    pub fn age(&self) -> f64 {
        self.simulated_age
    }

    pub fn days(&self) -> f64 {
        self.simulated_age / DAY_UNITS
    }

    pub fn last_observed(&self) -> SystemTime {
        self.last_observed
    }

    /// Maturity in `[0, 1]`: simulated age relative to the mature age.
    pub fn age_factor(&self) -> f32 {
        if self.mature_age <= 0.0 {
            return 1.0;
        }
        (self.simulated_age / self.mature_age).clamp(0.0, 1.0) as f32
    }
}
