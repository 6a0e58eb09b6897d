//! Per-tick gate deciding whether a growth event fires.
//!
//! The scheduler counts ticks until an age-dependent threshold is reached,
//! then evaluates a growth probability built from the smoothed moisture
//! reading, the age factor and the current leaf count.

use crate::config::{FactorCombination, MoistureBand, SchedulerConfig};
use rand::Rng;
use tracing::trace;

/// Maps a smoothed moisture reading onto `[0, 1]`.
///
/// Readings outside the safe band return exactly `0.0` (drought or
/// waterlogging), regardless of where they fall in the mapping range.
pub fn moisture_factor(smoothed: f32, band: &MoistureBand) -> f32 {
    if !band.contains(smoothed) {
        return 0.0;
    }
    ((smoothed - band.map_low) / (band.map_high - band.map_low)).clamp(0.0, 1.0)
}

/// Probability that an evaluation fires.
///
/// ### Parameters
/// - `smoothed` - Smoothed moisture reading.
/// - `age_factor` - Maturity in `[0, 1]`.
/// - `leaf_count` - Leaves currently on the plant; each adds
///   `cfg.leaf_bonus`.
/// - `cfg` - Gate constants.
///
/// ### Returns
/// A probability in `[0, cfg.max_probability]`; always `0.0` when the
/// reading is outside the safe band.
pub fn growth_probability(smoothed: f32, age_factor: f32, leaf_count: usize, cfg: &SchedulerConfig) -> f32 {
    if !cfg.moisture.contains(smoothed) {
        return 0.0;
    }
    let moisture = moisture_factor(smoothed, &cfg.moisture);
    let age_modifier = *cfg.age_modifier.select(age_factor);
    let base = match cfg.combination {
        FactorCombination::Multiplicative => moisture * cfg.base_rate * age_modifier,
        FactorCombination::Additive => cfg.base_rate * (moisture + age_modifier) * 0.5,
    };
    (base + leaf_count as f32 * cfg.leaf_bonus).clamp(0.0, cfg.max_probability)
}

/// One Bernoulli trial of the growth gate.
pub fn should_grow(
    smoothed: f32,
    age_factor: f32,
    leaf_count: usize,
    cfg: &SchedulerConfig,
    rng: &mut impl Rng,
) -> bool {
    let p = growth_probability(smoothed, age_factor, leaf_count, cfg);
    p > 0.0 && rng.random_bool(f64::from(p.min(1.0)))
}

/// Readings the gate needs from the rest of the simulation.
#[derive(Debug, Clone, Copy)]
pub struct GateInputs {
    pub moisture: f32,
    pub age_factor: f32,
    pub leaf_count: usize,
    pub segment_count: usize,
    /// Age-capped segment maximum.
    pub max_segments: usize,
}

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// Auto growth is disabled; the counter did not move.
    Paused,
    /// Threshold not reached yet.
    Counting,
    /// Threshold reached, but the Bernoulli trial failed.
    Rejected { probability: f32 },
    /// The trial passed but the plant is at its segment cap.
    CapacityReached,
    /// A growth event should be applied this tick.
    Fire { probability: f32 },
}

impl GateDecision {
    /// `true` for every decision that consumed a threshold crossing.
    pub fn evaluated(&self) -> bool {
        !matches!(self, GateDecision::Paused | GateDecision::Counting)
    }

    pub fn fires(&self) -> bool {
        matches!(self, GateDecision::Fire { .. })
    }
}

#[derive(Debug, Clone)]
pub struct GrowthScheduler {
    counter: u32,
    auto_growth: bool,
}

impl GrowthScheduler {
    pub fn new(auto_growth: bool) -> Self {
        Self {
            counter: 0,
            auto_growth,
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn auto_growth(&self) -> bool {
        self.auto_growth
    }

    /// Pauses or resumes counting. The counter is kept as-is.
    pub fn set_auto_growth(&mut self, enabled: bool) {
        self.auto_growth = enabled;
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }

    /// Advances the scheduler by one tick.
    ///
    /// Increments the counter; once it reaches the threshold for the
    /// current age the counter is reset and the gate is evaluated. A
    /// passing gate is still downgraded to [`GateDecision::CapacityReached`]
    /// when `inputs.segment_count` is already at `inputs.max_segments`.
    ///
    /// ### Parameters
    /// - `inputs` - Current moisture, age and plant size.
    /// - `cfg` - Gate constants and threshold table.
    /// - `rng` - The simulation's random source.
    ///
    /// ### Returns
    /// The [`GateDecision`] for this tick.
    pub fn evaluate(&mut self, inputs: &GateInputs, cfg: &SchedulerConfig, rng: &mut impl Rng) -> GateDecision {
        if !self.auto_growth {
            return GateDecision::Paused;
        }

        self.counter = self.counter.saturating_add(1);
        let threshold = *cfg.threshold_ticks.select(inputs.age_factor);
        if self.counter < threshold {
            return GateDecision::Counting;
        }
        self.counter = 0;

        let probability = growth_probability(inputs.moisture, inputs.age_factor, inputs.leaf_count, cfg);
        let passed = probability > 0.0 && rng.random_bool(f64::from(probability.min(1.0)));
        let decision = if !passed {
            GateDecision::Rejected { probability }
        } else if inputs.segment_count >= inputs.max_segments {
            GateDecision::CapacityReached
        } else {
            GateDecision::Fire { probability }
        };
        trace!(?decision, threshold, moisture = inputs.moisture, "growth gate evaluated");
        decision
    }
}
