//! Tunable parameters for every stage of the growth pipeline.
//!
//! All age-dependent values are stored as [`AgeBanded`] tables keyed by the
//! normalized age factor, so retuning the plant never touches control flow.

use crate::age::AgeSeed;
use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

/// Closed interval `[min, max]` that random parameters are drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Draws a value from the span. A degenerate span always yields `min`.
    pub fn sample(&self, rng: &mut impl Rng) -> f32 {
        if self.max > self.min {
            rng.random_range(self.min..self.max)
        } else {
            self.min
        }
    }

    fn check(&self, name: &str) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(invalid(format!(
                "{name} must be a finite span with min <= max (got {}..{})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// One bracket of an [`AgeBanded`] table: applies while `age_factor < below`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgeBracket<T> {
    pub below: f32,
    pub value: T,
}

/// A value that changes with plant maturity.
///
/// Brackets are checked in ascending `below` order; the first bracket whose
/// bound exceeds the age factor wins. Past every bracket `mature` applies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgeBanded<T> {
    pub brackets: Vec<AgeBracket<T>>,
    pub mature: T,
}

impl<T> AgeBanded<T> {
    pub fn new(brackets: Vec<(f32, T)>, mature: T) -> Self {
        Self {
            brackets: brackets
                .into_iter()
                .map(|(below, value)| AgeBracket { below, value })
                .collect(),
            mature,
        }
    }

    /// A table with the same value at every age.
    pub fn constant(value: T) -> Self {
        Self {
            brackets: Vec::new(),
            mature: value,
        }
    }

    pub fn select(&self, age_factor: f32) -> &T {
        self.brackets
            .iter()
            .find(|b| age_factor < b.below)
            .map(|b| &b.value)
            .unwrap_or(&self.mature)
    }

    /// Iterates every value in age order, ending with `mature`.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.brackets
            .iter()
            .map(|b| &b.value)
            .chain(std::iter::once(&self.mature))
    }

    fn check_brackets(&self, name: &str) -> Result<(), ConfigError> {
        let mut prev = 0.0_f32;
        for b in &self.brackets {
            if !b.below.is_finite() || b.below <= prev || b.below > 1.0 {
                return Err(invalid(format!(
                    "{name} brackets must be strictly ascending within (0, 1] (got {})",
                    b.below
                )));
            }
            prev = b.below;
        }
        Ok(())
    }
}

/// Smoothing window and start-up readings for the sensor channels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Number of raw samples averaged per channel.
    pub window: usize,
    pub moisture_initial: f32,
    pub oxygen_initial: f32,
    pub heart_rate_initial: f32,
    /// Smoothed moisture after a reset.
    pub reset_moisture: f32,
    /// Seconds without data before the link is reported as stale.
    pub stale_after_secs: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            window: 10,
            moisture_initial: 600.0,
            oxygen_initial: 350.0,
            heart_rate_initial: 0.0,
            reset_moisture: 650.0,
            stale_after_secs: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgeConfig {
    pub seed: AgeSeed,
    /// Age (in days) at which the age factor saturates at 1.
    pub mature_age_days: f64,
    /// Upper bound for the simulated age, in days.
    pub max_age_days: f64,
}

impl Default for AgeConfig {
    fn default() -> Self {
        Self {
            seed: AgeSeed::default(),
            mature_age_days: 6.0,
            max_age_days: 365.0,
        }
    }
}

/// Moisture readings mapped onto the growth gate.
///
/// Readings inside `[safe_low, safe_high]` are mapped linearly from
/// `[map_low, map_high]` to `[0, 1]`; anything outside the safe band is a
/// hard zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoistureBand {
    pub map_low: f32,
    pub map_high: f32,
    pub safe_low: f32,
    pub safe_high: f32,
}

impl MoistureBand {
    pub fn contains(&self, reading: f32) -> bool {
        reading >= self.safe_low && reading <= self.safe_high
    }
}

impl Default for MoistureBand {
    fn default() -> Self {
        Self {
            map_low: 200.0,
            map_high: 800.0,
            safe_low: 250.0,
            safe_high: 750.0,
        }
    }
}

/// How the moisture factor and the age modifier are combined in the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FactorCombination {
    /// `moisture * base_rate * age_modifier`
    #[default]
    Multiplicative,
    /// `base_rate * (moisture + age_modifier) / 2`
    Additive,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub auto_growth: bool,
    /// Ticks between gate evaluations.
    pub threshold_ticks: AgeBanded<u32>,
    pub moisture: MoistureBand,
    pub base_rate: f32,
    pub age_modifier: AgeBanded<f32>,
    /// Probability added per attached leaf.
    pub leaf_bonus: f32,
    pub max_probability: f32,
    pub combination: FactorCombination,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            auto_growth: true,
            threshold_ticks: AgeBanded::new(vec![(0.25, 20), (0.5, 25), (0.75, 30)], 35),
            moisture: MoistureBand::default(),
            base_rate: 0.35,
            age_modifier: AgeBanded::new(vec![(0.5, 0.6)], 1.0),
            leaf_bonus: 0.002,
            max_probability: 0.95,
            combination: FactorCombination::Multiplicative,
        }
    }
}

/// Placement and shape of the root segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    pub origin: Vec2,
    pub length: f32,
    pub angle: f32,
    pub thickness: f32,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            origin: Vec2::ZERO,
            length: 20.0,
            angle: PI / 2.0,
            thickness: 7.0,
        }
    }
}

/// Per-generation growth probability: linear from `root` at generation 0 to
/// `at_reference` at `reference_generation`, then clamped to `[floor, cap]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityCurve {
    pub root: f32,
    pub reference_generation: u32,
    pub at_reference: f32,
    pub floor: f32,
    pub cap: f32,
}

impl ProbabilityCurve {
    pub fn at(&self, generation: u32) -> f32 {
        let t = generation as f32 / self.reference_generation.max(1) as f32;
        self.clamp(self.root + (self.at_reference - self.root) * t)
    }

    pub fn clamp(&self, p: f32) -> f32 {
        p.max(self.floor).min(self.cap)
    }
}

impl Default for ProbabilityCurve {
    fn default() -> Self {
        Self {
            root: 0.9,
            reference_generation: 10,
            at_reference: 0.15,
            floor: 0.05,
            cap: 0.95,
        }
    }
}

/// How a growing segment is chosen among the eligible candidates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateSelection {
    #[default]
    Uniform,
    /// The i-th candidate (in append order) has weight `(i + 1)^bias`.
    RecencyWeighted { bias: f32 },
}

/// The four structural mutations a growth event can apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    ExtendStem,
    CreateBranch,
    CreateLeaf,
    CreateFlower,
}

/// Relative odds of each mutation kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationWeights {
    pub extend: f32,
    pub branch: f32,
    pub leaf: f32,
    pub flower: f32,
}

impl MutationWeights {
    pub const fn new(extend: f32, branch: f32, leaf: f32, flower: f32) -> Self {
        Self {
            extend,
            branch,
            leaf,
            flower,
        }
    }

    pub fn total(&self) -> f32 {
        self.extend + self.branch + self.leaf + self.flower
    }

    /// Maps a uniform draw in `[0, 1)` onto a mutation kind.
    pub fn pick(&self, draw: f32) -> MutationKind {
        let mut t = draw * self.total();
        for (weight, kind) in [
            (self.extend, MutationKind::ExtendStem),
            (self.branch, MutationKind::CreateBranch),
            (self.leaf, MutationKind::CreateLeaf),
        ] {
            if t < weight {
                return kind;
            }
            t -= weight;
        }
        if self.flower > 0.0 {
            MutationKind::CreateFlower
        } else {
            MutationKind::CreateLeaf
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StemParams {
    /// Maximum deviation from the parent angle, in radians.
    pub angle_jitter: f32,
    pub length: Span,
    pub generation_shrink: f32,
    pub age_shrink: f32,
    pub thickness_decay: f32,
}

impl Default for StemParams {
    fn default() -> Self {
        Self {
            angle_jitter: 0.4,
            length: Span::new(25.0, 45.0),
            generation_shrink: 0.08,
            age_shrink: 0.3,
            thickness_decay: 0.96,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchParams {
    /// Magnitude of the angular offset; the sign is random.
    pub offset: Span,
    pub length: Span,
    pub generation_shrink: f32,
    pub age_shrink: f32,
    pub thickness_decay: f32,
    /// Fraction of the parent's growth probability the branch inherits.
    pub probability_factor: f32,
}

impl Default for BranchParams {
    fn default() -> Self {
        Self {
            offset: Span::new(PI / 3.0, PI / 2.0),
            length: Span::new(18.0, 35.0),
            generation_shrink: 0.12,
            age_shrink: 0.3,
            thickness_decay: 0.75,
            probability_factor: 0.85,
        }
    }
}

/// Randomized traits of a leaf or flower at creation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrganParams {
    pub size: Span,
    /// Offset added to the spawning segment's angle.
    pub angle_offset: Span,
    /// Lifetime in ticks before the age multiplier is applied.
    pub lifetime: Span,
    pub sway_phase: Span,
    pub sway_amount: Span,
    pub color_variation: Span,
}

impl OrganParams {
    pub fn leaf() -> Self {
        Self {
            size: Span::new(0.8, 1.2),
            angle_offset: Span::new(-PI / 3.0, 2.0 * PI / 3.0),
            lifetime: Span::new(800.0, 1200.0),
            sway_phase: Span::new(0.0, 2.0 * PI),
            sway_amount: Span::new(0.5, 1.5),
            color_variation: Span::new(0.8, 1.2),
        }
    }

    pub fn flower() -> Self {
        Self {
            size: Span::new(0.7, 1.3),
            angle_offset: Span::new(-PI / 4.0, 3.0 * PI / 4.0),
            lifetime: Span::new(600.0, 900.0),
            sway_phase: Span::new(0.0, 2.0 * PI),
            sway_amount: Span::new(0.3, 0.8),
            color_variation: Span::new(0.9, 1.1),
        }
    }

    fn check(&self, name: &str) -> Result<(), ConfigError> {
        self.size.check(&format!("{name}.size"))?;
        self.angle_offset.check(&format!("{name}.angle_offset"))?;
        self.lifetime.check(&format!("{name}.lifetime"))?;
        self.sway_phase.check(&format!("{name}.sway_phase"))?;
        self.sway_amount.check(&format!("{name}.sway_amount"))?;
        self.color_variation.check(&format!("{name}.color_variation"))?;
        if self.lifetime.min < 0.0 {
            return Err(invalid(format!("{name}.lifetime must be non-negative")));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub root: RootConfig,
    pub probability: ProbabilityCurve,
    pub selection: CandidateSelection,
    pub mutation_table: AgeBanded<MutationWeights>,
    /// Flowers are replaced by leaves below this age factor.
    pub flowering_threshold: f32,
    /// Lower bound for the combined length shrink factors.
    pub min_length_scale: f32,
    pub stem: StemParams,
    pub branch: BranchParams,
    pub leaf: OrganParams,
    pub flower: OrganParams,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            root: RootConfig::default(),
            probability: ProbabilityCurve::default(),
            selection: CandidateSelection::Uniform,
            mutation_table: AgeBanded::new(
                vec![
                    (0.2, MutationWeights::new(0.85, 0.0, 0.15, 0.0)),
                    (0.6, MutationWeights::new(0.35, 0.30, 0.35, 0.0)),
                ],
                MutationWeights::new(0.15, 0.10, 0.65, 0.10),
            ),
            flowering_threshold: 0.6,
            min_length_scale: 0.2,
            stem: StemParams::default(),
            branch: BranchParams::default(),
            leaf: OrganParams::leaf(),
            flower: OrganParams::flower(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Segment cap by age; must not shrink as the plant matures.
    pub max_segments: AgeBanded<usize>,
    pub leaf_age_multiplier: AgeBanded<f32>,
    pub flower_age_multiplier: AgeBanded<f32>,
    pub leaf_drift_per_tick: f32,
    pub leaf_removal_drift: f32,
    pub flower_drift_per_tick: f32,
    pub flower_removal_drift: f32,
    /// Ticks for a new flower to reach full bloom.
    pub bloom_ticks: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_segments: AgeBanded::new(vec![(0.25, 30), (0.5, 60), (0.75, 100)], 150),
            leaf_age_multiplier: AgeBanded::new(vec![(0.5, 1.25)], 1.0),
            flower_age_multiplier: AgeBanded::new(vec![(0.8, 1.0)], 0.9),
            leaf_drift_per_tick: 0.5,
            leaf_removal_drift: 50.0,
            flower_drift_per_tick: 1.0,
            flower_removal_drift: 100.0,
            bloom_ticks: 30,
        }
    }
}

/// Complete simulation configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seed for the simulation RNG; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
    pub sensors: SensorConfig,
    pub age: AgeConfig,
    pub scheduler: SchedulerConfig,
    pub growth: GrowthConfig,
    pub lifecycle: LifecycleConfig,
}

fn check_unit(name: &str, v: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&v) {
        return Err(invalid(format!("{name} must be within [0, 1] (got {v})")));
    }
    Ok(())
}

fn check_decay(name: &str, v: f32) -> Result<(), ConfigError> {
    if !(v > 0.0 && v <= 1.0) {
        return Err(invalid(format!("{name} must be within (0, 1] (got {v})")));
    }
    Ok(())
}

fn check_non_negative(name: &str, v: f32) -> Result<(), ConfigError> {
    if !(v.is_finite() && v >= 0.0) {
        return Err(invalid(format!("{name} must be finite and >= 0 (got {v})")));
    }
    Ok(())
}

impl Config {
    /// Parses a YAML document; missing fields fall back to their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sensors;
        if s.window == 0 {
            return Err(invalid("sensors.window must be at least 1"));
        }
        if !s.reset_moisture.is_finite() {
            return Err(invalid("sensors.reset_moisture must be finite"));
        }
        if Duration::try_from_secs_f64(s.stale_after_secs).is_err() {
            return Err(invalid("sensors.stale_after_secs must be a representable, non-negative duration"));
        }

        let a = &self.age;
        if !(a.mature_age_days.is_finite() && a.mature_age_days > 0.0) {
            return Err(invalid("age.mature_age_days must be > 0"));
        }
        if !(a.max_age_days.is_finite() && a.max_age_days > 0.0) {
            return Err(invalid("age.max_age_days must be > 0"));
        }
        if let AgeSeed::Explicit { age } = a.seed
            && !age.is_finite()
        {
            return Err(invalid("age.seed explicit age must be finite"));
        }

        let sc = &self.scheduler;
        sc.threshold_ticks.check_brackets("scheduler.threshold_ticks")?;
        if sc.threshold_ticks.values().any(|&t| t == 0) {
            return Err(invalid("scheduler.threshold_ticks must be at least 1"));
        }
        let m = &sc.moisture;
        if !(m.map_low < m.map_high) {
            return Err(invalid("scheduler.moisture map_low must be below map_high"));
        }
        if !(m.safe_low <= m.safe_high) {
            return Err(invalid("scheduler.moisture safe_low must not exceed safe_high"));
        }
        check_non_negative("scheduler.base_rate", sc.base_rate)?;
        check_non_negative("scheduler.leaf_bonus", sc.leaf_bonus)?;
        check_unit("scheduler.max_probability", sc.max_probability)?;
        sc.age_modifier.check_brackets("scheduler.age_modifier")?;
        for &v in sc.age_modifier.values() {
            check_non_negative("scheduler.age_modifier", v)?;
        }

        let g = &self.growth;
        check_non_negative("growth.root.length", g.root.length)?;
        check_non_negative("growth.root.thickness", g.root.thickness)?;
        let p = &g.probability;
        check_unit("growth.probability.floor", p.floor)?;
        check_unit("growth.probability.cap", p.cap)?;
        if p.floor > p.cap {
            return Err(invalid("growth.probability floor must not exceed cap"));
        }
        if let CandidateSelection::RecencyWeighted { bias } = g.selection {
            check_non_negative("growth.selection.bias", bias)?;
        }
        g.mutation_table.check_brackets("growth.mutation_table")?;
        for w in g.mutation_table.values() {
            for v in [w.extend, w.branch, w.leaf, w.flower] {
                check_non_negative("growth.mutation_table weight", v)?;
            }
            if w.total() <= 0.0 {
                return Err(invalid("growth.mutation_table weights must not all be zero"));
            }
        }
        check_unit("growth.min_length_scale", g.min_length_scale)?;
        check_non_negative("growth.stem.angle_jitter", g.stem.angle_jitter)?;
        g.stem.length.check("growth.stem.length")?;
        check_decay("growth.stem.thickness_decay", g.stem.thickness_decay)?;
        g.branch.offset.check("growth.branch.offset")?;
        g.branch.length.check("growth.branch.length")?;
        check_decay("growth.branch.thickness_decay", g.branch.thickness_decay)?;
        check_decay("growth.branch.probability_factor", g.branch.probability_factor)?;
        g.leaf.check("growth.leaf")?;
        g.flower.check("growth.flower")?;

        let l = &self.lifecycle;
        l.max_segments.check_brackets("lifecycle.max_segments")?;
        let caps: Vec<usize> = l.max_segments.values().copied().collect();
        if caps.windows(2).any(|w| w[1] < w[0]) {
            return Err(invalid("lifecycle.max_segments must not decrease with age"));
        }
        if caps.first().is_some_and(|&c| c == 0) {
            return Err(invalid("lifecycle.max_segments must leave room for the root"));
        }
        l.leaf_age_multiplier.check_brackets("lifecycle.leaf_age_multiplier")?;
        l.flower_age_multiplier.check_brackets("lifecycle.flower_age_multiplier")?;
        for &v in l.leaf_age_multiplier.values().chain(l.flower_age_multiplier.values()) {
            check_non_negative("lifecycle age multiplier", v)?;
        }
        if !(l.leaf_drift_per_tick > 0.0 && l.flower_drift_per_tick > 0.0) {
            return Err(invalid("lifecycle drift per tick must be > 0"));
        }
        check_non_negative("lifecycle.leaf_removal_drift", l.leaf_removal_drift)?;
        check_non_negative("lifecycle.flower_removal_drift", l.flower_removal_drift)?;
        if l.bloom_ticks == 0 {
            return Err(invalid("lifecycle.bloom_ticks must be at least 1"));
        }
        Ok(())
    }
}
