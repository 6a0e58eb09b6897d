//! The owned simulation state and its per-tick pipeline.
//!
//! One [`SimulationState::tick`] runs, in order:
//! 1. Mailbox drain: the resident [`SensorSample`], if any, is smoothed.
//! 2. [`AgeClock::advance`]: produces the age factor for this tick.
//! 3. [`GrowthScheduler::evaluate`]: decides whether growth fires.
//! 4. [`policy::apply`]: only when the gate fired.
//! 5. [`lifecycle::sweep`]: ages leaves and flowers.
//!
//! All state is owned here; the only shared piece is the
//! [`SensorMailbox`], which a transport thread may hold a clone of.

use crate::{
    age::AgeClock,
    config::{Config, ConfigError},
    ingest::{LinkReport, LinkStatus, SensorMailbox, SensorSample, parse_sensor_line},
    lifecycle::{self, SweepReport},
    policy::{self, Mutation},
    scheduler::{GateDecision, GateInputs, GrowthScheduler},
    sensor::SensorBank,
    structure::StructureGraph,
};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, trace};

/// Everything that happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Number of sensor fields smoothed this tick.
    pub ingested: usize,
    pub age_factor: f32,
    pub gate: GateDecision,
    pub mutation: Option<Mutation>,
    pub sweep: SweepReport,
}

/// Coarse description of how far the plant has developed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowthStage {
    Seed,
    Sprout,
    Sapling,
    Growing,
    Flowering,
    Mature,
}

/// How the current moisture reading would feel to the plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoistureMood {
    Thirsty,
    Happy,
    TooWet,
}

const THIRSTY_BELOW: f32 = 300.0;
const TOO_WET_ABOVE: f32 = 700.0;

/// Serializable summary for hosts and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub age_days: f64,
    pub age_factor: f32,
    pub segments: usize,
    pub depth: u32,
    pub leaves: usize,
    pub flowers: usize,
    pub moisture: f32,
    pub oxygen: f32,
    pub heart_rate: f32,
    pub stage: GrowthStage,
    pub mood: MoistureMood,
    pub auto_growth: bool,
}

fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    }
}

pub struct SimulationState {
    config: Config,
    age: AgeClock,
    sensors: SensorBank,
    graph: StructureGraph,
    scheduler: GrowthScheduler,
    mailbox: SensorMailbox,
    link: LinkStatus,
    rng: SmallRng,
    tick: u64,
}

impl SimulationState {
    /// Builds a fresh plant from `config` as observed at `now`.
    ///
    /// ### Returns
    /// The new state, or the validation error for an inconsistent config.
    pub fn new(config: Config, now: SystemTime) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = seeded_rng(config.rng_seed);
        let graph = StructureGraph::new(&config.growth.root, &config.growth.probability, rng.random());
        let state = Self {
            age: AgeClock::new(config.age.seed, &config.age, now),
            sensors: SensorBank::new(&config.sensors),
            graph,
            scheduler: GrowthScheduler::new(config.scheduler.auto_growth),
            mailbox: SensorMailbox::new(),
            link: LinkStatus::default(),
            rng,
            tick: 0,
            config,
        };
        info!(age_days = state.age.days(), "simulation started");
        Ok(state)
    }

    /// Returns a handle to the sensor mailbox for a transport to post into.
    pub fn mailbox(&self) -> SensorMailbox {
        self.mailbox.clone()
    }

    /// Smooths `sample` immediately, bypassing the mailbox.
    ///
    /// ### Returns
    /// The number of fields ingested.
    pub fn ingest_sample(&mut self, sample: &SensorSample, now: SystemTime) -> usize {
        let accepted = self.sensors.ingest_sample(sample);
        if sample.has_primary() {
            self.link.record(now);
        }
        accepted
    }

    /// Parses and smooths a raw sensor line immediately.
    pub fn ingest_line(&mut self, line: &str, now: SystemTime) -> usize {
        match parse_sensor_line(line) {
            Some(sample) => self.ingest_sample(&sample, now),
            None => 0,
        }
    }

    /// Runs one atomic simulation step.
    pub fn tick(&mut self, now: SystemTime) -> TickReport {
        self.tick += 1;

        let ingested = match self.mailbox.take() {
            Some(sample) => self.ingest_sample(&sample, now),
            None => 0,
        };

        let age_factor = self.age.advance(now);
        let inputs = GateInputs {
            moisture: self.sensors.moisture.value(),
            age_factor,
            leaf_count: self.graph.leaf_count(),
            segment_count: self.graph.segment_count(),
            max_segments: lifecycle::max_segments_for_age(age_factor, &self.config.lifecycle),
        };
        let gate = self.scheduler.evaluate(&inputs, &self.config.scheduler, &mut self.rng);

        let mutation = if gate.fires() {
            policy::apply(&mut self.graph, age_factor, &self.config.growth, &mut self.rng)
        } else {
            None
        };

        let sweep = lifecycle::sweep(&mut self.graph, age_factor, &self.config.lifecycle);

        trace!(tick = self.tick, ?gate, ?mutation, "tick complete");
        TickReport {
            tick: self.tick,
            ingested,
            age_factor,
            gate,
            mutation,
            sweep,
        }
    }

    /// Forces exactly one growth event regardless of the scheduler.
    ///
    /// At the age-based segment cap the event can still add a leaf or
    /// flower; a drawn stem extension or branch becomes a leaf.
    ///
    /// ### Returns
    /// The applied mutation; `None` if no candidate passed.
    pub fn grow_now(&mut self) -> Option<Mutation> {
        let age_factor = self.age.age_factor();
        let cap = lifecycle::max_segments_for_age(age_factor, &self.config.lifecycle);
        let mutation = policy::apply_within_cap(&mut self.graph, age_factor, cap, &self.config.growth, &mut self.rng);
        debug!(?mutation, cap, "manual growth");
        mutation
    }

    /// Reinitializes every owned piece of state from `config`.
    ///
    /// The plant is rebuilt from its root, leaves and flowers are dropped,
    /// smoothing windows are emptied, and the age clock is re-seeded at
    /// `now`. Moisture restarts from `sensors.reset_moisture`. The RNG is
    /// re-seeded only when `config.rng_seed` is set. The mailbox handle
    /// survives so attached transports keep working.
    ///
    /// On a validation error nothing is changed.
    pub fn reset(&mut self, config: Config, now: SystemTime) -> Result<(), ConfigError> {
        config.validate()?;
        if let Some(seed) = config.rng_seed {
            self.rng = SmallRng::seed_from_u64(seed);
        }
        self.graph = StructureGraph::new(&config.growth.root, &config.growth.probability, self.rng.random());
        self.age = AgeClock::new(config.age.seed, &config.age, now);
        self.sensors = SensorBank::new(&config.sensors);
        self.sensors.moisture.set_value(config.sensors.reset_moisture);
        self.scheduler = GrowthScheduler::new(config.scheduler.auto_growth);
        self.config = config;
        info!(age_days = self.age.days(), "plant reset");
        Ok(())
    }

    /// Pauses or resumes automatic growth without touching the plant.
    pub fn set_auto_growth(&mut self, enabled: bool) {
        self.scheduler.set_auto_growth(enabled);
        info!(enabled, "auto growth toggled");
    }

    pub fn auto_growth(&self) -> bool {
        self.scheduler.auto_growth()
    }

    /// Adds `amount` to the smoothed moisture, capped at the top of the
    /// moisture mapping range. The next sensor sample overrides it.
    pub fn water(&mut self, amount: f32) {
        let cap = self.config.scheduler.moisture.map_high;
        let current = self.sensors.moisture.value();
        self.sensors.moisture.set_value((current + amount).min(cap));
        debug!(moisture = self.sensors.moisture.value(), "watered");
    }

    pub fn stage(&self) -> GrowthStage {
        let segments = self.graph.segment_count();
        if segments > 60 {
            GrowthStage::Mature
        } else if self.graph.flower_count() > 0 {
            GrowthStage::Flowering
        } else if self.graph.leaf_count() > 8 {
            GrowthStage::Growing
        } else if segments > 10 {
            GrowthStage::Sapling
        } else if segments > 3 {
            GrowthStage::Sprout
        } else {
            GrowthStage::Seed
        }
    }

    pub fn mood(&self) -> MoistureMood {
        let moisture = self.sensors.moisture.value();
        if moisture < THIRSTY_BELOW {
            MoistureMood::Thirsty
        } else if moisture > TOO_WET_ABOVE {
            MoistureMood::TooWet
        } else {
            MoistureMood::Happy
        }
    }

    pub fn link_report(&self, now: SystemTime) -> LinkReport {
        let stale_after =
            Duration::try_from_secs_f64(self.config.sensors.stale_after_secs).unwrap_or(Duration::MAX);
        self.link.report(now, stale_after)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            age_days: self.age.days(),
            age_factor: self.age.age_factor(),
            segments: self.graph.segment_count(),
            depth: self.graph.depth(),
            leaves: self.graph.leaf_count(),
            flowers: self.graph.flower_count(),
            moisture: self.sensors.moisture.value(),
            oxygen: self.sensors.oxygen.value(),
            heart_rate: self.sensors.heart_rate.value(),
            stage: self.stage(),
            mood: self.mood(),
            auto_growth: self.auto_growth(),
        }
    }

    pub fn graph(&self) -> &StructureGraph {
        &self.graph
    }

    pub fn sensors(&self) -> &SensorBank {
        &self.sensors
    }

    pub fn age_clock(&self) -> &AgeClock {
        &self.age
    }

    pub fn scheduler(&self) -> &GrowthScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }
}
