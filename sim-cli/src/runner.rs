//! Fixed-interval driver around [`SimulationState`].
//!
//! [`Runner`] owns the simulation and plays the host role: a background
//! thread forwards stdin lines into the sensor mailbox while the main loop
//! ticks the simulation every `step_interval`.

use anyhow::Result;
use sim_core::{
    config::Config,
    simulation::{SimulationState, Snapshot, TickReport},
};
use std::{
    io::{self, BufRead},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, SystemTime},
};
use tracing::{debug, info, warn};

pub struct Runner {
    sim: SimulationState,
    step_interval: Duration,
    report_every: u64,
    input_closed: Arc<AtomicBool>,
}

impl Runner {
    /// Creates a runner around a fresh simulation.
    ///
    /// ### Parameters
    /// - `config` - Validated before the simulation is built.
    /// - `step_interval` - Wall-clock pause between ticks.
    /// - `report_every` - Ticks between periodic snapshot logs; `0` disables them.
    pub fn new(config: Config, step_interval: Duration, report_every: u64) -> Result<Self> {
        Ok(Self {
            sim: SimulationState::new(config, SystemTime::now())?,
            step_interval,
            report_every,
            input_closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Forwards stdin lines into the mailbox until stdin closes.
    ///
    /// Only the latest line survives between ticks.
    pub fn spawn_stdin_reader(&self) {
        let mailbox = self.sim.mailbox();
        let closed = Arc::clone(&self.input_closed);
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if !mailbox.post_line(&line) {
                            debug!("sensor line without numeric fields ignored");
                        }
                    }
                    Err(err) => {
                        warn!(%err, "stopped reading sensor input");
                        break;
                    }
                }
            }
            closed.store(true, Ordering::Release);
        });
    }

    /// Ticks until `ticks` have run, or, for `0`, until stdin has closed
    /// and its last sample was consumed.
    pub fn run(&mut self, ticks: u64) {
        info!(ticks, interval_ms = self.step_interval.as_millis() as u64, "runner started");
        loop {
            if ticks > 0 && self.sim.tick_count() >= ticks {
                break;
            }
            if ticks == 0 && self.input_closed.load(Ordering::Acquire) && !self.sim.mailbox().has_pending() {
                break;
            }

            let report = self.step_once();
            if let Some(mutation) = report.mutation {
                debug!(
                    tick = report.tick,
                    kind = ?mutation.kind(),
                    segment = ?mutation.new_segment(),
                    "plant grew"
                );
            }
            if !self.step_interval.is_zero() {
                thread::sleep(self.step_interval);
            }
        }
        info!(ticks = self.sim.tick_count(), "runner finished");
    }

    /// Advances the simulation by exactly one tick.
    pub fn step_once(&mut self) -> TickReport {
        let now = SystemTime::now();
        let report = self.sim.tick(now);
        if self.report_every > 0 && report.tick % self.report_every == 0 {
            let snap = self.sim.snapshot();
            info!(
                tick = snap.tick,
                age_days = snap.age_days,
                segments = snap.segments,
                leaves = snap.leaves,
                flowers = snap.flowers,
                moisture = snap.moisture,
                stage = ?snap.stage,
                mood = ?snap.mood,
                link = %self.sim.link_report(now),
                "plant status"
            );
        }
        report
    }

    pub fn snapshot(&self) -> Snapshot {
        self.sim.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_stops_after_requested_ticks() {
        let config = Config {
            rng_seed: Some(1),
            ..Config::default()
        };
        let mut runner = Runner::new(config, Duration::ZERO, 0).unwrap();
        runner.run(25);
        assert_eq!(runner.snapshot().tick, 25);
    }

    #[test]
    fn closed_input_ends_open_ended_run() {
        let mut runner = Runner::new(Config::default(), Duration::ZERO, 1).unwrap();
        runner.sim.mailbox().post_line("600");
        runner.input_closed.store(true, Ordering::Release);
        runner.run(0);
        // The pending sample is consumed before stopping.
        assert_eq!(runner.snapshot().tick, 1);
        assert_eq!(runner.snapshot().moisture, 600.0);
    }
}
