//! Headless entry point for the plant growth simulation.
//!
//! Sensor lines (`moisture[,oxygen[,heart_rate]]`) are read from stdin and
//! handed to the simulation through its mailbox. The final snapshot is
//! printed to stdout as YAML; logs go to stderr.

mod runner;

use anyhow::{Context, Result};
use clap::Parser;
use runner::Runner;
use sim_core::{age::AgeSeed, config::Config};
use std::{path::PathBuf, time::Duration};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "plant-sim", version, about = "Sensor-driven plant growth simulation")]
struct Cli {
    /// YAML configuration file; defaults are used for missing fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for reproducible growth; overrides the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to run; 0 runs until stdin closes.
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    /// Milliseconds between ticks.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Planting time as unix seconds; the plant's age is derived from it.
    #[arg(long)]
    planted_unix_secs: Option<u64>,

    /// Start with automatic growth paused.
    #[arg(long)]
    no_auto_growth: bool,

    /// Log a snapshot every this many ticks; 0 disables periodic reports.
    #[arg(long, default_value_t = 600)]
    report_every: u64,
}

impl Cli {
    fn build_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path).with_context(|| format!("loading config from {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(seed) = self.seed {
            config.rng_seed = Some(seed);
        }
        if let Some(unix_secs) = self.planted_unix_secs {
            config.age.seed = AgeSeed::PlantedAt { unix_secs };
        }
        if self.no_auto_growth {
            config.scheduler.auto_growth = false;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Default to INFO level if RUST_LOG is not set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.build_config()?;

    let mut runner = Runner::new(config, Duration::from_millis(cli.tick_ms), cli.report_every)?;
    runner.spawn_stdin_reader();
    runner.run(cli.ticks);

    let snapshot = serde_yaml::to_string(&runner.snapshot()).context("serializing final snapshot")?;
    print!("{snapshot}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let cli = Cli::try_parse_from(["plant-sim"]).unwrap();
        assert_eq!(cli.ticks, 0);
        assert_eq!(cli.tick_ms, 16);
        assert!(cli.config.is_none());
        let config = cli.build_config().unwrap();
        assert!(config.scheduler.auto_growth);
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "plant-sim",
            "--seed",
            "9",
            "--ticks",
            "120",
            "--planted-unix-secs",
            "1762819200",
            "--no-auto-growth",
        ])
        .unwrap();
        let config = cli.build_config().unwrap();
        assert_eq!(config.rng_seed, Some(9));
        assert_eq!(config.age.seed, AgeSeed::PlantedAt { unix_secs: 1_762_819_200 });
        assert!(!config.scheduler.auto_growth);
        assert_eq!(cli.ticks, 120);
    }

    #[test]
    fn rejects_non_numeric_seed() {
        assert!(Cli::try_parse_from(["plant-sim", "--seed", "abc"]).is_err());
    }
}
