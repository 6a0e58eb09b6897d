use sim_core::{
    age::AgeSeed,
    config::{AgeBanded, Config},
    lifecycle::max_segments_for_age,
    simulation::SimulationState,
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn t0() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_762_819_200)
}

fn seeded(seed: u64) -> Config {
    Config {
        rng_seed: Some(seed),
        ..Config::default()
    }
}

/// A config whose gate evaluates every tick and nearly always passes.
fn eager(seed: u64) -> Config {
    let mut cfg = seeded(seed);
    cfg.scheduler.threshold_ticks = AgeBanded::constant(1);
    cfg.scheduler.base_rate = 10.0;
    cfg.scheduler.max_probability = 0.95;
    cfg
}

#[test]
fn hundred_ticks_at_age_zero_evaluate_five_times() {
    for seed in 0..20 {
        let mut sim = SimulationState::new(seeded(seed), t0()).unwrap();
        sim.ingest_line("600", t0());

        let mut evaluations = 0;
        let mut mutations = 0;
        let mut last_segments = sim.graph().segment_count();
        for _ in 0..100 {
            let report = sim.tick(t0());
            if report.gate.evaluated() {
                evaluations += 1;
            }
            if report.mutation.is_some() {
                assert!(report.gate.fires());
                mutations += 1;
            }
            let segments = sim.graph().segment_count();
            assert!(segments >= last_segments);
            last_segments = segments;
        }

        assert_eq!(evaluations, 5);
        assert!(mutations <= 5);
        assert!(sim.graph().segment_count() <= 1 + 5);
    }
}

#[test]
fn segment_cap_is_never_exceeded_as_the_plant_ages() {
    let mut cfg = eager(11);
    cfg.age.seed = AgeSeed::PlantedAt {
        unix_secs: 1_762_819_200,
    };
    let mut sim = SimulationState::new(cfg, t0()).unwrap();
    sim.ingest_line("600", t0());

    // One simulated hour per tick: maturity is reached after 144 ticks.
    let mut now = t0();
    for _ in 0..600 {
        now += Duration::from_secs(3_600);
        let report = sim.tick(now);
        let cap = max_segments_for_age(report.age_factor, &sim.config().lifecycle);
        assert!(sim.graph().segment_count() <= cap);
    }
    assert_eq!(sim.age_clock().age_factor(), 1.0);
}

#[test]
fn out_of_band_moisture_never_grows() {
    for reading in ["100", "249", "751", "1000"] {
        let mut sim = SimulationState::new(eager(3), t0()).unwrap();
        for _ in 0..10 {
            sim.ingest_line(reading, t0());
        }
        for _ in 0..300 {
            let report = sim.tick(t0());
            assert!(!report.gate.fires());
        }
        assert_eq!(sim.graph().segment_count(), 1);
        assert_eq!(sim.graph().leaf_count(), 0);
    }
}

#[test]
fn transport_thread_feeds_the_mailbox() {
    let mut sim = SimulationState::new(seeded(4), t0()).unwrap();
    let mailbox = sim.mailbox();

    let writer = std::thread::spawn(move || {
        for line in ["510,300,70", "garbage", "", "520;310;72"] {
            mailbox.post_line(line);
        }
    });
    writer.join().unwrap();

    let report = sim.tick(t0());
    assert_eq!(report.ingested, 3);
    assert_eq!(sim.sensors().moisture.value(), 520.0);
    assert_eq!(sim.sensors().heart_rate.value(), 72.0);
    assert!(!sim.mailbox().has_pending());
}

#[test]
fn same_seed_same_inputs_same_plant() {
    let run = || {
        let mut sim = SimulationState::new(eager(42), t0()).unwrap();
        sim.ingest_line("600", t0());
        let mut now = t0();
        for _ in 0..300 {
            now += Duration::from_secs(600);
            sim.tick(now);
        }
        let ends: Vec<_> = sim.graph().segments().iter().map(|s| s.end).collect();
        (ends, sim.graph().leaf_count(), sim.graph().flower_count())
    };
    assert_eq!(run(), run());
}

#[test]
fn reset_with_seed_replays_the_same_growth() {
    let mut sim = SimulationState::new(eager(7), t0()).unwrap();
    sim.ingest_line("600", t0());
    for _ in 0..50 {
        sim.tick(t0());
    }
    let first: Vec<_> = sim.graph().segments().iter().map(|s| s.end).collect();

    sim.reset(eager(7), t0()).unwrap();
    assert_eq!(sim.graph().segment_count(), 1);
    sim.ingest_line("600", t0());
    for _ in 0..50 {
        sim.tick(t0());
    }
    let second: Vec<_> = sim.graph().segments().iter().map(|s| s.end).collect();
    assert_eq!(first, second);
}

#[test]
fn config_from_yaml_drives_the_simulation() {
    let yaml = r#"
rng_seed: 5
scheduler:
  auto_growth: false
age:
  seed:
    kind: explicit
    age: 600.0
"#;
    let cfg = Config::from_yaml_str(yaml).unwrap();
    let mut sim = SimulationState::new(cfg, t0()).unwrap();
    assert!(!sim.auto_growth());
    assert_eq!(sim.age_clock().age_factor(), 1.0);
    for _ in 0..100 {
        sim.tick(t0());
    }
    assert_eq!(sim.graph().segment_count(), 1);
    assert!((0..20).any(|_| sim.grow_now().is_some()));
}

#[test]
fn unrepresentable_planting_time_starts_a_seedling() {
    let mut cfg = seeded(8);
    cfg.age.seed = AgeSeed::PlantedAt { unix_secs: u64::MAX };
    let mut sim = SimulationState::new(cfg, t0()).unwrap();
    assert_eq!(sim.age_clock().age(), 0.0);
    let report = sim.tick(t0());
    assert_eq!(report.age_factor, 0.0);
}

#[test]
fn oversized_staleness_is_rejected_before_use() {
    let cfg = Config::from_yaml_str("sensors: {stale_after_secs: 1.0e20}");
    assert!(cfg.is_err());
    let mut cfg = seeded(9);
    cfg.sensors.stale_after_secs = 1.0e20;
    assert!(SimulationState::new(cfg, t0()).is_err());
}
