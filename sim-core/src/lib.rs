//! Core sensor-driven plant growth simulation library.
//!
//! Main components:
//! - [`sensor`] — moving-average smoothing of raw sensor channels.
//! - [`ingest`] — sensor line parsing, the latest-sample mailbox and link status.
//! - [`age`] — simulated plant age from wall-clock time.
//! - [`scheduler`] — the per-tick growth gate.
//! - [`structure`] — the segment graph with its leaves and flowers.
//! - [`organ`] — leaves, flowers and their attachment state.
//! - [`policy`] — structural mutations applied by a growth event.
//! - [`lifecycle`] — leaf/flower aging and the age-based segment cap.
//! - [`simulation`] — the owned state and the per-tick pipeline.
//! - [`config`] — all tunable constants, loadable from YAML.
//! - [`types`] — shared type aliases and IDs.

pub mod age;
pub mod config;
pub mod ingest;
pub mod lifecycle;
pub mod organ;
pub mod policy;
pub mod scheduler;
pub mod sensor;
pub mod simulation;
pub mod structure;
pub mod types;
