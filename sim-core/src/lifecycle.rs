//! Aging and removal of leaves and flowers, and the age-based segment cap.
//!
//! Every organ follows the same one-way state machine:
//! `Attached -> Detaching -> Removed`. An organ starts detaching once its
//! age exceeds `max_age * multiplier(age_factor)`; while detaching it
//! accumulates drift, and it is removed from the plant as soon as the drift
//! reaches the removal threshold. Removal uses `swap_remove`, so the order
//! of the remaining organs is not preserved.

use crate::{
    config::LifecycleConfig,
    organ::{AttachmentState, Organ},
    structure::StructureGraph,
};
use tracing::debug;

/// Counts of state transitions made by one [`sweep`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub leaves_detached: usize,
    pub leaves_removed: usize,
    pub flowers_detached: usize,
    pub flowers_removed: usize,
}

/// Largest number of segments the plant may have at this age.
pub fn max_segments_for_age(age_factor: f32, cfg: &LifecycleConfig) -> usize {
    *cfg.max_segments.select(age_factor)
}

/// Ages every leaf and flower by one tick.
///
/// Flowers additionally update their bloom progress,
/// `min(1, age / bloom_ticks)`, which has no influence on removal.
///
/// ### Parameters
/// - `graph` - The plant whose leaves and flowers are swept.
/// - `age_factor` - Plant maturity, selecting the lifetime multipliers.
/// - `cfg` - Lifetime multipliers, drift rates and thresholds.
///
/// ### Returns
/// A [`SweepReport`] with the number of organs that started detaching and
/// that were removed during this sweep.
pub fn sweep(graph: &mut StructureGraph, age_factor: f32, cfg: &LifecycleConfig) -> SweepReport {
    let (leaves_detached, leaves_removed) = age_organs(
        &mut graph.leaves,
        *cfg.leaf_age_multiplier.select(age_factor),
        cfg.leaf_drift_per_tick,
        cfg.leaf_removal_drift,
        |_| {},
    );

    let bloom_ticks = cfg.bloom_ticks.max(1) as f32;
    let (flowers_detached, flowers_removed) = age_organs(
        &mut graph.flowers,
        *cfg.flower_age_multiplier.select(age_factor),
        cfg.flower_drift_per_tick,
        cfg.flower_removal_drift,
        |flower| {
            flower.bloom_progress = (flower.attachment.age as f32 / bloom_ticks).min(1.0);
        },
    );

    let report = SweepReport {
        leaves_detached,
        leaves_removed,
        flowers_detached,
        flowers_removed,
    };
    if report != SweepReport::default() {
        debug!(?report, leaves = graph.leaf_count(), flowers = graph.flower_count(), "lifecycle sweep");
    }
    report
}

/// Runs one tick of the attachment state machine over `items`.
///
/// ### Returns
/// `(detached, removed)` counts for this tick.
fn age_organs<T: Organ>(
    items: &mut Vec<T>,
    lifetime_multiplier: f32,
    drift_per_tick: f32,
    removal_drift: f32,
    mut on_aged: impl FnMut(&mut T),
) -> (usize, usize) {
    let mut detached = 0;
    let mut removed = 0;
    let mut i = 0;

    while i < items.len() {
        let item = &mut items[i];
        let a = item.attachment_mut();
        a.age = a.age.saturating_add(1);

        if a.state == AttachmentState::Attached && a.age as f32 > a.max_age * lifetime_multiplier {
            a.state = AttachmentState::Detaching;
            detached += 1;
        }
        if a.state == AttachmentState::Detaching {
            a.drift += drift_per_tick;
            if a.drift >= removal_drift {
                a.state = AttachmentState::Removed;
            }
        }
        on_aged(item);

        if item.attachment().state == AttachmentState::Removed {
            items.swap_remove(i);
            removed += 1;
        } else {
            i += 1;
        }
    }
    (detached, removed)
}
