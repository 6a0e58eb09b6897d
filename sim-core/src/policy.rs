//! Structural growth: choosing a segment and mutating the plant.
//!
//! A growth event runs in three steps:
//! 1. Candidate filtering: every growable segment passes a Bernoulli trial
//!    with its own growth probability.
//! 2. Selection: one candidate is chosen according to
//!    [`CandidateSelection`].
//! 3. Mutation: a uniform draw is mapped through the age-banded
//!    [`MutationWeights`] table onto exactly one [`Mutation`].

use crate::{
    config::{CandidateSelection, GrowthConfig, MutationKind},
    organ::{Flower, Leaf},
    structure::{ChildSpec, StructureGraph},
    types::SegmentId,
};
use rand::{
    Rng,
    distr::{Distribution, weighted::WeightedIndex},
};
use tracing::debug;

/// The structural change applied by one growth event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// A new segment continuing the candidate.
    ExtendStem(SegmentId),
    /// A new, sharply angled side segment.
    CreateBranch(SegmentId),
    CreateLeaf,
    CreateFlower,
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::ExtendStem(_) => MutationKind::ExtendStem,
            Mutation::CreateBranch(_) => MutationKind::CreateBranch,
            Mutation::CreateLeaf => MutationKind::CreateLeaf,
            Mutation::CreateFlower => MutationKind::CreateFlower,
        }
    }

    /// Id of the segment this mutation appended, if any.
    pub fn new_segment(&self) -> Option<SegmentId> {
        match *self {
            Mutation::ExtendStem(id) | Mutation::CreateBranch(id) => Some(id),
            Mutation::CreateLeaf | Mutation::CreateFlower => None,
        }
    }
}

/// Applies at most one structural mutation to the graph.
///
/// ### Parameters
/// - `graph` - The plant; segments, leaves or flowers may be appended.
/// - `age_factor` - Maturity in `[0, 1]`, used to pick the mutation table
///   row and to shorten new segments on older plants.
/// - `cfg` - Growth parameters.
/// - `rng` - The simulation's random source; every draw comes from it.
///
/// ### Returns
/// The applied [`Mutation`], or `None` when no segment passed its
/// candidate trial (a normal, silent outcome).
pub fn apply(
    graph: &mut StructureGraph,
    age_factor: f32,
    cfg: &GrowthConfig,
    rng: &mut impl Rng,
) -> Option<Mutation> {
    apply_within_cap(graph, age_factor, usize::MAX, cfg, rng)
}

/// Like [`apply`], but never grows the graph past `max_segments`.
///
/// Once the graph holds `max_segments` segments, a drawn stem extension or
/// branch becomes a leaf on the chosen segment instead. Leaves and flowers
/// are never limited.
pub fn apply_within_cap(
    graph: &mut StructureGraph,
    age_factor: f32,
    max_segments: usize,
    cfg: &GrowthConfig,
    rng: &mut impl Rng,
) -> Option<Mutation> {
    let candidates = collect_candidates(graph, rng);
    let Some(chosen) = select_candidate(&candidates, &cfg.selection, rng) else {
        debug!(segments = graph.segment_count(), "no growth candidates this event");
        return None;
    };

    let draw: f32 = rng.random();
    let mut kind = cfg.mutation_table.select(age_factor).pick(draw);
    if kind == MutationKind::CreateFlower && age_factor < cfg.flowering_threshold {
        kind = MutationKind::CreateLeaf;
    }
    let adds_segment = matches!(kind, MutationKind::ExtendStem | MutationKind::CreateBranch);
    if adds_segment && graph.segment_count() >= max_segments {
        kind = MutationKind::CreateLeaf;
    }

    let mutation = match kind {
        MutationKind::ExtendStem => Mutation::ExtendStem(extend_stem(graph, chosen, age_factor, cfg, rng)),
        MutationKind::CreateBranch => {
            Mutation::CreateBranch(create_branch(graph, chosen, age_factor, cfg, rng))
        }
        MutationKind::CreateLeaf => {
            create_leaf(graph, chosen, cfg, rng);
            Mutation::CreateLeaf
        }
        MutationKind::CreateFlower => {
            create_flower(graph, chosen, cfg, rng);
            Mutation::CreateFlower
        }
    };

    debug!(candidate = chosen, ?mutation, age_factor, "applied growth mutation");
    Some(mutation)
}

/// Runs the per-segment Bernoulli trial and returns the survivors in
/// append order.
fn collect_candidates(graph: &StructureGraph, rng: &mut impl Rng) -> Vec<SegmentId> {
    graph
        .segments()
        .iter()
        .enumerate()
        .filter(|(_, s)| s.growable && rng.random_bool(f64::from(s.growth_probability.clamp(0.0, 1.0))))
        .map(|(id, _)| id)
        .collect()
}

/// Picks one id from `candidates`.
///
/// With [`CandidateSelection::RecencyWeighted`] the i-th candidate gets
/// weight `(i + 1)^bias`, so later (more recently appended) segments are
/// favoured as `bias` grows.
fn select_candidate(
    candidates: &[SegmentId],
    selection: &CandidateSelection,
    rng: &mut impl Rng,
) -> Option<SegmentId> {
    if candidates.is_empty() {
        return None;
    }
    match *selection {
        CandidateSelection::Uniform => Some(candidates[rng.random_range(0..candidates.len())]),
        CandidateSelection::RecencyWeighted { bias } => {
            let weights = (1..=candidates.len()).map(|rank| (rank as f32).powf(bias));
            let dist = WeightedIndex::new(weights).ok()?;
            Some(candidates[dist.sample(rng)])
        }
    }
}

/// Length multiplier shrinking with generation and with age.
fn length_scale(generation: u32, generation_shrink: f32, age_factor: f32, age_shrink: f32, min: f32) -> f32 {
    let by_generation = (1.0 - generation as f32 * generation_shrink).max(min);
    let by_age = (1.0 - age_factor * age_shrink).max(min);
    (by_generation * by_age).max(min)
}

fn extend_stem(
    graph: &mut StructureGraph,
    parent: SegmentId,
    age_factor: f32,
    cfg: &GrowthConfig,
    rng: &mut impl Rng,
) -> SegmentId {
    let stem = &cfg.stem;
    let (angle, generation, thickness) = {
        let p = &graph.segments()[parent];
        (p.angle, p.generation, p.thickness)
    };

    let angle = angle + rng.random_range(-stem.angle_jitter..=stem.angle_jitter);
    let scale = length_scale(
        generation,
        stem.generation_shrink,
        age_factor,
        stem.age_shrink,
        cfg.min_length_scale,
    );
    let spec = ChildSpec {
        angle,
        length: stem.length.sample(rng) * scale,
        thickness: thickness * stem.thickness_decay,
        growth_probability: None,
    };
    graph.add_child(parent, spec, &cfg.probability, rng.random())
}

fn create_branch(
    graph: &mut StructureGraph,
    parent: SegmentId,
    age_factor: f32,
    cfg: &GrowthConfig,
    rng: &mut impl Rng,
) -> SegmentId {
    let branch = &cfg.branch;
    let (angle, generation, thickness, probability) = {
        let p = &graph.segments()[parent];
        (p.angle, p.generation, p.thickness, p.growth_probability)
    };

    let side = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    let angle = angle + side * branch.offset.sample(rng);
    let scale = length_scale(
        generation,
        branch.generation_shrink,
        age_factor,
        branch.age_shrink,
        cfg.min_length_scale,
    );
    let spec = ChildSpec {
        angle,
        length: branch.length.sample(rng) * scale,
        thickness: thickness * branch.thickness_decay,
        growth_probability: Some(probability * branch.probability_factor),
    };
    graph.add_child(parent, spec, &cfg.probability, rng.random())
}

fn create_leaf(graph: &mut StructureGraph, at: SegmentId, cfg: &GrowthConfig, rng: &mut impl Rng) {
    let (tip, angle) = {
        let s = &graph.segments()[at];
        (s.tip(), s.angle)
    };
    graph.leaves.push(Leaf::sprout(tip, angle, &cfg.leaf, rng));
}

fn create_flower(graph: &mut StructureGraph, at: SegmentId, cfg: &GrowthConfig, rng: &mut impl Rng) {
    let (tip, angle) = {
        let s = &graph.segments()[at];
        (s.tip(), s.angle)
    };
    graph.flowers.push(Flower::sprout(tip, angle, &cfg.flower, rng));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgeBanded, MutationWeights, ProbabilityCurve};
    use rand::{SeedableRng, rngs::SmallRng};

    fn only(weights: MutationWeights) -> GrowthConfig {
        GrowthConfig {
            mutation_table: AgeBanded::constant(weights),
            ..GrowthConfig::default()
        }
    }

    fn graph(cfg: &GrowthConfig) -> StructureGraph {
        StructureGraph::new(&cfg.root, &cfg.probability, 0)
    }

    #[test]
    fn extend_stem_appends_thinner_child_near_parent_angle() {
        let cfg = only(MutationWeights::new(1.0, 0.0, 0.0, 0.0));
        let mut rng = SmallRng::seed_from_u64(1);
        let mut g = graph(&cfg);

        let mut applied = None;
        for _ in 0..20 {
            applied = apply(&mut g, 0.0, &cfg, &mut rng);
            if applied.is_some() {
                break;
            }
        }
        let Some(Mutation::ExtendStem(id)) = applied else {
            panic!("expected a stem extension, got {applied:?}");
        };

        let root = &g.segments()[0];
        let child = &g.segments()[id];
        assert_eq!(child.parent, Some(0));
        assert_eq!(child.generation, 1);
        assert!((child.thickness - root.thickness * cfg.stem.thickness_decay).abs() < 1e-5);
        assert!((child.angle - root.angle).abs() <= cfg.stem.angle_jitter + 1e-6);
        assert!(child.length() >= cfg.stem.length.min * cfg.min_length_scale);
        assert!(child.length() <= cfg.stem.length.max);
    }

    #[test]
    fn branch_turns_sharply_and_inherits_reduced_probability() {
        let cfg = only(MutationWeights::new(0.0, 1.0, 0.0, 0.0));
        let mut rng = SmallRng::seed_from_u64(2);
        let mut g = graph(&cfg);

        for _ in 0..50 {
            apply(&mut g, 0.5, &cfg, &mut rng);
        }
        assert!(g.segment_count() > 1);

        for s in g.segments().iter().skip(1) {
            let parent = &g.segments()[s.parent.unwrap()];
            let offset = (s.angle - parent.angle).abs();
            assert!(offset >= cfg.branch.offset.min - 1e-5);
            assert!(offset <= cfg.branch.offset.max + 1e-5);
            assert!(s.thickness <= parent.thickness * cfg.branch.thickness_decay + 1e-5);
            let expected = cfg
                .probability
                .clamp(parent.growth_probability * cfg.branch.probability_factor);
            assert!((s.growth_probability - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn leaf_attaches_at_candidate_tip_without_new_segment() {
        let cfg = only(MutationWeights::new(0.0, 0.0, 1.0, 0.0));
        let mut rng = SmallRng::seed_from_u64(3);
        let mut g = graph(&cfg);

        for _ in 0..10 {
            apply(&mut g, 1.0, &cfg, &mut rng);
        }
        assert_eq!(g.segment_count(), 1);
        assert!(g.leaf_count() > 0);
        let tip = g.segments()[0].tip();
        assert!(g.leaves().iter().all(|l| l.attachment.position == tip));
    }

    #[test]
    fn flowers_become_leaves_before_flowering_age() {
        let cfg = only(MutationWeights::new(0.0, 0.0, 0.0, 1.0));
        let mut rng = SmallRng::seed_from_u64(4);

        let mut young = graph(&cfg);
        for _ in 0..10 {
            if let Some(m) = apply(&mut young, cfg.flowering_threshold - 0.01, &cfg, &mut rng) {
                assert_eq!(m, Mutation::CreateLeaf);
            }
        }
        assert_eq!(young.flower_count(), 0);

        let mut mature = graph(&cfg);
        for _ in 0..10 {
            apply(&mut mature, 1.0, &cfg, &mut rng);
        }
        assert!(mature.flower_count() > 0);
        assert_eq!(mature.leaf_count(), 0);
    }

    #[test]
    fn no_growable_segment_is_a_silent_no_op() {
        let cfg = GrowthConfig {
            probability: ProbabilityCurve {
                root: 0.0,
                at_reference: 0.0,
                floor: 0.0,
                cap: 0.0,
                ..ProbabilityCurve::default()
            },
            ..GrowthConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(5);
        let mut g = graph(&cfg);
        for _ in 0..100 {
            assert_eq!(apply(&mut g, 0.3, &cfg, &mut rng), None);
        }
        assert_eq!(g.segment_count(), 1);
        assert_eq!(g.leaf_count(), 0);
    }

    #[test]
    fn full_graph_turns_new_segments_into_leaves() {
        let cfg = only(MutationWeights::new(0.5, 0.5, 0.0, 0.0));
        let mut rng = SmallRng::seed_from_u64(7);
        let mut g = graph(&cfg);

        for _ in 0..100 {
            let full = g.segment_count() >= 3;
            match apply_within_cap(&mut g, 0.5, 3, &cfg, &mut rng) {
                Some(m) if full => assert_eq!(m, Mutation::CreateLeaf),
                Some(m) => assert!(m.new_segment().is_some()),
                None => {}
            }
        }
        assert_eq!(g.segment_count(), 3);
        assert!(g.leaf_count() > 0);
    }

    #[test]
    fn recency_weighting_prefers_recent_candidates() {
        let candidates: Vec<SegmentId> = (0..10).collect();
        let mut rng = SmallRng::seed_from_u64(6);
        let selection = CandidateSelection::RecencyWeighted { bias: 4.0 };

        let mut late = 0;
        for _ in 0..1_000 {
            if select_candidate(&candidates, &selection, &mut rng).unwrap() >= 5 {
                late += 1;
            }
        }
        assert!(late > 800, "recent candidates picked only {late} times");

        assert_eq!(select_candidate(&[], &CandidateSelection::Uniform, &mut rng), None);
    }

    #[test]
    fn same_seed_grows_same_plant() {
        let cfg = GrowthConfig::default();
        let grow = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut g = graph(&cfg);
            let mutations: Vec<_> = (0..40).map(|_| apply(&mut g, 0.7, &cfg, &mut rng)).collect();
            (mutations, g.segments().iter().map(|s| s.end).collect::<Vec<_>>())
        };
        assert_eq!(grow(9), grow(9));
    }
}
