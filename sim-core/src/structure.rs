use crate::config::{ProbabilityCurve, RootConfig};
use crate::organ::{Flower, Leaf};
use crate::types::SegmentId;
use glam::Vec2;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
    pub angle: f32,
    pub thickness: f32,
    pub generation: u32,
    pub growth_probability: f32,
    pub growable: bool,
    /// Stable per-segment seed for cosmetic variation.
    pub seed: u32,
    pub parent: Option<SegmentId>,
    pub children: Vec<SegmentId>,
}

/// Shape of a new segment relative to its parent's tip.
#[derive(Debug, Clone, Copy)]
pub struct ChildSpec {
    pub angle: f32,
    pub length: f32,
    pub thickness: f32,
    /// Overrides the generation-based probability (still clamped).
    pub growth_probability: Option<f32>,
}

/// The plant: an append-only forest of segments plus the leaves and
/// flowers currently attached to it.
#[derive(Debug, Clone, Serialize)]
pub struct StructureGraph {
    segments: Vec<Segment>,
    pub(crate) leaves: Vec<Leaf>,
    pub(crate) flowers: Vec<Flower>,
}

impl Segment {
    pub fn new_root(cfg: &RootConfig, curve: &ProbabilityCurve, seed: u32) -> Self {
        Self {
            start: cfg.origin,
            end: cfg.origin + Vec2::from_angle(cfg.angle) * cfg.length,
            angle: cfg.angle,
            thickness: cfg.thickness,
            generation: 0,
            growth_probability: curve.at(0),
            growable: true,
            seed,
            parent: None,
            children: Vec::with_capacity(2),
        }
    }

    pub fn new_child(
        parent: &Segment,
        parent_id: SegmentId,
        spec: &ChildSpec,
        curve: &ProbabilityCurve,
        seed: u32,
    ) -> Self {
        let generation = parent.generation + 1;
        let growth_probability = spec
            .growth_probability
            .map(|p| curve.clamp(p))
            .unwrap_or_else(|| curve.at(generation));
        Self {
            start: parent.end,
            end: parent.end + Vec2::from_angle(spec.angle) * spec.length.max(0.0),
            angle: spec.angle,
            thickness: spec.thickness.min(parent.thickness).max(0.0),
            generation,
            growth_probability,
            growable: true,
            seed,
            parent: Some(parent_id),
            children: Vec::with_capacity(2),
        }
    }

    pub fn length(&self) -> f32 {
        (self.end - self.start).length()
    }

    /// Where children, leaves and flowers attach.
    pub fn tip(&self) -> Vec2 {
        self.end
    }
}

impl StructureGraph {
    /// Creates a graph holding only a root segment.
    pub fn new(root: &RootConfig, curve: &ProbabilityCurve, seed: u32) -> Self {
        Self {
            segments: vec![Segment::new_root(root, curve, seed)],
            leaves: Vec::new(),
            flowers: Vec::new(),
        }
    }

    /// Appends a child segment at the tip of `parent`.
    ///
    /// The child's thickness is capped at the parent's so thickness never
    /// increases along a lineage.
    ///
    /// ### Panics
    /// Panics if `parent` is not a valid segment id.
    pub fn add_child(
        &mut self,
        parent: SegmentId,
        spec: ChildSpec,
        curve: &ProbabilityCurve,
        seed: u32,
    ) -> SegmentId {
        let id = self.segments.len();
        let child = Segment::new_child(&self.segments[parent], parent, &spec, curve, seed);
        self.segments.push(child);
        self.segments[parent].children.push(id);
        id
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn flowers(&self) -> &[Flower] {
        &self.flowers
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn flower_count(&self) -> usize {
        self.flowers.len()
    }

    /// Highest generation present.
    pub fn depth(&self) -> u32 {
        self.segments.iter().map(|s| s.generation).max().unwrap_or(0)
    }
}
