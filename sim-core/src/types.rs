/// Identifier for a segment in a [`crate::structure::StructureGraph`].
///
/// This is an index into `StructureGraph::segments`. Segments are never
/// removed, so an id stays valid until the graph is rebuilt by a reset.
pub type SegmentId = usize;
