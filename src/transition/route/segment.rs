use crate::graph::{GraphError, GraphId, GraphReader};

use geo::LineString;

/// Fractions closer than this are considered the same position.
pub(crate) const FRACTION_TOLERANCE: f64 = 1e-9;

#[inline]
pub(crate) fn same_fraction(a: f64, b: f64) -> bool {
    (a - b).abs() <= FRACTION_TOLERANCE
}

/// The traversed part of one edge, from the `source` to the `target`
/// fraction along it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSegment {
    pub edge_id: GraphId,
    pub source: f64,
    pub target: f64,
}

impl EdgeSegment {
    pub fn new(edge_id: GraphId, source: f64, target: f64) -> Self {
        Self {
            edge_id,
            source,
            target,
        }
    }

    /// The segment covering the whole edge.
    pub fn full(edge_id: GraphId) -> Self {
        Self::new(edge_id, 0.0, 1.0)
    }

    #[inline]
    pub fn starts_at_node(&self) -> bool {
        same_fraction(self.source, 0.0)
    }

    #[inline]
    pub fn ends_at_node(&self) -> bool {
        same_fraction(self.target, 1.0)
    }

    /// Geometry of the traversed part, empty when the edge is unknown.
    pub fn shape(&self, reader: &GraphReader) -> Result<LineString, GraphError> {
        let Some(tile) = reader.tile_of(self.edge_id)? else {
            return Ok(LineString::new(vec![]));
        };

        Ok(tile
            .edge(self.edge_id)
            .map(|edge| edge.sub_shape(self.source, self.target))
            .unwrap_or_else(|| LineString::new(vec![])))
    }

    /// Whether `next` continues where this segment ends: further along
    /// the same edge, or from the node this segment's edge ends at.
    pub fn adjoined(&self, reader: &GraphReader, next: &EdgeSegment) -> Result<bool, GraphError> {
        if self.edge_id == next.edge_id {
            return Ok(same_fraction(self.target, next.source));
        }

        if !self.ends_at_node() || !next.starts_at_node() {
            return Ok(false);
        }

        let (Some((_, end)), Some((start, _))) = (
            reader.edge_nodes(self.edge_id)?,
            reader.edge_nodes(next.edge_id)?,
        ) else {
            return Ok(false);
        };

        Ok(end == start)
    }
}
