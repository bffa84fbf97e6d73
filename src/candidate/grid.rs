use crate::graph::{GraphId, GraphTile, ShapePiece, shape_pieces};

use geo::Point;
use rstar::{AABB, RTree, RTreeObject};
use std::mem::size_of;
use std::sync::Arc;

/// One straight piece of an edge, as stored in a [`CandidateGrid`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePiece {
    pub edge_id: GraphId,
    pub(crate) piece: ShapePiece,
}

impl EdgePiece {
    /// Fraction along the edge, and the point, closest to `point`.
    #[inline]
    pub fn project(&self, point: &Point) -> (f64, Point) {
        self.piece.project(point)
    }
}

impl RTreeObject for EdgePiece {
    type Envelope = AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.piece.line.start_point(), self.piece.line.end_point())
    }
}

/// Spatial index over the edge shapes of a single tile.
#[derive(Debug)]
pub struct CandidateGrid {
    tile: Arc<GraphTile>,
    tree: RTree<EdgePiece>,
}

impl CandidateGrid {
    pub fn new(tile: Arc<GraphTile>) -> Self {
        let pieces = tile
            .edges()
            .flat_map(|(edge_id, edge)| {
                shape_pieces(&edge.shape)
                    .into_iter()
                    .map(move |piece| EdgePiece { edge_id, piece })
            })
            .collect::<Vec<_>>();

        Self {
            tile,
            tree: RTree::bulk_load(pieces),
        }
    }

    #[inline]
    pub fn tile(&self) -> &GraphTile {
        &self.tile
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Approximate size of the index, in bytes. The tile itself is
    /// accounted for by the graph reader.
    pub fn footprint(&self) -> usize {
        // Leaves plus roughly as many bytes again of inner nodes
        size_of::<Self>() + 2 * self.tree.size() * size_of::<EdgePiece>()
    }

    /// Pieces whose bounding box intersects the envelope.
    pub fn pieces_within<'a>(
        &'a self,
        envelope: &AABB<Point>,
    ) -> impl Iterator<Item = &'a EdgePiece> + 'a {
        self.tree.locate_in_envelope_intersecting(envelope)
    }
}
