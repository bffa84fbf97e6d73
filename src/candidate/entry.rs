use crate::graph::GraphId;

use geo::Point;

/// A position on an edge a measurement may have been taken from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub edge_id: GraphId,

    /// Fraction along the edge, from its start node (0) to its end node (1).
    pub percent_along: f64,

    /// The projection of the measurement onto the edge.
    pub point: Point,

    /// Distance from the measurement to `point`, in meters.
    pub distance: f64,
}

impl Candidate {
    pub fn new(edge_id: GraphId, percent_along: f64, point: Point, distance: f64) -> Self {
        Self {
            edge_id,
            percent_along: percent_along.clamp(0.0, 1.0),
            point,
            distance,
        }
    }

    #[inline]
    pub fn sq_distance(&self) -> f64 {
        self.distance * self.distance
    }
}
