use crate::graph::GraphId;

use bitflags::bitflags;
use geo::{Distance, Haversine, Line, LineLocatePoint, LineString, Point};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Modes of travel permitted along an edge or through a node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Access: u8 {
        const AUTO = 1;
        const PEDESTRIAN = 1 << 1;
        const BICYCLE = 1 << 2;
    }
}

/// A one-way traversal from `start_node` to `end_node`.
///
/// A two-way road is stored as two directed edges, one per direction,
/// each owned by the tile of its start node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectedEdge {
    pub start_node: GraphId,
    pub end_node: GraphId,

    /// Length of the shape, in meters.
    pub length: f64,

    /// Posted speed, in km/h.
    pub speed: f64,

    pub access: Access,

    /// Set for edges which belong to a scheduled transit route rather
    /// than to the road network.
    pub transit_line: bool,

    /// Heading when leaving the start node, in degrees clockwise from north.
    pub begin_heading: f64,

    /// Heading when arriving at the end node, in degrees clockwise from north.
    pub end_heading: f64,

    /// Geometry from the start node to the end node.
    pub shape: LineString,
}

/// One straight piece of an edge shape, positioned along the edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ShapePiece {
    pub line: Line,

    /// Fraction of the edge at which the piece begins.
    pub start: f64,

    /// Fraction of the edge the piece covers.
    pub span: f64,
}

impl ShapePiece {
    #[inline]
    pub fn interpolate(&self, t: f64) -> Point {
        Point::from(self.line.start + self.line.delta() * t.clamp(0.0, 1.0))
    }

    /// Projects the point onto the piece, returning the fraction of the
    /// whole edge at the projection and the projected point.
    #[inline]
    pub fn project(&self, point: &Point) -> (f64, Point) {
        let t = self.line.line_locate_point(point).unwrap_or(0.0);
        (self.start + self.span * t, self.interpolate(t))
    }
}

pub(crate) fn shape_pieces(shape: &LineString) -> Vec<ShapePiece> {
    let lengths = shape
        .lines()
        .map(|line| Haversine.distance(line.start_point(), line.end_point()))
        .collect::<Vec<_>>();
    let total = lengths.iter().sum::<f64>();

    let mut start = 0.0;
    shape
        .lines()
        .zip(lengths)
        .map(|(line, length)| {
            let span = if total > 0.0 { length / total } else { 0.0 };
            let piece = ShapePiece { line, start, span };
            start += span;
            piece
        })
        .collect()
}

impl DirectedEdge {
    #[inline]
    pub fn is_transit_line(&self) -> bool {
        self.transit_line
    }

    /// The point found `fraction` of the way along the edge.
    pub fn point_at(&self, fraction: f64) -> Option<Point> {
        let fraction = fraction.clamp(0.0, 1.0);
        let pieces = shape_pieces(&self.shape);

        let piece = pieces
            .iter()
            .find(|piece| fraction <= piece.start + piece.span)
            .or(pieces.last())?;

        let t = if piece.span > 0.0 {
            (fraction - piece.start) / piece.span
        } else {
            0.0
        };

        Some(piece.interpolate(t))
    }

    /// Finds the closest point on the edge to `point`, returning the
    /// fraction along the edge, the projected point, and its distance
    /// from `point` in meters.
    pub fn project(&self, point: &Point) -> Option<(f64, Point, f64)> {
        shape_pieces(&self.shape)
            .iter()
            .map(|piece| {
                let (fraction, projected) = piece.project(point);
                (fraction, projected, Haversine.distance(projected, *point))
            })
            .min_by(|a, b| a.2.total_cmp(&b.2))
    }

    /// The part of the shape lying between the `source` and `target`
    /// fractions of the edge.
    pub fn sub_shape(&self, source: f64, target: f64) -> LineString {
        let (Some(first), Some(last)) = (self.point_at(source), self.point_at(target)) else {
            return LineString::new(vec![]);
        };

        let pieces = shape_pieces(&self.shape);
        let interior = pieces
            .iter()
            .take(pieces.len().saturating_sub(1))
            .filter(|piece| {
                let end = piece.start + piece.span;
                end > source && end < target
            })
            .map(|piece| piece.line.end);

        std::iter::once(first.0)
            .chain(interior)
            .chain(std::iter::once(last.0))
            .collect()
    }
}
