use crate::costing::Cost;
use crate::graph::GraphId;

use pathfinding::num_traits::Zero;

/// A settled or tentative step of a routing search.
///
/// Each label records the traversal of (part of) one edge, from the
/// `source` to the `target` fraction along it. Labels reaching the end
/// of their edge carry the `node` they arrive at; labels stopping on
/// the edge carry the index of the `destination` they reach instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Label {
    pub edge: GraphId,

    /// Start node of `edge`.
    pub from_node: GraphId,

    /// Node arrived at, or [`GraphId::INVALID`] when the label stops
    /// part way along the edge.
    pub node: GraphId,

    /// Index of the destination this label reaches, if any.
    pub destination: Option<usize>,

    pub source: f64,
    pub target: f64,

    /// Accumulated cost from the origin.
    pub cost: Cost,

    /// Accumulated route length from the origin, in meters.
    pub distance: f64,

    /// Accumulated turn penalty from the origin.
    pub turn_cost: f64,

    /// Heading when leaving the label, in degrees clockwise from north.
    pub heading: f64,

    /// Index of the previous label in the owning [`LabelSet`].
    pub predecessor: Option<usize>,
}

impl Label {
    /// The zero-length label a search starts from.
    pub fn origin(edge: GraphId, from_node: GraphId, percent_along: f64, heading: f64) -> Self {
        Self {
            edge,
            from_node,
            node: GraphId::INVALID,
            destination: None,
            source: percent_along,
            target: percent_along,
            cost: Cost::zero(),
            distance: 0.0,
            turn_cost: 0.0,
            heading,
            predecessor: None,
        }
    }

    #[inline]
    pub fn is_origin(&self) -> bool {
        self.predecessor.is_none()
    }
}

/// The labels created by one routing search, in creation order.
#[derive(Debug, Default, Clone)]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl LabelSet {
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.labels.iter()
    }

    #[inline]
    pub(crate) fn push(&mut self, label: Label) -> usize {
        self.labels.push(label);
        self.labels.len() - 1
    }

    /// Walks from the label at `index` back to the origin.
    pub fn path(&self, index: usize) -> RoutePath<'_> {
        RoutePath {
            labels: self,
            next: Some(index),
        }
    }
}

/// Iterates the labels of a route from its last label back to its origin.
#[derive(Debug, Clone)]
pub struct RoutePath<'a> {
    labels: &'a LabelSet,
    next: Option<usize>,
}

impl<'a> RoutePath<'a> {
    /// A path with no labels.
    pub fn empty(labels: &'a LabelSet) -> Self {
        Self { labels, next: None }
    }
}

impl<'a> Iterator for RoutePath<'a> {
    type Item = &'a Label;

    fn next(&mut self) -> Option<Self::Item> {
        let label = self.labels.get(self.next?)?;
        self.next = label.predecessor;
        Some(label)
    }
}
