//! Travel-cost policies consulted while routing between candidates.
//!
//! A [`Costing`] decides which edges and nodes a travel mode may use and
//! what traversing them costs. Matchers hold one costing per
//! [`TravelMode`] in a [`ModeCosting`] table, indexed by the mode.

mod access;
mod mode;
mod universal;

#[cfg(test)]
mod test;

pub use access::*;
pub use mode::*;
pub use universal::*;

use crate::graph::{DirectedEdge, GraphId, GraphTile, NodeInfo};
use crate::transition::Label;

use pathfinding::num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::Add;
use std::sync::Arc;

/// Number of slots in a [`ModeCosting`] table.
pub const MODE_COSTING_COUNT: usize = 8;

pub type CostingRef = Arc<dyn Costing>;

/// One costing per travel mode, indexed by [`TravelMode::index`].
pub type ModeCosting = [Option<CostingRef>; MODE_COSTING_COUNT];

/// Builds a costing from its options.
pub type CostingFactory = fn(&CostingOptions) -> CostingRef;

/// The cost of a traversal, alongside the time it takes.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Cost {
    pub cost: f64,
    pub secs: f64,
}

impl Cost {
    #[inline]
    pub const fn new(cost: f64, secs: f64) -> Self {
        Self { cost, secs }
    }

    /// The cost of covering only `fraction` of a traversal.
    #[inline]
    pub fn scale(self, fraction: f64) -> Self {
        Self {
            cost: self.cost * fraction,
            secs: self.secs * fraction,
        }
    }
}

impl Add for Cost {
    type Output = Cost;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Cost {
            cost: self.cost + rhs.cost,
            secs: self.secs + rhs.secs,
        }
    }
}

impl Zero for Cost {
    #[inline]
    fn zero() -> Self {
        Cost::default()
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.cost == 0.0 && self.secs == 0.0
    }
}

/// Tunables shared by the built-in costings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostingOptions {
    /// Fastest an automobile is assumed to travel, in km/h.
    pub top_speed: f64,

    /// In km/h.
    pub walking_speed: f64,

    /// In km/h.
    pub cycling_speed: f64,

    /// Permits travel along transit lines.
    pub transit_lines: bool,

    /// Permits reversing onto the opposing edge away from dead ends.
    pub uturns: bool,
}

impl Default for CostingOptions {
    fn default() -> Self {
        Self {
            top_speed: 140.0,
            walking_speed: 5.1,
            cycling_speed: 20.0,
            transit_lines: false,
            uturns: false,
        }
    }
}

/// A travel policy for one mode.
pub trait Costing: Send + Sync + Debug {
    fn travel_mode(&self) -> TravelMode;

    /// Whether the edge may be entered after the `predecessor` label.
    /// `tile` is the tile owning the edge.
    fn allowed(
        &self,
        edge: &DirectedEdge,
        predecessor: Option<&Label>,
        tile: &GraphTile,
        edge_id: GraphId,
    ) -> bool;

    /// Whether the edge may be entered when searching backwards from
    /// its end, arriving along `opposing`.
    fn allowed_reverse(
        &self,
        edge: &DirectedEdge,
        predecessor: Option<&Label>,
        opposing: &DirectedEdge,
        tile: &GraphTile,
        edge_id: GraphId,
    ) -> bool;

    fn allowed_node(&self, node: &NodeInfo) -> bool;

    fn edge_cost(&self, edge: &DirectedEdge, density: u32) -> Cost;

    /// Scales the remaining straight-line distance, in meters, into a
    /// lower bound of the remaining cost. Zero disables the heuristic.
    fn astar_cost_factor(&self) -> f64;

    /// Edges for which this returns `true` are never candidates.
    fn filter_edge(&self, edge: &DirectedEdge) -> bool;

    /// Nodes for which this returns `true` are never candidates.
    fn filter_node(&self, node: &NodeInfo) -> bool;

    /// Whether the edge is never a candidate, either itself or because
    /// of the node it starts from. `tile` is the tile owning the edge.
    fn filter_candidate(&self, edge: &DirectedEdge, tile: &GraphTile) -> bool {
        self.filter_edge(edge)
            || tile
                .node(edge.start_node)
                .is_some_and(|node| self.filter_node(node))
    }
}
