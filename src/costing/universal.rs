use crate::costing::{Cost, Costing, CostingOptions, CostingRef, TravelMode};
use crate::graph::{DirectedEdge, GraphId, GraphTile, NodeInfo};
use crate::transition::Label;

use std::sync::Arc;

/// Mode-agnostic costing, where the cost of an edge is its length.
///
/// Any road may be used in either direction, transit lines are never
/// used, and no heuristic is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniversalCost;

pub fn create_universal_cost(_options: &CostingOptions) -> CostingRef {
    Arc::new(UniversalCost)
}

impl Costing for UniversalCost {
    fn travel_mode(&self) -> TravelMode {
        TravelMode::Universal
    }

    fn allowed(
        &self,
        edge: &DirectedEdge,
        _predecessor: Option<&Label>,
        _tile: &GraphTile,
        _edge_id: GraphId,
    ) -> bool {
        !edge.is_transit_line()
    }

    fn allowed_reverse(
        &self,
        edge: &DirectedEdge,
        _predecessor: Option<&Label>,
        _opposing: &DirectedEdge,
        _tile: &GraphTile,
        _edge_id: GraphId,
    ) -> bool {
        !edge.is_transit_line()
    }

    fn allowed_node(&self, _node: &NodeInfo) -> bool {
        true
    }

    fn edge_cost(&self, edge: &DirectedEdge, _density: u32) -> Cost {
        Cost::new(edge.length, edge.length)
    }

    fn astar_cost_factor(&self) -> f64 {
        0.0
    }

    fn filter_edge(&self, edge: &DirectedEdge) -> bool {
        edge.is_transit_line()
    }

    fn filter_node(&self, _node: &NodeInfo) -> bool {
        false
    }
}
