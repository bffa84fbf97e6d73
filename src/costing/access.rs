use crate::costing::{Cost, Costing, CostingOptions, CostingRef, TravelMode};
use crate::graph::{Access, DirectedEdge, GraphId, GraphTile, NodeInfo};
use crate::transition::Label;

use std::sync::Arc;

const KPH_TO_MPS: f64 = 1.0 / 3.6;

/// Time-based costing restricted to edges granting a mode's access.
///
/// The cost of an edge is the time, in seconds, to traverse it. Drivers
/// travel at the posted speed (capped at the top speed), while walkers
/// and cyclists move at their configured speed regardless of it.
#[derive(Debug, Clone)]
pub struct AccessCost {
    mode: TravelMode,
    access: Access,

    /// Fixed speed in km/h, used instead of the posted speed.
    speed: Option<f64>,
    top_speed: f64,

    transit_lines: bool,
    uturns: bool,
}

impl AccessCost {
    pub fn auto(options: &CostingOptions) -> Self {
        Self::new(TravelMode::Drive, None, options)
    }

    pub fn pedestrian(options: &CostingOptions) -> Self {
        Self {
            // Walkers may always turn back
            uturns: true,
            ..Self::new(TravelMode::Pedestrian, Some(options.walking_speed), options)
        }
    }

    pub fn bicycle(options: &CostingOptions) -> Self {
        Self::new(TravelMode::Bicycle, Some(options.cycling_speed), options)
    }

    fn new(mode: TravelMode, speed: Option<f64>, options: &CostingOptions) -> Self {
        Self {
            mode,
            access: mode.access(),
            speed: speed.map(|speed| speed.max(1.0)),
            top_speed: options.top_speed.max(1.0),
            transit_lines: options.transit_lines,
            uturns: options.uturns,
        }
    }

    #[inline]
    fn usable(&self, edge: &DirectedEdge) -> bool {
        edge.access.contains(self.access) && (self.transit_lines || !edge.is_transit_line())
    }
}

pub fn create_auto_cost(options: &CostingOptions) -> CostingRef {
    Arc::new(AccessCost::auto(options))
}

pub fn create_pedestrian_cost(options: &CostingOptions) -> CostingRef {
    Arc::new(AccessCost::pedestrian(options))
}

pub fn create_bicycle_cost(options: &CostingOptions) -> CostingRef {
    Arc::new(AccessCost::bicycle(options))
}

impl Costing for AccessCost {
    fn travel_mode(&self) -> TravelMode {
        self.mode
    }

    fn allowed(
        &self,
        edge: &DirectedEdge,
        predecessor: Option<&Label>,
        tile: &GraphTile,
        _edge_id: GraphId,
    ) -> bool {
        if !self.usable(edge) {
            return false;
        }

        let reversing = predecessor.is_some_and(|label| {
            label.node == edge.start_node && label.from_node == edge.end_node
        });

        if reversing && !self.uturns {
            return tile
                .node(edge.start_node)
                .is_some_and(|node| node.is_dead_end());
        }

        true
    }

    fn allowed_reverse(
        &self,
        edge: &DirectedEdge,
        _predecessor: Option<&Label>,
        opposing: &DirectedEdge,
        _tile: &GraphTile,
        _edge_id: GraphId,
    ) -> bool {
        self.usable(edge) && opposing.access.contains(self.access)
    }

    fn allowed_node(&self, node: &NodeInfo) -> bool {
        node.access.contains(self.access)
    }

    fn edge_cost(&self, edge: &DirectedEdge, _density: u32) -> Cost {
        let speed = self
            .speed
            .unwrap_or(edge.speed)
            .clamp(1.0, self.top_speed);
        let secs = edge.length / (speed * KPH_TO_MPS);

        Cost::new(secs, secs)
    }

    fn astar_cost_factor(&self) -> f64 {
        let speed = self.speed.unwrap_or(self.top_speed);
        1.0 / (speed * KPH_TO_MPS)
    }

    fn filter_edge(&self, edge: &DirectedEdge) -> bool {
        !self.usable(edge)
    }

    fn filter_node(&self, node: &NodeInfo) -> bool {
        !self.allowed_node(node)
    }
}
