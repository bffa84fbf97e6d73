use crate::graph::Access;

use geo::Point;
use serde::{Deserialize, Serialize};

/// A junction (or dead end) of the road network.
///
/// The edges leaving the node are stored contiguously in the node's
/// tile, starting at `edge_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub position: Point,
    pub edge_index: u32,
    pub edge_count: u32,
    pub access: Access,

    /// Relative road density around the node, from 0 (rural) to 15.
    pub density: u32,
}

impl NodeInfo {
    /// A node with a single way out.
    #[inline]
    pub fn is_dead_end(&self) -> bool {
        self.edge_count <= 1
    }
}
