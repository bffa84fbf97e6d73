use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Index of a tile within a [`TileGrid`](crate::graph::TileGrid).
pub type TileId = u32;

/// Identifies a node or a directed edge within the tiled graph.
///
/// The owning tile is stored in the upper 32 bits, and the index of
/// the element inside that tile in the lower 32 bits. Nodes and edges
/// are indexed separately, so the same value may name a node and an
/// edge; the call site decides which table it is looked up in.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct GraphId(u64);

impl GraphId {
    /// Sentinel for "no element".
    pub const INVALID: GraphId = GraphId(u64::MAX);

    #[inline]
    pub const fn new(tile: TileId, index: u32) -> Self {
        GraphId(((tile as u64) << 32) | index as u64)
    }

    #[inline]
    pub const fn tile(&self) -> TileId {
        (self.0 >> 32) as TileId
    }

    #[inline]
    pub const fn index(&self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 != u64::MAX
    }

    /// The packed representation.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl Default for GraphId {
    fn default() -> Self {
        GraphId::INVALID
    }
}

impl Display for GraphId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{}/{}", self.tile(), self.index())
        } else {
            write!(f, "invalid")
        }
    }
}

impl Debug for GraphId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GraphId({self})")
    }
}
