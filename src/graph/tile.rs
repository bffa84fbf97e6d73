use crate::graph::{DirectedEdge, GraphId, NodeInfo, TileId};

use geo::{Coord, Point, Rect};
use serde::{Deserialize, Serialize};
use std::mem::size_of;

/// Smallest tile edge length, in degrees, for which every tile of the
/// world still has a distinct [`TileId`].
pub const MIN_TILE_SIZE: f64 = 0.01;

/// The nodes and edges of one square of the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphTile {
    id: TileId,
    nodes: Vec<NodeInfo>,
    edges: Vec<DirectedEdge>,
}

impl GraphTile {
    pub fn new(id: TileId, nodes: Vec<NodeInfo>, edges: Vec<DirectedEdge>) -> Self {
        Self { id, nodes, edges }
    }

    #[inline]
    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn node(&self, id: GraphId) -> Option<&NodeInfo> {
        if id.tile() != self.id {
            return None;
        }

        self.nodes.get(id.index() as usize)
    }

    pub fn edge(&self, id: GraphId) -> Option<&DirectedEdge> {
        if id.tile() != self.id {
            return None;
        }

        self.edges.get(id.index() as usize)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (GraphId, &NodeInfo)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (GraphId::new(self.id, index as u32), node))
    }

    pub fn edges(&self) -> impl Iterator<Item = (GraphId, &DirectedEdge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(index, edge)| (GraphId::new(self.id, index as u32), edge))
    }

    /// Edges leaving the given node of this tile.
    pub fn outgoing(&self, node: &NodeInfo) -> impl Iterator<Item = (GraphId, &DirectedEdge)> {
        let start = node.edge_index as usize;
        let end = (start + node.edge_count as usize).min(self.edges.len());

        self.edges
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(move |(offset, edge)| (GraphId::new(self.id, (start + offset) as u32), edge))
    }

    /// Approximate heap and inline size of the tile, in bytes.
    pub fn footprint(&self) -> usize {
        let shapes = self
            .edges
            .iter()
            .map(|edge| edge.shape.0.len() * size_of::<Coord>())
            .sum::<usize>();

        size_of::<Self>()
            + self.nodes.len() * size_of::<NodeInfo>()
            + self.edges.len() * size_of::<DirectedEdge>()
            + shapes
    }
}

/// Divides the world into square tiles of `tile_size` degrees, numbered
/// row-major from the south-west corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    tile_size: f64,
}

impl TileGrid {
    /// Sizes below [`MIN_TILE_SIZE`] are raised to it.
    pub fn new(tile_size: f64) -> Self {
        Self {
            tile_size: tile_size.max(MIN_TILE_SIZE),
        }
    }

    #[inline]
    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    #[inline]
    fn columns(&self) -> u32 {
        (360.0 / self.tile_size).ceil() as u32
    }

    #[inline]
    fn rows(&self) -> u32 {
        (180.0 / self.tile_size).ceil() as u32
    }

    #[inline]
    fn cell(&self, point: Point) -> (u32, u32) {
        let column = ((point.x() + 180.0) / self.tile_size).floor().max(0.0) as u32;
        let row = ((point.y() + 90.0) / self.tile_size).floor().max(0.0) as u32;

        (
            column.min(self.columns() - 1),
            row.min(self.rows() - 1),
        )
    }

    /// The tile containing the point.
    pub fn tile_id(&self, point: Point) -> TileId {
        let (column, row) = self.cell(point);
        row * self.columns() + column
    }

    pub fn bounds(&self, tile: TileId) -> Rect {
        let column = tile % self.columns();
        let row = tile / self.columns();

        let min = Coord {
            x: column as f64 * self.tile_size - 180.0,
            y: row as f64 * self.tile_size - 90.0,
        };

        Rect::new(
            min,
            Coord {
                x: min.x + self.tile_size,
                y: min.y + self.tile_size,
            },
        )
    }

    /// Every tile overlapping the box spanned by the two corners.
    pub fn tiles_intersecting(&self, a: Point, b: Point) -> Vec<TileId> {
        let (column_a, row_a) = self.cell(a);
        let (column_b, row_b) = self.cell(b);

        let columns = column_a.min(column_b)..=column_a.max(column_b);
        let rows = row_a.min(row_b)..=row_a.max(row_b);

        rows.flat_map(|row| columns.clone().map(move |column| row * self.columns() + column))
            .collect()
    }
}
