use crate::graph::{
    Access, DirectedEdge, GraphError, GraphId, GraphReader, GraphTile, MemoryTileSource,
    NodeInfo, TileGrid, TileId,
};

use geo::{Bearing, Distance, Haversine, LineString, Point};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_SPEED: f64 = 50.0;
const DEFAULT_TILE_SIZE: f64 = 0.25;

/// Serialisable description of a small road network, nodes given as
/// `[longitude, latitude]` and edges referencing them by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphDescription {
    #[serde(default = "default_tile_size")]
    pub tile_size: f64,
    pub nodes: Vec<[f64; 2]>,
    pub edges: Vec<EdgeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeDescription {
    pub from: usize,
    pub to: usize,

    /// Also adds the edge running from `to` to `from`.
    #[serde(default)]
    pub bidirectional: bool,

    #[serde(default = "default_speed")]
    pub speed: f64,

    #[serde(default = "Access::all")]
    pub access: Access,

    #[serde(default)]
    pub transit: bool,

    /// Interior shape points, from `from` towards `to`.
    #[serde(default)]
    pub shape: Vec<[f64; 2]>,
}

fn default_tile_size() -> f64 {
    DEFAULT_TILE_SIZE
}

fn default_speed() -> f64 {
    DEFAULT_SPEED
}

impl GraphDescription {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Attributes of an edge added through [`GraphBuilder::add_edge`].
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeOptions {
    pub speed: f64,
    pub access: Access,
    pub transit_line: bool,
    pub shape: Vec<Point>,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            access: Access::all(),
            transit_line: false,
            shape: vec![],
        }
    }
}

#[derive(Debug, Clone)]
struct PendingEdge {
    from: usize,
    to: usize,
    options: EdgeOptions,
}

/// Assembles tiles from loose nodes and edges.
///
/// Nodes are assigned to the tile containing them and every edge to
/// the tile of its start node, so the edges leaving a node are always
/// stored together.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    grid: TileGrid,
    nodes: Vec<Point>,
    edges: Vec<PendingEdge>,
}

/// Output of [`GraphBuilder::build`].
///
/// `nodes[i]` and `edges[i]` hold the identifier assigned to the i-th
/// node and edge added to the builder.
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    pub grid: TileGrid,
    pub tiles: Vec<GraphTile>,
    pub nodes: Vec<GraphId>,
    pub edges: Vec<GraphId>,
    endpoints: Vec<(usize, usize)>,
}

impl BuiltGraph {
    /// The edge added from node `from` to node `to`, if any.
    pub fn edge_between(&self, from: usize, to: usize) -> Option<GraphId> {
        self.endpoints
            .iter()
            .position(|endpoints| *endpoints == (from, to))
            .and_then(|index| self.edges.get(index).copied())
    }

    pub fn source(&self) -> MemoryTileSource {
        MemoryTileSource::new(self.tiles.iter().cloned())
    }

    pub fn into_reader(self, max_cache_size: usize) -> GraphReader {
        GraphReader::new(self.grid, MemoryTileSource::new(self.tiles), max_cache_size)
    }
}

impl GraphBuilder {
    pub fn new(grid: TileGrid) -> Self {
        Self {
            grid,
            nodes: vec![],
            edges: vec![],
        }
    }

    pub fn from_description(description: &GraphDescription) -> Result<Self, GraphError> {
        let mut builder = GraphBuilder::new(TileGrid::new(description.tile_size));

        for [lon, lat] in &description.nodes {
            builder.add_node(Point::new(*lon, *lat));
        }

        for (index, edge) in description.edges.iter().enumerate() {
            let missing = [edge.from, edge.to]
                .into_iter()
                .find(|node| *node >= description.nodes.len());

            if let Some(node) = missing {
                return Err(GraphError::MissingNode { edge: index, node });
            }

            let shape = edge
                .shape
                .iter()
                .map(|[lon, lat]| Point::new(*lon, *lat))
                .collect::<Vec<_>>();

            let options = EdgeOptions {
                speed: edge.speed,
                access: edge.access,
                transit_line: edge.transit,
                shape,
            };

            if edge.bidirectional {
                let mut reverse = options.clone();
                reverse.shape.reverse();
                builder.add_edge(edge.from, edge.to, options);
                builder.add_edge(edge.to, edge.from, reverse);
            } else {
                builder.add_edge(edge.from, edge.to, options);
            }
        }

        Ok(builder)
    }

    pub fn add_node(&mut self, position: Point) -> usize {
        self.nodes.push(position);
        self.nodes.len() - 1
    }

    pub fn add_edge(&mut self, from: usize, to: usize, options: EdgeOptions) -> usize {
        self.edges.push(PendingEdge { from, to, options });
        self.edges.len() - 1
    }

    pub fn build(self) -> BuiltGraph {
        // Nodes grouped by tile, in insertion order
        let mut by_tile: BTreeMap<TileId, Vec<usize>> = BTreeMap::new();
        for (index, position) in self.nodes.iter().enumerate() {
            by_tile
                .entry(self.grid.tile_id(*position))
                .or_default()
                .push(index);
        }

        let mut node_ids = vec![GraphId::INVALID; self.nodes.len()];
        for (tile, nodes) in &by_tile {
            for (local, node) in nodes.iter().enumerate() {
                node_ids[*node] = GraphId::new(*tile, local as u32);
            }
        }

        let mut outgoing: Vec<Vec<usize>> = vec![vec![]; self.nodes.len()];
        for (index, edge) in self.edges.iter().enumerate() {
            if edge.from < self.nodes.len() && edge.to < self.nodes.len() {
                outgoing[edge.from].push(index);
            }
        }

        let mut edge_ids = vec![GraphId::INVALID; self.edges.len()];
        let mut tiles = Vec::with_capacity(by_tile.len());

        for (tile, nodes) in &by_tile {
            let mut infos = Vec::with_capacity(nodes.len());
            let mut edges = vec![];

            for node in nodes {
                let edge_index = edges.len() as u32;

                for pending in &outgoing[*node] {
                    edge_ids[*pending] = GraphId::new(*tile, edges.len() as u32);
                    edges.push(self.directed_edge(&self.edges[*pending], &node_ids));
                }

                infos.push(NodeInfo {
                    position: self.nodes[*node],
                    edge_index,
                    edge_count: edges.len() as u32 - edge_index,
                    access: Access::all(),
                    density: 0,
                });
            }

            tiles.push(GraphTile::new(*tile, infos, edges));
        }

        debug!(
            "Built {} tiles from {} nodes and {} edges",
            tiles.len(),
            self.nodes.len(),
            self.edges.len()
        );

        BuiltGraph {
            grid: self.grid,
            tiles,
            nodes: node_ids,
            edges: edge_ids,
            endpoints: self.edges.iter().map(|edge| (edge.from, edge.to)).collect(),
        }
    }

    fn directed_edge(&self, pending: &PendingEdge, node_ids: &[GraphId]) -> DirectedEdge {
        let shape = std::iter::once(self.nodes[pending.from])
            .chain(pending.options.shape.iter().copied())
            .chain(std::iter::once(self.nodes[pending.to]))
            .collect::<LineString>();

        let length = shape
            .lines()
            .map(|line| Haversine.distance(line.start_point(), line.end_point()))
            .sum::<f64>();

        let begin_heading = shape
            .lines()
            .next()
            .map_or(0.0, |line| Haversine.bearing(line.start_point(), line.end_point()));
        let end_heading = shape
            .lines()
            .last()
            .map_or(0.0, |line| Haversine.bearing(line.start_point(), line.end_point()));

        DirectedEdge {
            start_node: node_ids[pending.from],
            end_node: node_ids[pending.to],
            length,
            speed: pending.options.speed,
            access: pending.options.access,
            transit_line: pending.options.transit_line,
            begin_heading,
            end_heading,
            shape,
        }
    }
}
