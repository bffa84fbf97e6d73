use crate::graph::{GraphError, GraphId, GraphTile, NodeInfo, TileGrid, TileId, TileSource};

use geo::Point;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Tile budget used when none is configured, in bytes.
pub const DEFAULT_TILE_CACHE_SIZE: usize = 256 * 1024 * 1024;

/// Read-through access to the tiled graph.
///
/// Loaded tiles are shared behind an [`Arc`] and kept in a concurrent
/// cache, so a reader may be used from many matchers and threads at
/// once. Tiles the source does not have are cached as absent as well.
/// The cache is bounded softly: it grows past `max_cache_size` until
/// [`GraphReader::trim`] is called.
#[derive(Debug)]
pub struct GraphReader {
    grid: TileGrid,
    source: Box<dyn TileSource>,

    cache: scc::HashMap<TileId, Option<Arc<GraphTile>>>,
    cache_size: AtomicUsize,
    max_cache_size: usize,
}

impl GraphReader {
    pub fn new(grid: TileGrid, source: impl TileSource + 'static, max_cache_size: usize) -> Self {
        Self {
            grid,
            source: Box::new(source),
            cache: scc::HashMap::default(),
            cache_size: AtomicUsize::new(0),
            max_cache_size,
        }
    }

    #[inline]
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Edge length of a tile, in degrees.
    #[inline]
    pub fn local_tile_size(&self) -> f64 {
        self.grid.tile_size()
    }

    pub fn tile(&self, tile: TileId) -> Result<Option<Arc<GraphTile>>, GraphError> {
        if let Some(cached) = self.cache.read(&tile, |_, entry| entry.clone()) {
            return Ok(cached);
        }

        let loaded = self.source.load(tile)?.map(Arc::new);
        let footprint = loaded.as_ref().map_or(0, |tile| tile.footprint());

        match self.cache.insert(tile, loaded.clone()) {
            Ok(()) => {
                let total = self.cache_size.fetch_add(footprint, Ordering::Relaxed) + footprint;
                debug!("Loaded tile {tile} ({footprint}B, cache at {total}B)");
                Ok(loaded)
            }
            // Another thread loaded the tile first, prefer its copy.
            Err(_) => Ok(self
                .cache
                .read(&tile, |_, entry| entry.clone())
                .unwrap_or(loaded)),
        }
    }

    /// The tile owning the given node or edge.
    #[inline]
    pub fn tile_of(&self, id: GraphId) -> Result<Option<Arc<GraphTile>>, GraphError> {
        if !id.is_valid() {
            return Ok(None);
        }

        self.tile(id.tile())
    }

    pub fn node(&self, id: GraphId) -> Result<Option<NodeInfo>, GraphError> {
        Ok(self
            .tile_of(id)?
            .and_then(|tile| tile.node(id).cloned()))
    }

    pub fn node_position(&self, id: GraphId) -> Result<Option<Point>, GraphError> {
        Ok(self
            .tile_of(id)?
            .and_then(|tile| tile.node(id).map(|node| node.position)))
    }

    /// The start and end nodes of an edge.
    pub fn edge_nodes(&self, id: GraphId) -> Result<Option<(GraphId, GraphId)>, GraphError> {
        Ok(self
            .tile_of(id)?
            .and_then(|tile| tile.edge(id).map(|edge| (edge.start_node, edge.end_node))))
    }

    /// Approximate size of the cached tiles, in bytes.
    #[inline]
    pub fn cache_size(&self) -> usize {
        self.cache_size.load(Ordering::Relaxed)
    }

    /// Number of tile ids with a cached lookup result.
    #[inline]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    #[inline]
    pub fn over_committed(&self) -> bool {
        self.cache_size() > self.max_cache_size
    }

    /// Drops every cached tile.
    pub fn clear(&self) {
        self.cache.clear();
        self.cache_size.store(0, Ordering::Relaxed);
    }

    /// Drops the cached tiles if they exceed the budget, returning
    /// whether anything was dropped.
    pub fn trim(&self) -> bool {
        if !self.over_committed() {
            return false;
        }

        debug!(
            "Tile cache over budget ({}B > {}B), clearing",
            self.cache_size(),
            self.max_cache_size
        );

        self.clear();
        true
    }
}

/// Holds on to the most recently requested tile so a search walking
/// through one tile does not go back to the shared cache for every node.
#[derive(Debug)]
pub struct TileCursor<'r> {
    reader: &'r GraphReader,
    tile: Option<Arc<GraphTile>>,
}

impl<'r> TileCursor<'r> {
    pub fn new(reader: &'r GraphReader) -> Self {
        Self { reader, tile: None }
    }

    pub fn get(&mut self, id: GraphId) -> Result<Option<Arc<GraphTile>>, GraphError> {
        let current = self.tile.as_ref().map(|tile| tile.id());

        if current != Some(id.tile()) || !id.is_valid() {
            self.tile = self.reader.tile_of(id)?;
        }

        Ok(self.tile.clone())
    }
}
