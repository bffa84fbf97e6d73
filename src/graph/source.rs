use crate::graph::{GraphError, GraphTile, TileId};

use rustc_hash::FxHashMap;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

/// Backing storage the [`GraphReader`](crate::graph::GraphReader) loads
/// tiles from.
///
/// A tile which does not exist is not an error, and is returned as `None`.
pub trait TileSource: Send + Sync + Debug {
    fn load(&self, tile: TileId) -> Result<Option<GraphTile>, GraphError>;
}

/// Keeps every tile in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryTileSource {
    tiles: FxHashMap<TileId, GraphTile>,
}

impl MemoryTileSource {
    pub fn new(tiles: impl IntoIterator<Item = GraphTile>) -> Self {
        Self {
            tiles: tiles.into_iter().map(|tile| (tile.id(), tile)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl TileSource for MemoryTileSource {
    fn load(&self, tile: TileId) -> Result<Option<GraphTile>, GraphError> {
        Ok(self.tiles.get(&tile).cloned())
    }
}

/// Reads tiles stored as `<tile id>.json` files within a directory.
#[derive(Debug, Clone)]
pub struct DirectoryTileSource {
    root: PathBuf,
}

impl DirectoryTileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tile_path(&self, tile: TileId) -> PathBuf {
        self.root.join(format!("{tile}.json"))
    }

    /// Writes the tiles into the directory, replacing any tile files
    /// of the same id.
    pub fn write<'a>(&self, tiles: impl IntoIterator<Item = &'a GraphTile>) -> Result<(), GraphError> {
        for tile in tiles {
            let io = |source| GraphError::Io {
                tile: tile.id(),
                source,
            };

            std::fs::create_dir_all(&self.root).map_err(io)?;
            let file = File::create(self.tile_path(tile.id())).map_err(io)?;

            serde_json::to_writer(BufWriter::new(file), tile).map_err(|source| {
                GraphError::Decode {
                    tile: tile.id(),
                    source,
                }
            })?;
        }

        Ok(())
    }
}

impl TileSource for DirectoryTileSource {
    fn load(&self, tile: TileId) -> Result<Option<GraphTile>, GraphError> {
        let file = match File::open(self.tile_path(tile)) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(GraphError::Io { tile, source }),
        };

        serde_json::from_reader(BufReader::new(file))
            .map(Some)
            .map_err(|source| GraphError::Decode { tile, source })
    }
}
