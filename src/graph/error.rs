use crate::graph::TileId;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("could not access tile {tile}: {source}")]
    Io {
        tile: TileId,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode tile {tile}: {source}")]
    Decode {
        tile: TileId,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not read graph description: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("could not parse graph description: {0}")]
    Description(#[from] serde_json::Error),

    #[error("edge {edge} references node {node}, which does not exist")]
    MissingNode { edge: usize, node: usize },
}
