//! The tiled, directed road network matched against.
//!
//! Nodes and edges are grouped into square [tiles](GraphTile) which are
//! loaded lazily from a [`TileSource`] by the [`GraphReader`].

mod builder;
mod edge;
mod error;
mod id;
mod node;
mod reader;
mod source;
mod tile;


pub use builder::*;
pub use edge::*;
pub(crate) use edge::{ShapePiece, shape_pieces};
pub use error::*;
pub use id::*;
pub use node::*;
pub use reader::*;
pub use source::*;
pub use tile::*;
