//! Snapping of measurements onto nearby edges.

mod entry;
mod grid;
mod query;

#[cfg(test)]
mod test;

pub use entry::*;
pub use grid::*;
pub use query::*;
