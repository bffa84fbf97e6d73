//! Reconstruction of the traversed edges from a decoded path.

mod construct;
mod segment;

#[cfg(test)]
mod test;

pub use construct::*;
pub use segment::*;
