//! Planar helpers for the short distances map matching works over.

mod approximator;
mod heading;


pub use approximator::*;
pub use heading::*;
