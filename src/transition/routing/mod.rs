//! Shortest-path search between the candidates of consecutive states.

mod label;
mod search;
mod turn;


pub use label::*;
pub use search::*;
pub use turn::*;
