use crate::costing::TravelMode;
use crate::graph::{GraphError, GraphId};
use crate::transition::StateId;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown travel mode `{0}`")]
    UnknownMode(String),

    #[error("no costing is registered for travel mode `{0}`")]
    UnregisteredMode(TravelMode),

    #[error("configuration section `{0}` must be an object")]
    NotAnObject(String),

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("could not read configuration: {0}")]
    Unreadable(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("edge {0} does not exist in the graph")]
    DanglingEdge(GraphId),

    #[error("segment {index} on edge {edge} has an invalid range [{from}, {to}]")]
    InvalidRange {
        index: usize,
        edge: GraphId,
        from: f64,
        to: f64,
    },

    #[error("segment {index} does not continue from the segment before it")]
    NotAdjoined { index: usize },

    #[error("edge {0} is traversed more than once")]
    Loop(GraphId),

    #[error("no route was found from state {from} to state {to}")]
    Disconnected { from: StateId, to: StateId },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Error, Debug)]
pub enum MatchError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("could not reconstruct the matched route: {0}")]
    Route(#[from] RouteError),
}
