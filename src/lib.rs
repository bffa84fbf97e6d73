#![doc = include_str!("../README.md")]

#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;
#[cfg_attr(feature = "mimalloc", global_allocator)]
#[cfg(feature = "mimalloc")]
static GLOBAL: MiMalloc = MiMalloc;

pub mod candidate;
pub mod costing;
pub mod geometry;
pub mod graph;
pub mod transition;
pub mod util;

#[doc(inline)]
pub use candidate::{Candidate, CandidateGridQuery, CandidateQuery};
#[doc(inline)]
pub use costing::{Costing, TravelMode};
#[doc(inline)]
pub use graph::{GraphError, GraphId, GraphReader};
#[doc(inline)]
pub use transition::{
    ConfigError, EdgeSegment, FactoryConfig, MapMatcher, MapMatcherFactory, MatchError,
    MatchResult, MatcherOptions, Measurement, RouteError,
};
