//! A hidden-Markov-model (HMM) map matcher.
//!
//! Every measurement of a trace becomes a column of hidden [states](State),
//! one per nearby [candidate](crate::Candidate). States are scored with
//! emission costs (how far the candidate is from the measurement) and
//! transition costs (how well the route between consecutive candidates
//! agrees with the straight line between their measurements), and the
//! cheapest path through the columns is decoded by a [`ViterbiSearch`].
//!
//! Matchers are obtained from a [`MapMatcherFactory`], which owns the
//! graph reader, the candidate index and the costing of every mode.

mod config;
mod error;
mod factory;
mod matcher;
mod matching;
mod measurement;
mod route;
mod routing;
mod state;
mod viterbi;


#[doc(inline)]
pub use config::*;
#[doc(inline)]
pub use error::*;
#[doc(inline)]
pub use factory::*;
#[doc(inline)]
pub use matcher::*;
#[doc(inline)]
pub use matching::*;
#[doc(inline)]
pub use measurement::*;
#[doc(inline)]
pub use route::*;
#[doc(inline)]
pub use routing::*;
#[doc(inline)]
pub use state::*;
#[doc(inline)]
pub use viterbi::*;
