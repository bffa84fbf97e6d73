//! Process-level helpers.

#[cfg(feature = "tracing")]
pub mod trace;
