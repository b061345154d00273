//! Shared library for the earthquake relay: upstream retrieval, the seismic
//! data model, the relay core and the polling ingestor. Each area sits behind
//! its own cargo feature.

#[cfg(feature = "retrieve")]
pub mod retrieve;

#[cfg(feature = "seismic")]
pub mod seismic;

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "ingestors")]
pub mod ingestors;
