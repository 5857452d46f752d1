//! Structured-control-flow lowering built on the `recast-sr` engine.
//!
//! [`steps`] holds individual search-and-replace steps; [`Pipeline`] runs a
//! sequence of them over a whole program.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, PipelineReport};
