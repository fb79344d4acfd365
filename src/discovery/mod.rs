//! Resource Discovery Module
//!
//! Finds the resource instances eligible for migration: catalog filtering,
//! bounded concurrent listing and deterministic ranking.

pub mod filter;
pub mod lister;
pub mod pipeline;
pub mod ranker;

pub use filter::*;
pub use lister::*;
pub use pipeline::*;
pub use ranker::*;
