//! Apply Module
//!
//! Produces the final output tree from an export tree and a transform tree.

pub mod engine;

pub use engine::*;
