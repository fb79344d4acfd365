//! Transform Module
//!
//! Transform documents (JSON Patch), white-out markers, the path index that
//! correlates them with exported manifests, and the built-in generator.

pub mod generator;
pub mod index;
pub mod patch;

pub use generator::*;
pub use index::*;
pub use patch::*;
