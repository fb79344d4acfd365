//! Manifest Module
//!
//! The durable interchange format between phases: untyped documents, their
//! on-disk codec and naming, and the writer for exported trees.

pub mod codec;
pub mod document;
pub mod layout;
pub mod writer;

pub use codec::*;
pub use document::*;
pub use layout::*;
pub use writer::*;
