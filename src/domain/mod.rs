//! Domain layer - Core migration types and port definitions
//!
//! This module defines the data model shared by every phase and the traits
//! (ports) that cluster adapters implement.

pub mod ports;

pub use ports::*;
