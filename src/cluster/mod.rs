//! Cluster Adapters
//!
//! Kubernetes implementations of the catalog and listing ports, plus
//! kubeconfig context resolution.

pub mod catalog;
pub mod context;
pub mod lister;

pub use catalog::*;
pub use context::*;
pub use lister::*;
