//! Namespace Migrator - Export, transform and re-apply namespace resources
//!
//! Moves the workload-defining resources of one Kubernetes namespace from a
//! source cluster to a target cluster as plain manifest files.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                            Export Phase                               │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌───────────┐  │
//! │  │   Catalog   │──▶│   Filter    │──▶│   Lister    │──▶│  Ranker   │  │
//! │  │ (discovery) │   │ (verbs/kind)│   │ (bounded)   │   │ (stable)  │  │
//! │  └─────────────┘   └─────────────┘   └─────────────┘   └─────┬─────┘  │
//! │                                                              │        │
//! │                                      ┌───────────────────────┘        │
//! │                                      ▼                                │
//! │                        ┌───────────────────────────┐                  │
//! │                        │      Manifest Writer      │                  │
//! │                        │  resources/ + failures/   │                  │
//! │                        └─────────────┬─────────────┘                  │
//! ├──────────────────────────────────────┼────────────────────────────────┤
//! │                   Transform Phase    ▼                                │
//! │          ┌─────────────────────┐   ┌─────────────────────┐            │
//! │          │ Transform Generator │──▶│   Transform Index   │            │
//! │          │  (.patch.json/.wh)  │   │  (path correlation) │            │
//! │          └─────────────────────┘   └──────────┬──────────┘            │
//! ├───────────────────────────────────────────────┼───────────────────────┤
//! │                     Apply Phase               ▼                       │
//! │                        ┌───────────────────────────┐                  │
//! │                        │       Apply Engine        │                  │
//! │                        │ white-out / patch / write │                  │
//! │                        └───────────────────────────┘                  │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`discovery`]: Catalog filtering, bounded listing and ranking
//! - [`manifest`]: Document tree, codec, naming and export writer
//! - [`transform`]: JSON Patch transforms, white-outs and the path index
//! - [`apply`]: Per-manifest apply state machine
//! - [`cluster`]: Kubernetes adapters for the discovery ports
//! - [`domain`]: Core data model and port traits
//! - [`error`]: Error types and classification

pub mod apply;
pub mod cluster;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod transform;

// Re-export commonly used types
pub use apply::{ApplyConfig, ApplyEngine, ApplyReport, ManifestOutcome};

pub use cluster::{connect, resolve_target, KubeCatalog, KubeLister, TargetContext};

pub use discovery::{
    CatalogFilter, DiscoveryConfig, DiscoveryOutcome, DiscoveryPipeline, ScopePolicy, SortKey,
};

pub use domain::ports::{
    DiscoveredResourceGroup, ResourceCatalog, ResourceCatalogRef, ResourceLister,
    ResourceListerRef, ResourceTypeDescriptor, ResourceTypeError,
};

pub use error::{Error, ErrorClass, ListError, ListFailureKind, Result};

pub use manifest::{
    DocumentFormat, ExportedManifest, ManifestDocument, ManifestName, ManifestWriter,
    WriteFailure, WriterConfig, FAILURES_DIR, RESOURCES_DIR,
};

pub use transform::{
    GeneratedTransform, GenerationReport, GeneratorConfig, TransformDescriptor,
    TransformGenerator, TransformIndex,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
