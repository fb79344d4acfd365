//! Error types for the namespace migrator
//!
//! Provides a single error type for every phase (export, transform, apply)
//! and classifies each error as fatal setup failure or recoverable per-item
//! failure.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the migrator
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Setup Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Kube context not found: {0}")]
    ContextNotFound(String),

    #[error("No kube context selected: current context is empty and --context is not set")]
    NoContextSelected,

    #[error("Context `{context}` does not select a namespace and --namespace is empty")]
    NamespaceNotResolved { context: String },

    #[error("Cannot open directory {path}: {source}")]
    RootDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("Resource catalog discovery failed: {0}")]
    CatalogDiscovery(String),

    // =========================================================================
    // Listing Errors
    // =========================================================================
    #[error("Listing {resource} failed: {source}")]
    List {
        resource: String,
        #[source]
        source: ListError,
    },

    // =========================================================================
    // Manifest Errors
    // =========================================================================
    #[error("Manifest {path} is malformed: {reason}")]
    MalformedManifest { path: PathBuf, reason: String },

    #[error("Manifest name collision: {file_name} was already written in this export")]
    NameCollision { file_name: String },

    #[error("Cannot write {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path {path} is not under export root {root}")]
    OutsideExportRoot { path: PathBuf, root: PathBuf },

    // =========================================================================
    // Transform Errors
    // =========================================================================
    #[error("Transform {path} could not be read: {source}")]
    TransformUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("White-out marker {path} could not be checked: {source}")]
    WhiteoutUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transform {path} is not a valid JSON Patch document: {source}")]
    PatchDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Patch could not be applied to {path}: {source}")]
    PatchApply {
        path: PathBuf,
        #[source]
        source: json_patch::PatchError,
    },

    // =========================================================================
    // Codec Errors
    // =========================================================================
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Listing Failures
// =============================================================================

/// Classification of a failed list call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListFailureKind {
    /// Caller is not authorized to list in the namespace
    Forbidden,
    /// The list verb is not supported on this resource
    MethodNotSupported,
    /// Resource could not be found, most likely a virtual resource
    NotFound,
    /// Anything else
    Other,
}

impl ListFailureKind {
    /// Classify an API status response
    pub fn from_status(code: u16, reason: &str) -> Self {
        match (code, reason) {
            (403, _) | (_, "Forbidden") => ListFailureKind::Forbidden,
            (405, _) | (_, "MethodNotAllowed") => ListFailureKind::MethodNotSupported,
            (404, _) | (_, "NotFound") => ListFailureKind::NotFound,
            _ => ListFailureKind::Other,
        }
    }
}

impl std::fmt::Display for ListFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListFailureKind::Forbidden => write!(f, "cannot list objects in namespace"),
            ListFailureKind::MethodNotSupported => {
                write!(f, "list method not supported on the resource")
            }
            ListFailureKind::NotFound => write!(f, "resource not found (virtual resource)"),
            ListFailureKind::Other => write!(f, "error listing objects"),
        }
    }
}

/// Error returned by a listing capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ListError {
    pub kind: ListFailureKind,
    pub message: String,
}

impl ListError {
    pub fn new(kind: ListFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<kube::Error> for ListError {
    fn from(err: kube::Error) -> Self {
        let kind = match &err {
            kube::Error::Api(resp) => ListFailureKind::from_status(resp.code, &resp.reason),
            _ => ListFailureKind::Other,
        };
        ListError::new(kind, err.to_string())
    }
}

// =============================================================================
// Error Classification
// =============================================================================

/// Scope of an error within a migration phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Environment or root directories unusable; aborts the phase
    Setup,
    /// One resource type could not be listed
    ResourceType,
    /// One manifest could not be written, transformed or patched
    Manifest,
}

impl Error {
    /// Determine the scope of this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Internal(_)
            | Error::Configuration(_)
            | Error::ContextNotFound(_)
            | Error::NoContextSelected
            | Error::NamespaceNotResolved { .. }
            | Error::RootDirectory { .. }
            | Error::Kube(_)
            | Error::Kubeconfig(_)
            | Error::CatalogDiscovery(_) => ErrorClass::Setup,

            Error::List { .. } => ErrorClass::ResourceType,

            _ => ErrorClass::Manifest,
        }
    }

    /// Check if this error aborts the phase
    pub fn is_fatal(&self) -> bool {
        matches!(self.class(), ErrorClass::Setup)
    }
}

/// Result type alias for the migrator
pub type Result<T> = std::result::Result<T, Error>;
