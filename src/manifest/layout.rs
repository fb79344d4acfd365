//! Export Tree Layout
//!
//! File naming for exported manifests and recursive loading of an export
//! tree. The file name is the only key that correlates a manifest with its
//! transform, so it must be unique within one export.

use crate::error::{Error, Result};
use crate::manifest::codec::DocumentFormat;
use crate::manifest::document::{ManifestDocument, CLUSTER_SCOPED};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Subdirectory holding exported manifests
pub const RESOURCES_DIR: &str = "resources";

/// Subdirectory holding failure records
pub const FAILURES_DIR: &str = "failures";

// =============================================================================
// Manifest Naming
// =============================================================================

/// Identity of an exported manifest: (kind, namespace-or-sentinel, name)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestName {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ManifestName {
    pub fn new(kind: &str, namespace: Option<&str>, name: &str) -> Self {
        let namespace = match namespace {
            Some(ns) if !ns.is_empty() => ns,
            _ => CLUSTER_SCOPED,
        };

        Self {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Derive the identity of a document; requires kind and metadata.name
    pub fn of(doc: &ManifestDocument) -> Option<Self> {
        let kind = doc.kind();
        if kind.is_empty() {
            return None;
        }
        Some(Self::new(kind, doc.namespace(), doc.name()?))
    }

    /// `{Kind}_{Namespace}_{Name}`
    pub fn stem(&self) -> String {
        format!("{}_{}_{}", self.kind, self.namespace, self.name)
    }

    pub fn file_name(&self, format: DocumentFormat) -> String {
        format!("{}.{}", self.stem(), format.extension())
    }
}

// =============================================================================
// Export Tree Loading
// =============================================================================

/// A manifest loaded from an export tree
#[derive(Debug, Clone)]
pub struct ExportedManifest {
    /// Full path of the file
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub document: ManifestDocument,
}

/// A file that could not be loaded
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: Error,
}

/// Result of walking an export tree
#[derive(Debug, Default)]
pub struct ExportTree {
    pub manifests: Vec<ExportedManifest>,
    pub failures: Vec<LoadFailure>,
}

/// Depth below the export root of `<namespace>/failures`
const FAILURES_DEPTH: usize = 2;

/// Collect manifest file paths under `root`, sorted, skipping failure records.
///
/// Failure records live only at `<root>/<namespace>/failures`; a directory
/// named `failures` anywhere else is walked like any other. An unreadable
/// root is a setup error; unreadable entries below it are skipped.
pub async fn manifest_paths(root: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(root).await.map_err(|source| Error::RootDirectory {
        path: root.to_path_buf(),
        source,
    })?;

    let mut current = (root.to_path_buf(), 0);
    let mut pending: Vec<(PathBuf, usize)> = Vec::new();
    let mut files = Vec::new();

    loop {
        let (dir, depth) = &current;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) if *depth == 0 => {
                    return Err(Error::RootDirectory {
                        path: root.to_path_buf(),
                        source,
                    })
                }
                Err(e) => {
                    warn!("Cannot list entries of {:?}: {}", dir, e);
                    break;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(e) => {
                    warn!("Cannot stat {:?}: {}", path, e);
                    continue;
                }
            };

            if file_type.is_dir() {
                let child_depth = depth + 1;
                if child_depth == FAILURES_DEPTH && entry.file_name() == FAILURES_DIR {
                    debug!("Skipping failure records in {:?}", path);
                    continue;
                }
                pending.push((path, child_depth));
            } else if DocumentFormat::from_path(&path).is_some() {
                files.push(path);
            }
        }

        let mut next = None;
        while let Some((dir, depth)) = pending.pop() {
            match fs::read_dir(&dir).await {
                Ok(e) => {
                    next = Some((e, dir, depth));
                    break;
                }
                Err(e) => warn!("Cannot read directory {:?}: {}", dir, e),
            }
        }
        let Some((e, dir, depth)) = next else { break };
        entries = e;
        current = (dir, depth);
    }

    files.sort();
    Ok(files)
}

/// Read and decode one manifest file
pub async fn load_manifest(path: &Path) -> Result<ExportedManifest> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| Error::MalformedManifest {
        path: path.to_path_buf(),
        reason: "unrecognised file extension".into(),
    })?;

    let text = fs::read_to_string(path)
        .await
        .map_err(|source| Error::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;

    let value = format.decode(&text)?;
    if !value.is_object() {
        return Err(Error::MalformedManifest {
            path: path.to_path_buf(),
            reason: "document is not a mapping".into(),
        });
    }

    Ok(ExportedManifest {
        path: path.to_path_buf(),
        format,
        document: ManifestDocument::new(value),
    })
}

/// Load every manifest under `root`
pub async fn load_export_tree(root: &Path) -> Result<ExportTree> {
    let mut tree = ExportTree::default();

    for path in manifest_paths(root).await? {
        match load_manifest(&path).await {
            Ok(manifest) => tree.manifests.push(manifest),
            Err(error) => {
                warn!("Cannot load manifest {:?}: {}", path, error);
                tree.failures.push(LoadFailure { path, error });
            }
        }
    }

    Ok(tree)
}
