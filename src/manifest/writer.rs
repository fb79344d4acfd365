//! Manifest Writer
//!
//! Serializes discovered instances into one file each, and failed resource
//! types into a parallel failures record. Writes never abort the batch:
//! every failure is collected and returned.

use crate::domain::ports::{DiscoveredResourceGroup, ResourceTypeDescriptor, ResourceTypeError};
use crate::error::{Error, ListFailureKind, Result};
use crate::manifest::codec::DocumentFormat;
use crate::manifest::document::ManifestDocument;
use crate::manifest::layout::ManifestName;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the manifest writer
#[derive(Debug, Clone, Default)]
pub struct WriterConfig {
    /// Serialization for manifests and failure records
    pub format: DocumentFormat,
}

// =============================================================================
// Write Failures
// =============================================================================

/// A single file that could not be written
#[derive(Debug)]
pub struct WriteFailure {
    /// Target path, when one could be computed
    pub path: Option<PathBuf>,
    pub error: Error,
}

impl WriteFailure {
    fn at(path: PathBuf, error: Error) -> Self {
        Self {
            path: Some(path),
            error,
        }
    }
}

/// Failure record written for each type whose listing failed
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord<'a> {
    #[serde(flatten)]
    pub resource: &'a ResourceTypeDescriptor,
    pub reason: ListFailureKind,
    pub error: &'a str,
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Manifest Writer
// =============================================================================

/// Writes exported manifests and failure records
pub struct ManifestWriter {
    config: WriterConfig,
}

impl ManifestWriter {
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Write every instance of every group into `dir`.
    ///
    /// Groups are written in the order given; the caller ranks them first.
    pub async fn write_groups(
        &self,
        groups: &[DiscoveredResourceGroup],
        dir: &Path,
    ) -> Vec<WriteFailure> {
        let mut failures = Vec::new();
        let mut written: HashSet<String> = HashSet::new();

        for group in groups {
            if group.resource.kind.is_empty() {
                debug!("Skipping {} with empty kind", group.resource.name);
                continue;
            }

            info!(
                "Writing {} {} ({} objects)",
                group.resource.name,
                group.resource.group_version,
                group.objects.len()
            );

            for object in &group.objects {
                let doc = ManifestDocument::new(object.clone());
                let Some(name) = ManifestName::of(&doc) else {
                    failures.push(WriteFailure {
                        path: None,
                        error: Error::MalformedManifest {
                            path: dir.to_path_buf(),
                            reason: format!(
                                "{} instance without kind or metadata.name",
                                group.resource
                            ),
                        },
                    });
                    continue;
                };

                let file_name = name.file_name(self.config.format);
                let path = dir.join(&file_name);

                if !written.insert(file_name.clone()) {
                    warn!("Name collision on {}, keeping the first instance", file_name);
                    failures.push(WriteFailure::at(path, Error::NameCollision { file_name }));
                    continue;
                }

                if let Err(error) = self.write_document(&path, doc.as_value()).await {
                    failures.push(WriteFailure::at(path, error));
                }
            }
        }

        failures
    }

    /// Write one failure record per failed resource type into `dir`
    pub async fn write_failures(
        &self,
        errors: &[ResourceTypeError],
        dir: &Path,
    ) -> Vec<WriteFailure> {
        let mut failures = Vec::new();
        let recorded_at = Utc::now();

        for err in errors {
            if err.resource.kind.is_empty() {
                continue;
            }

            let path = dir.join(format!(
                "{}.{}",
                err.resource.name,
                self.config.format.extension()
            ));
            let record = FailureRecord {
                resource: &err.resource,
                reason: err.error.kind,
                error: &err.error.message,
                recorded_at,
            };

            if let Err(error) = self.write_document(&path, &record).await {
                failures.push(WriteFailure::at(path, error));
            }
        }

        failures
    }

    async fn write_document<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let text = self.config.format.encode(value)?;
        fs::write(path, text)
            .await
            .map_err(|source| Error::ManifestWrite {
                path: path.to_path_buf(),
                source,
            })
    }
}
