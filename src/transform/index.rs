//! Transform Index
//!
//! Pure path mapping between the export tree, the transform tree and the
//! output tree. Trees correlate by relative path alone.

use crate::error::{Error, Result};
use crate::manifest::codec::DocumentFormat;
use std::path::{Path, PathBuf};

/// Suffix of transform (JSON Patch) documents
pub const TRANSFORM_SUFFIX: &str = "patch.json";

/// Suffix of white-out markers
pub const WHITEOUT_SUFFIX: &str = "wh";

/// Maps exported manifest paths to their transform artifacts
#[derive(Debug, Clone)]
pub struct TransformIndex {
    export_root: PathBuf,
    transform_root: PathBuf,
}

impl TransformIndex {
    pub fn new(export_root: impl Into<PathBuf>, transform_root: impl Into<PathBuf>) -> Self {
        Self {
            export_root: export_root.into(),
            transform_root: transform_root.into(),
        }
    }

    pub fn export_root(&self) -> &Path {
        &self.export_root
    }

    pub fn transform_root(&self) -> &Path {
        &self.transform_root
    }

    /// Path of `manifest` relative to the export root
    pub fn relative<'a>(&self, manifest: &'a Path) -> Result<&'a Path> {
        manifest
            .strip_prefix(&self.export_root)
            .map_err(|_| Error::OutsideExportRoot {
                path: manifest.to_path_buf(),
                root: self.export_root.clone(),
            })
    }

    /// `<transform-root>/<rel-dir>/<stem>.patch.json`
    pub fn transform_path(&self, manifest: &Path) -> Result<PathBuf> {
        self.sibling(&self.transform_root, manifest, TRANSFORM_SUFFIX)
    }

    /// `<transform-root>/<rel-dir>/<stem>.wh`
    pub fn whiteout_path(&self, manifest: &Path) -> Result<PathBuf> {
        self.sibling(&self.transform_root, manifest, WHITEOUT_SUFFIX)
    }

    /// `<output-root>/<rel-dir>/<stem>.<ext>`
    pub fn output_path(
        &self,
        output_root: &Path,
        manifest: &Path,
        format: DocumentFormat,
    ) -> Result<PathBuf> {
        self.sibling(output_root, manifest, format.extension())
    }

    fn sibling(&self, root: &Path, manifest: &Path, suffix: &str) -> Result<PathBuf> {
        let relative = self.relative(manifest)?;
        let stem = relative
            .file_stem()
            .ok_or_else(|| Error::MalformedManifest {
                path: manifest.to_path_buf(),
                reason: "path has no file name".into(),
            })?
            .to_string_lossy();

        let file_name = format!("{}.{}", stem, suffix);
        Ok(match relative.parent() {
            Some(dir) => root.join(dir).join(file_name),
            None => root.join(file_name),
        })
    }
}
