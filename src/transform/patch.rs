//! Transform Documents
//!
//! A transform is an ordered JSON Patch (RFC 6902) for one manifest.

use crate::error::{Error, Result};
use crate::manifest::document::ManifestDocument;
use json_patch::{AddOperation, Patch, PatchOperation, RemoveOperation, ReplaceOperation};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Ordered patch operations for one manifest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformDescriptor {
    operations: Vec<PatchOperation>,
}

impl TransformDescriptor {
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self { operations }
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn add(&mut self, path: impl Into<String>, value: Value) {
        self.operations.push(PatchOperation::Add(AddOperation {
            path: path.into(),
            value,
        }));
    }

    pub fn remove(&mut self, path: impl Into<String>) {
        self.operations
            .push(PatchOperation::Remove(RemoveOperation { path: path.into() }));
    }

    pub fn replace(&mut self, path: impl Into<String>, value: Value) {
        self.operations.push(PatchOperation::Replace(ReplaceOperation {
            path: path.into(),
            value,
        }));
    }

    /// Decode a JSON Patch document; `path` is used for error reporting
    pub fn decode(bytes: &[u8], path: &Path) -> Result<Self> {
        let patch: Patch = serde_json::from_slice(bytes).map_err(|source| Error::PatchDecode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(patch.0))
    }

    /// Read and decode the transform at `path`
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .await
            .map_err(|source| Error::TransformUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Self::decode(&bytes, path)
    }

    /// Encode as a pretty-printed JSON Patch document
    pub fn encode(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&Patch(self.operations.clone()))?;
        out.push('\n');
        Ok(out)
    }

    /// Apply to `doc` atomically: on failure `doc` is left unchanged
    pub fn apply_to(&self, doc: &mut ManifestDocument, source: &Path) -> Result<()> {
        let mut patched = doc.as_value().clone();
        json_patch::patch(&mut patched, &self.operations).map_err(|e| Error::PatchApply {
            path: PathBuf::from(source),
            source: e,
        })?;
        *doc.as_value_mut() = patched;
        Ok(())
    }
}

/// Implicit patch that introduces an empty annotations mapping.
///
/// Returns `None` when the manifest already carries annotations.
pub fn annotation_normalization(doc: &ManifestDocument) -> Option<TransformDescriptor> {
    if !doc.has_no_annotations() {
        return None;
    }
    let mut patch = TransformDescriptor::default();
    patch.add("/metadata/annotations", json!({}));
    Some(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn src() -> &'static Path {
        Path::new("export/ConfigMap_myns_cfg.yaml")
    }

    #[test]
    fn test_decode_and_apply() {
        let patch = TransformDescriptor::decode(
            br#"[{"op":"add","path":"/data/key","value":"v2"},{"op":"remove","path":"/data/old"}]"#,
            src(),
        )
        .unwrap();
        assert_eq!(patch.len(), 2);

        let mut doc = ManifestDocument::new(json!({
            "kind": "ConfigMap",
            "data": { "old": "x" }
        }));
        patch.apply_to(&mut doc, src()).unwrap();
        assert_eq!(doc.as_value()["data"], json!({ "key": "v2" }));
    }

    #[test]
    fn test_decode_error_is_distinct() {
        let err = TransformDescriptor::decode(b"{\"op\":", src()).unwrap_err();
        assert_matches!(err, Error::PatchDecode { .. });

        let err = TransformDescriptor::decode(br#"[{"op":"explode","path":"/a"}]"#, src())
            .unwrap_err();
        assert_matches!(err, Error::PatchDecode { .. });
    }

    #[test]
    fn test_structural_failure_leaves_document_untouched() {
        let patch =
            TransformDescriptor::decode(br#"[{"op":"add","path":"/data/a","value":"1"},{"op":"remove","path":"/spec/missing"}]"#, src())
                .unwrap();
        let original = json!({ "kind": "ConfigMap", "data": {} });
        let mut doc = ManifestDocument::new(original.clone());

        let err = patch.apply_to(&mut doc, src()).unwrap_err();
        assert_matches!(err, Error::PatchApply { .. });
        assert_eq!(doc.as_value(), &original);
    }

    #[test]
    fn test_annotation_normalization() {
        let bare = ManifestDocument::new(json!({ "metadata": { "name": "cfg" } }));
        let patch = annotation_normalization(&bare).unwrap();
        assert_eq!(patch.len(), 1);

        let annotated = ManifestDocument::new(json!({
            "metadata": { "name": "cfg", "annotations": { "a": "b" } }
        }));
        assert!(annotation_normalization(&annotated).is_none());
    }

    #[test]
    fn test_encode_round_trip() {
        let mut patch = TransformDescriptor::default();
        patch.remove("/metadata/uid");
        patch.replace("/spec/containers/0/image", json!("quay.io/app:1"));

        let text = patch.encode().unwrap();
        let decoded = TransformDescriptor::decode(text.as_bytes(), src()).unwrap();
        assert_eq!(decoded, patch);
        assert!(text.contains("\"op\": \"remove\""));
    }
}
