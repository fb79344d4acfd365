//! Apply Engine
//!
//! Turns each exported manifest plus its transform into an output manifest.
//! Every manifest resolves independently to emitted, skipped (white-out) or
//! failed; no failure stops the batch.

use crate::error::{Error, Result};
use crate::manifest::codec::DocumentFormat;
use crate::manifest::layout::{load_manifest, manifest_paths, ExportedManifest};
use crate::transform::index::TransformIndex;
use crate::transform::patch::{annotation_normalization, TransformDescriptor};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the apply engine
#[derive(Debug, Clone)]
pub struct ApplyConfig {
    /// Root of the output tree
    pub output_root: PathBuf,
    /// Serialization of output manifests
    pub format: DocumentFormat,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            format: DocumentFormat::Yaml,
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Terminal state of one manifest
#[derive(Debug)]
pub enum ManifestOutcome {
    /// Output written to `output`
    Emitted { output: PathBuf },
    /// White-out marker present
    Skipped,
    Failed(Error),
}

impl ManifestOutcome {
    pub fn is_emitted(&self) -> bool {
        matches!(self, ManifestOutcome::Emitted { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ManifestOutcome::Skipped)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ManifestOutcome::Failed(_))
    }
}

/// Combined report for one apply phase
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Outcome per exported manifest path
    pub outcomes: Vec<(PathBuf, ManifestOutcome)>,
}

impl ApplyReport {
    pub fn emitted(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_emitted()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failed()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &Error)> {
        self.outcomes.iter().filter_map(|(path, outcome)| match outcome {
            ManifestOutcome::Failed(e) => Some((path, e)),
            _ => None,
        })
    }

    pub fn outcome(&self, manifest: &Path) -> Option<&ManifestOutcome> {
        self.outcomes
            .iter()
            .find(|(p, _)| p == manifest)
            .map(|(_, o)| o)
    }
}

// =============================================================================
// Apply Engine
// =============================================================================

pub struct ApplyEngine {
    config: ApplyConfig,
    index: TransformIndex,
}

impl ApplyEngine {
    pub fn new(config: ApplyConfig, index: TransformIndex) -> Self {
        Self { config, index }
    }

    /// Apply transforms to every manifest under the export root.
    ///
    /// Fails only if the export root cannot be read.
    pub async fn apply_all(&self) -> Result<ApplyReport> {
        let paths = manifest_paths(self.index.export_root()).await?;
        let mut report = ApplyReport::default();

        for path in paths {
            let outcome = self.apply_path(&path).await;
            match &outcome {
                ManifestOutcome::Emitted { output } => debug!("Wrote {:?}", output),
                ManifestOutcome::Skipped => {
                    info!("Skipping file {:?} because it should be deleted", path)
                }
                ManifestOutcome::Failed(e) => warn!("Failed {:?}: {}", path, e),
            }
            report.outcomes.push((path, outcome));
        }

        info!(
            "Apply complete: {} emitted, {} skipped, {} failed",
            report.emitted(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    /// Run one manifest file through the state machine
    pub async fn apply_path(&self, path: &Path) -> ManifestOutcome {
        match self.check_whiteout(path).await {
            Ok(true) => return ManifestOutcome::Skipped,
            Ok(false) => {}
            Err(e) => return ManifestOutcome::Failed(e),
        }

        let manifest = match load_manifest(path).await {
            Ok(m) => m,
            Err(e) => return ManifestOutcome::Failed(e),
        };

        match self.apply_manifest(manifest).await {
            Ok(output) => ManifestOutcome::Emitted { output },
            Err(e) => ManifestOutcome::Failed(e),
        }
    }

    /// Only a definite "not found" lets the manifest proceed
    async fn check_whiteout(&self, path: &Path) -> Result<bool> {
        let whiteout = self.index.whiteout_path(path)?;
        fs::try_exists(&whiteout)
            .await
            .map_err(|source| Error::WhiteoutUnreadable {
                path: whiteout,
                source,
            })
    }

    /// Load transform, normalize annotations, patch and write
    async fn apply_manifest(&self, manifest: ExportedManifest) -> Result<PathBuf> {
        let transform_path = self.index.transform_path(&manifest.path)?;
        let transform = TransformDescriptor::load(&transform_path).await?;

        let mut document = manifest.document;
        if let Some(implicit) = annotation_normalization(&document) {
            implicit.apply_to(&mut document, &manifest.path)?;
        }
        transform.apply_to(&mut document, &manifest.path)?;

        let output = self
            .index
            .output_path(&self.config.output_root, &manifest.path, self.config.format)?;
        let text = self.config.format.encode(document.as_value())?;

        if let Some(dir) = output.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| Error::ManifestWrite {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }
        fs::write(&output, text)
            .await
            .map_err(|source| Error::ManifestWrite {
                path: output.clone(),
                source,
            })?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        export: PathBuf,
        transform: PathBuf,
        output: PathBuf,
    }

    impl Fixture {
        async fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let export = tmp.path().join("export");
            let transform = tmp.path().join("transform");
            let output = tmp.path().join("output");
            fs::create_dir_all(&export).await.unwrap();
            fs::create_dir_all(&transform).await.unwrap();
            Self {
                _tmp: tmp,
                export,
                transform,
                output,
            }
        }

        fn engine(&self) -> ApplyEngine {
            ApplyEngine::new(
                ApplyConfig {
                    output_root: self.output.clone(),
                    format: DocumentFormat::Yaml,
                },
                TransformIndex::new(&self.export, &self.transform),
            )
        }

        async fn manifest(&self, stem: &str, doc: Value) -> PathBuf {
            let path = self.export.join(format!("{}.yaml", stem));
            fs::write(&path, DocumentFormat::Yaml.encode(&doc).unwrap())
                .await
                .unwrap();
            path
        }

        async fn patch(&self, stem: &str, patch: &str) {
            fs::write(self.transform.join(format!("{}.patch.json", stem)), patch)
                .await
                .unwrap();
        }

        async fn whiteout(&self, stem: &str) {
            fs::write(self.transform.join(format!("{}.wh", stem)), "")
                .await
                .unwrap();
        }

        async fn output(&self, stem: &str) -> Value {
            let text = fs::read_to_string(self.output.join(format!("{}.yaml", stem)))
                .await
                .unwrap();
            serde_yaml::from_str(&text).unwrap()
        }
    }

    fn config_map(annotations: Option<Value>) -> Value {
        let mut doc = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "cfg", "namespace": "myns" },
            "data": { "key": "v1" }
        });
        if let Some(a) = annotations {
            doc["metadata"]["annotations"] = a;
        }
        doc
    }

    #[tokio::test]
    async fn test_whiteout_is_idempotent() {
        let fx = Fixture::new().await;
        let path = fx.manifest("Secret_myns_s1", json!({"kind": "Secret"})).await;
        fx.whiteout("Secret_myns_s1").await;

        let engine = fx.engine();
        assert!(engine.apply_path(&path).await.is_skipped());
        assert!(engine.apply_path(&path).await.is_skipped());
        assert!(!fx.output.join("Secret_myns_s1.yaml").exists());
    }

    #[tokio::test]
    async fn test_unknown_whiteout_state_fails_manifest() {
        let fx = Fixture::new().await;
        let path = fx.manifest("Secret_myns_s1", json!({"kind": "Secret"})).await;
        fx.patch("Secret_myns_s1", "[]").await;

        // A regular file where the transform directory should be
        let blocked = fx.transform.join("blocked");
        fs::write(&blocked, "").await.unwrap();
        let engine = ApplyEngine::new(
            ApplyConfig {
                output_root: fx.output.clone(),
                format: DocumentFormat::Yaml,
            },
            TransformIndex::new(&fx.export, &blocked),
        );

        assert_matches!(
            engine.apply_path(&path).await,
            ManifestOutcome::Failed(Error::WhiteoutUnreadable { .. })
        );
        assert!(!fx.output.join("Secret_myns_s1.yaml").exists());
    }

    #[tokio::test]
    async fn test_empty_patch_is_byte_identical() {
        let fx = Fixture::new().await;
        let doc = config_map(Some(json!({ "team": "a" })));
        let path = fx.manifest("ConfigMap_myns_cfg", doc).await;
        fx.patch("ConfigMap_myns_cfg", "[]").await;

        let outcome = fx.engine().apply_path(&path).await;
        assert_matches!(outcome, ManifestOutcome::Emitted { .. });

        let original = fs::read(&path).await.unwrap();
        let written = fs::read(fx.output.join("ConfigMap_myns_cfg.yaml")).await.unwrap();
        assert_eq!(original, written);
    }

    #[tokio::test]
    async fn test_annotation_normalization() {
        let fx = Fixture::new().await;
        let path = fx.manifest("ConfigMap_myns_cfg", config_map(None)).await;
        fx.patch(
            "ConfigMap_myns_cfg",
            r#"[{"op":"add","path":"/metadata/annotations/foo","value":"bar"}]"#,
        )
        .await;

        assert!(fx.engine().apply_path(&path).await.is_emitted());
        let out = fx.output("ConfigMap_myns_cfg").await;
        assert_eq!(out["metadata"]["annotations"], json!({ "foo": "bar" }));
    }

    #[tokio::test]
    async fn test_existing_annotations_are_kept() {
        let fx = Fixture::new().await;
        let path = fx
            .manifest("ConfigMap_myns_cfg", config_map(Some(json!({ "team": "a" }))))
            .await;
        fx.patch(
            "ConfigMap_myns_cfg",
            r#"[{"op":"add","path":"/metadata/annotations/foo","value":"bar"}]"#,
        )
        .await;

        assert!(fx.engine().apply_path(&path).await.is_emitted());
        let out = fx.output("ConfigMap_myns_cfg").await;
        assert_eq!(
            out["metadata"]["annotations"],
            json!({ "team": "a", "foo": "bar" })
        );
    }

    #[tokio::test]
    async fn test_missing_transform_fails_manifest_only() {
        let fx = Fixture::new().await;
        let missing = fx.manifest("ConfigMap_myns_a", config_map(None)).await;
        fx.manifest("ConfigMap_myns_cfg", config_map(None)).await;
        fx.patch("ConfigMap_myns_cfg", "[]").await;

        let report = fx.engine().apply_all().await.unwrap();
        assert_eq!(report.emitted(), 1);
        assert_eq!(report.failed(), 1);
        assert_matches!(
            report.outcome(&missing),
            Some(ManifestOutcome::Failed(Error::TransformUnreadable { .. }))
        );
    }

    #[tokio::test]
    async fn test_invalid_patch_fails_without_output() {
        let fx = Fixture::new().await;
        let path = fx.manifest("ConfigMap_myns_cfg", config_map(None)).await;
        fx.patch(
            "ConfigMap_myns_cfg",
            r#"[{"op":"replace","path":"/spec/replicas","value":3}]"#,
        )
        .await;

        assert_matches!(
            fx.engine().apply_path(&path).await,
            ManifestOutcome::Failed(Error::PatchApply { .. })
        );
        assert!(!fx.output.join("ConfigMap_myns_cfg.yaml").exists());
    }

    #[tokio::test]
    async fn test_undecodable_patch() {
        let fx = Fixture::new().await;
        let path = fx.manifest("ConfigMap_myns_cfg", config_map(None)).await;
        fx.patch("ConfigMap_myns_cfg", "not a patch").await;

        assert_matches!(
            fx.engine().apply_path(&path).await,
            ManifestOutcome::Failed(Error::PatchDecode { .. })
        );
    }

    #[tokio::test]
    async fn test_unreadable_export_root_is_fatal() {
        let fx = Fixture::new().await;
        let engine = ApplyEngine::new(
            ApplyConfig::default(),
            TransformIndex::new(fx.export.join("absent"), &fx.transform),
        );
        let err = engine.apply_all().await.unwrap_err();
        assert!(err.is_fatal());
    }
}
