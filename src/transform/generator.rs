//! Transform Generator
//!
//! Derives a transform for every exported manifest: either a white-out
//! marker (the target cluster recreates or must not receive the resource)
//! or a JSON Patch that clears server-assigned fields and rewrites image
//! registries.

use crate::error::{Error, Result};
use crate::manifest::document::{pointer, ManifestDocument};
use crate::manifest::layout::{load_export_tree, ExportedManifest, LoadFailure};
use crate::transform::index::TransformIndex;
use crate::transform::patch::TransformDescriptor;
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

/// Server-assigned metadata fields cleared before re-creation
const SERVER_METADATA: &[&str] = &[
    "uid",
    "resourceVersion",
    "creationTimestamp",
    "selfLink",
    "generation",
    "managedFields",
];

/// PVC annotations set by the binding controller
const PVC_BIND_ANNOTATIONS: &[&str] = &[
    "pv.kubernetes.io/bind-completed",
    "pv.kubernetes.io/bound-by-controller",
];

const SA_TOKEN_SECRET: &str = "kubernetes.io/service-account-token";
const DOCKERCFG_SECRET: &str = "kubernetes.io/dockercfg";
const OPENSHIFT_TOKEN_ANNOTATION: &str = "openshift.io/token-secret.name";
const OPENSHIFT_ANNOTATION_PREFIX: &str = "openshift.io/";

/// Kinds generated by OpenShift that are never carried over
const OPENSHIFT_GENERATED_KINDS: &[&str] = &["ImageStreamTag", "ImageTag"];

/// Kinds whose pod spec lives under `/spec/template/spec`
const TEMPLATED_KINDS: &[&str] = &[
    "Deployment",
    "DeploymentConfig",
    "StatefulSet",
    "DaemonSet",
    "ReplicaSet",
    "ReplicationController",
    "Job",
];

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for transform generation
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Registry prefix to replace in container images
    pub old_image_registry: Option<String>,
    /// Registry prefix substituted for the old one
    pub new_image_registry: Option<String>,
    /// Source cluster is OpenShift
    pub from_openshift: bool,
}

// =============================================================================
// Generated Transforms
// =============================================================================

/// Transform derived for one manifest
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedTransform {
    /// Exclude the manifest from output
    WhiteOut { reason: String },
    Patch(TransformDescriptor),
}

/// Summary of a generation run
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub patches: usize,
    pub whiteouts: usize,
    pub failures: Vec<LoadFailure>,
}

// =============================================================================
// Transform Generator
// =============================================================================

pub struct TransformGenerator {
    config: GeneratorConfig,
}

impl TransformGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Derive the transform for one document
    pub fn generate(&self, doc: &ManifestDocument) -> GeneratedTransform {
        if let Some(reason) = self.whiteout_reason(doc) {
            return GeneratedTransform::WhiteOut { reason };
        }

        let mut patch = TransformDescriptor::default();
        self.clear_server_fields(doc, &mut patch);
        self.rewrite_images(doc, &mut patch);
        if self.config.from_openshift {
            strip_openshift_annotations(doc, &mut patch);
        }
        GeneratedTransform::Patch(patch)
    }

    fn whiteout_reason(&self, doc: &ManifestDocument) -> Option<String> {
        if let Some(owner) = doc.controller_owner() {
            return Some(format!(
                "owned by controller {}/{}",
                owner.get("kind").and_then(Value::as_str).unwrap_or_default(),
                owner.get("name").and_then(Value::as_str).unwrap_or_default()
            ));
        }

        let secret_type = (doc.kind() == "Secret")
            .then(|| doc.get_str("type"))
            .flatten();

        if secret_type == Some(SA_TOKEN_SECRET) {
            return Some("service account token is regenerated by the target".into());
        }

        if self.config.from_openshift {
            let has_token_annotation = doc
                .annotations()
                .map(|a| a.contains_key(OPENSHIFT_TOKEN_ANNOTATION))
                .unwrap_or(false);
            if secret_type == Some(DOCKERCFG_SECRET) && has_token_annotation {
                return Some("openshift generated dockercfg secret".into());
            }
            if OPENSHIFT_GENERATED_KINDS.contains(&doc.kind()) {
                return Some(format!("{} is generated by openshift", doc.kind()));
            }
        }

        None
    }

    fn clear_server_fields(&self, doc: &ManifestDocument, patch: &mut TransformDescriptor) {
        for field in SERVER_METADATA {
            remove_if_present(doc, patch, pointer(["metadata", *field]));
        }
        remove_if_present(doc, patch, "/status".to_string());

        match doc.kind() {
            "Service" => {
                let headless = doc.get_str("spec.clusterIP") == Some("None");
                if !headless {
                    remove_if_present(doc, patch, "/spec/clusterIP".to_string());
                    remove_if_present(doc, patch, "/spec/clusterIPs".to_string());
                }
            }
            "PersistentVolumeClaim" => {
                remove_if_present(doc, patch, "/spec/volumeName".to_string());
                for key in PVC_BIND_ANNOTATIONS {
                    remove_if_present(doc, patch, pointer(["metadata", "annotations", *key]));
                }
            }
            _ => {}
        }
    }

    fn rewrite_images(&self, doc: &ManifestDocument, patch: &mut TransformDescriptor) {
        let (Some(old), Some(new)) = (
            self.config.old_image_registry.as_deref(),
            self.config.new_image_registry.as_deref(),
        ) else {
            return;
        };
        if old.is_empty() {
            return;
        }

        let Some(spec_path) = pod_spec_path(doc.kind()) else {
            return;
        };

        for list in ["initContainers", "containers"] {
            let list_path = format!("{}/{}", spec_path, list);
            let Some(containers) = doc.get(&list_path).and_then(Value::as_array) else {
                continue;
            };

            for (i, container) in containers.iter().enumerate() {
                let Some(image) = container.get("image").and_then(Value::as_str) else {
                    continue;
                };
                if let Some(rest) = image.strip_prefix(old) {
                    patch.replace(
                        format!("{}/{}/image", list_path, i),
                        Value::String(format!("{}{}", new, rest)),
                    );
                }
            }
        }
    }

    /// Generate transforms for every manifest under the index's export root
    pub async fn generate_tree(&self, index: &TransformIndex) -> Result<GenerationReport> {
        let tree = load_export_tree(index.export_root()).await?;
        fs::create_dir_all(index.transform_root())
            .await
            .map_err(|source| Error::RootDirectory {
                path: index.transform_root().to_path_buf(),
                source,
            })?;

        let mut report = GenerationReport {
            failures: tree.failures,
            ..Default::default()
        };

        for manifest in &tree.manifests {
            match self.write_transform(index, manifest).await {
                Ok(GeneratedTransform::WhiteOut { .. }) => report.whiteouts += 1,
                Ok(GeneratedTransform::Patch(_)) => report.patches += 1,
                Err(error) => {
                    warn!("Cannot write transform for {:?}: {}", manifest.path, error);
                    report.failures.push(LoadFailure {
                        path: manifest.path.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            "Transform generation complete: {} patches, {} white-outs, {} failures",
            report.patches,
            report.whiteouts,
            report.failures.len()
        );
        Ok(report)
    }

    async fn write_transform(
        &self,
        index: &TransformIndex,
        manifest: &ExportedManifest,
    ) -> Result<GeneratedTransform> {
        let transform_path = index.transform_path(&manifest.path)?;
        let whiteout_path = index.whiteout_path(&manifest.path)?;
        if let Some(dir) = transform_path.parent() {
            fs::create_dir_all(dir).await?;
        }

        let generated = self.generate(&manifest.document);
        match &generated {
            GeneratedTransform::WhiteOut { reason } => {
                debug!("White-out {:?}: {}", manifest.path, reason);
                write_file(&whiteout_path, "").await?;
                remove_stale(&transform_path).await?;
            }
            GeneratedTransform::Patch(patch) => {
                debug!("Patch {:?}: {} operations", manifest.path, patch.len());
                write_file(&transform_path, &patch.encode()?).await?;
                remove_stale(&whiteout_path).await?;
            }
        }
        Ok(generated)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn remove_if_present(doc: &ManifestDocument, patch: &mut TransformDescriptor, path: String) {
    if doc.contains(&path) {
        patch.remove(path);
    }
}

fn strip_openshift_annotations(doc: &ManifestDocument, patch: &mut TransformDescriptor) {
    let Some(annotations) = doc.annotations() else {
        return;
    };
    for key in annotations.keys() {
        if key.starts_with(OPENSHIFT_ANNOTATION_PREFIX) && key != OPENSHIFT_TOKEN_ANNOTATION {
            patch.remove(pointer(["metadata", "annotations", key.as_str()]));
        }
    }
}

/// JSON Pointer to the pod spec of a workload kind
fn pod_spec_path(kind: &str) -> Option<&'static str> {
    match kind {
        "Pod" => Some("/spec"),
        "CronJob" => Some("/spec/jobTemplate/spec/template/spec"),
        k if TEMPLATED_KINDS.contains(&k) => Some("/spec/template/spec"),
        _ => None,
    }
}

async fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .await
        .map_err(|source| Error::ManifestWrite {
            path: path.to_path_buf(),
            source,
        })
}

async fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::ManifestWrite {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use tempfile::TempDir;

    fn generator() -> TransformGenerator {
        TransformGenerator::new(GeneratorConfig {
            old_image_registry: Some("registry.old.io/".into()),
            new_image_registry: Some("registry.new.io/".into()),
            from_openshift: false,
        })
    }

    fn patch_of(generated: GeneratedTransform) -> TransformDescriptor {
        match generated {
            GeneratedTransform::Patch(p) => p,
            other => panic!("expected patch, got {:?}", other),
        }
    }

    #[test]
    fn test_clears_server_fields() {
        let doc = ManifestDocument::new(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": "cfg",
                "uid": "1234",
                "resourceVersion": "99",
                "creationTimestamp": "2024-01-01T00:00:00Z"
            },
            "data": { "k": "v" }
        }));

        let mut patched = doc.clone();
        let patch = patch_of(generator().generate(&doc));
        assert_eq!(patch.len(), 3);

        patch.apply_to(&mut patched, Path::new("cfg")).unwrap();
        assert_eq!(
            patched.as_value()["metadata"],
            json!({ "name": "cfg" })
        );
    }

    #[test]
    fn test_rewrites_images() {
        let doc = ManifestDocument::new(json!({
            "kind": "Deployment",
            "metadata": { "name": "web" },
            "spec": { "template": { "spec": {
                "initContainers": [{ "name": "init", "image": "docker.io/busybox" }],
                "containers": [
                    { "name": "app", "image": "registry.old.io/team/app:1.0" },
                    { "name": "sidecar" }
                ]
            }}}
        }));

        let mut patched = doc.clone();
        let patch = patch_of(generator().generate(&doc));
        assert_eq!(patch.len(), 1);

        patch.apply_to(&mut patched, Path::new("web")).unwrap();
        assert_eq!(
            patched.get("/spec/template/spec/containers/0/image"),
            Some(&json!("registry.new.io/team/app:1.0"))
        );
        assert_eq!(
            patched.get("/spec/template/spec/initContainers/0/image"),
            Some(&json!("docker.io/busybox"))
        );
    }

    #[test]
    fn test_service_cluster_ip() {
        let svc = ManifestDocument::new(json!({
            "kind": "Service",
            "metadata": { "name": "api" },
            "spec": { "clusterIP": "10.0.0.1", "clusterIPs": ["10.0.0.1"] }
        }));
        assert_eq!(patch_of(generator().generate(&svc)).len(), 2);

        let headless = ManifestDocument::new(json!({
            "kind": "Service",
            "metadata": { "name": "db" },
            "spec": { "clusterIP": "None" }
        }));
        assert!(patch_of(generator().generate(&headless)).is_empty());
    }

    #[test]
    fn test_whiteouts() {
        let owned = ManifestDocument::new(json!({
            "kind": "Pod",
            "metadata": {
                "name": "web-abc",
                "ownerReferences": [{ "kind": "ReplicaSet", "name": "web", "controller": true }]
            }
        }));
        assert_matches!(
            generator().generate(&owned),
            GeneratedTransform::WhiteOut { reason } if reason.contains("ReplicaSet/web")
        );

        let token = ManifestDocument::new(json!({
            "kind": "Secret",
            "type": "kubernetes.io/service-account-token",
            "metadata": { "name": "default-token" }
        }));
        assert_matches!(generator().generate(&token), GeneratedTransform::WhiteOut { .. });
    }

    #[test]
    fn test_openshift_rules() {
        let dockercfg = ManifestDocument::new(json!({
            "kind": "Secret",
            "type": "kubernetes.io/dockercfg",
            "metadata": {
                "name": "builder-dockercfg",
                "annotations": { "openshift.io/token-secret.name": "builder-token" }
            }
        }));
        assert_matches!(
            generator().generate(&dockercfg),
            GeneratedTransform::Patch(_)
        );

        let openshift = TransformGenerator::new(GeneratorConfig {
            from_openshift: true,
            ..Default::default()
        });
        assert_matches!(
            openshift.generate(&dockercfg),
            GeneratedTransform::WhiteOut { .. }
        );

        let route = ManifestDocument::new(json!({
            "kind": "Route",
            "metadata": {
                "name": "web",
                "annotations": { "openshift.io/host.generated": "true", "team": "a" }
            }
        }));
        let patch = patch_of(openshift.generate(&route));
        assert_eq!(patch.len(), 1);
        let mut patched = route.clone();
        patch.apply_to(&mut patched, Path::new("route")).unwrap();
        assert_eq!(patched.as_value()["metadata"]["annotations"], json!({ "team": "a" }));
    }

    #[tokio::test]
    async fn test_generate_tree() {
        let tmp = TempDir::new().unwrap();
        let export = tmp.path().join("export");
        let transform = tmp.path().join("transform");
        fs::create_dir_all(&export).await.unwrap();

        fs::write(
            export.join("ConfigMap_myns_cfg.yaml"),
            "kind: ConfigMap\nmetadata:\n  name: cfg\n  namespace: myns\n",
        )
        .await
        .unwrap();
        fs::write(
            export.join("Secret_myns_tok.yaml"),
            "kind: Secret\ntype: kubernetes.io/service-account-token\nmetadata:\n  name: tok\n",
        )
        .await
        .unwrap();

        let index = TransformIndex::new(&export, &transform);
        let report = generator().generate_tree(&index).await.unwrap();
        assert_eq!(report.patches, 1);
        assert_eq!(report.whiteouts, 1);
        assert!(report.failures.is_empty());

        let text = fs::read_to_string(transform.join("ConfigMap_myns_cfg.patch.json"))
            .await
            .unwrap();
        assert_eq!(text.trim(), "[]");
        assert!(transform.join("Secret_myns_tok.wh").exists());
        assert!(!transform.join("Secret_myns_tok.patch.json").exists());
    }
}
