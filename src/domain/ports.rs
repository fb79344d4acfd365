//! Domain Ports - Core types and trait definitions for the migrator
//!
//! These traits define the boundaries between the migration pipeline and
//! the source cluster. Adapters implement these traits to provide concrete
//! functionality; tests implement them with in-memory fakes.

use crate::error::{ListError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

// =============================================================================
// Resource Types
// =============================================================================

/// Identifies one API resource kind offered by the source cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTypeDescriptor {
    /// API group ("" for the core group)
    pub group: String,
    /// API version within the group
    pub version: String,
    /// Combined group/version (`apps/v1`, `v1`)
    pub group_version: String,
    /// Plural resource name (`configmaps`)
    pub name: String,
    /// Kind (`ConfigMap`)
    pub kind: String,
    /// Whether instances live inside a namespace
    pub namespaced: bool,
    /// Supported verbs
    pub verbs: BTreeSet<String>,
}

impl ResourceTypeDescriptor {
    /// Create a descriptor, deriving the group/version string
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        namespaced: bool,
        verbs: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let group = group.into();
        let version = version.into();
        let group_version = if group.is_empty() {
            version.clone()
        } else {
            format!("{}/{}", group, version)
        };

        Self {
            group,
            version,
            group_version,
            name: name.into(),
            kind: kind.into(),
            namespaced,
            verbs: verbs.into_iter().map(Into::into).collect(),
        }
    }

    /// Check whether a verb is supported
    pub fn supports(&self, verb: &str) -> bool {
        self.verbs.contains(verb)
    }
}

impl std::fmt::Display for ResourceTypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.group_version, self.kind)
    }
}

/// A resource type whose listing failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeError {
    pub resource: ResourceTypeDescriptor,
    pub error: ListError,
}

/// A resource type together with the live instances listed for it
#[derive(Debug, Clone)]
pub struct DiscoveredResourceGroup {
    pub resource: ResourceTypeDescriptor,
    /// Instances in discovery order
    pub objects: Vec<serde_json::Value>,
}

impl DiscoveredResourceGroup {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

// =============================================================================
// Resource Catalog Port
// =============================================================================

/// Port for reading the source cluster's resource catalog
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    /// List every resource type the source offers (preferred versions)
    async fn resource_types(&self) -> Result<Vec<ResourceTypeDescriptor>>;
}

// =============================================================================
// Resource Lister Port
// =============================================================================

/// Port for listing live instances of one resource type
#[async_trait]
pub trait ResourceLister: Send + Sync {
    /// List all instances of `resource`.
    ///
    /// `namespace` is `None` for cluster-wide listing of cluster-scoped types.
    /// Returned documents must carry `apiVersion` and `kind`.
    async fn list(
        &self,
        resource: &ResourceTypeDescriptor,
        namespace: Option<&str>,
    ) -> std::result::Result<Vec<serde_json::Value>, ListError>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ResourceCatalogRef = Arc<dyn ResourceCatalog>;
pub type ResourceListerRef = Arc<dyn ResourceLister>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_version() {
        let core = ResourceTypeDescriptor::new("", "v1", "configmaps", "ConfigMap", true, ["list"]);
        assert_eq!(core.group_version, "v1");
        assert_eq!(format!("{}", core), "v1.ConfigMap");

        let apps = ResourceTypeDescriptor::new(
            "apps",
            "v1",
            "deployments",
            "Deployment",
            true,
            ["create", "list"],
        );
        assert_eq!(apps.group_version, "apps/v1");
        assert!(apps.supports("create"));
        assert!(!apps.supports("patch"));
    }
}
