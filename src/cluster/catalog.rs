//! Discovery-backed resource catalog

use crate::domain::ports::{ResourceCatalog, ResourceTypeDescriptor};
use crate::error::{Error, Result};
use async_trait::async_trait;
use kube::discovery::{ApiCapabilities, ApiResource, Scope};
use kube::{Client, Discovery};
use tracing::debug;

/// Reads the preferred version of every resource the API server serves
pub struct KubeCatalog {
    client: Client,
}

impl KubeCatalog {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceCatalog for KubeCatalog {
    async fn resource_types(&self) -> Result<Vec<ResourceTypeDescriptor>> {
        let discovery = Discovery::new(self.client.clone())
            .run()
            .await
            .map_err(|e| Error::CatalogDiscovery(e.to_string()))?;

        let mut resources = Vec::new();
        for group in discovery.groups() {
            for (ar, caps) in group.recommended_resources() {
                resources.push(descriptor(&ar, &caps));
            }
        }

        debug!("Discovered {} resource types", resources.len());
        Ok(resources)
    }
}

fn descriptor(ar: &ApiResource, caps: &ApiCapabilities) -> ResourceTypeDescriptor {
    ResourceTypeDescriptor::new(
        ar.group.as_str(),
        ar.version.as_str(),
        ar.plural.as_str(),
        ar.kind.as_str(),
        matches!(caps.scope, Scope::Namespaced),
        caps.operations.iter().map(String::as_str),
    )
}
