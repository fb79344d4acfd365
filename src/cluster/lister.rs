//! Dynamic-object resource lister

use crate::domain::ports::{ResourceLister, ResourceTypeDescriptor};
use crate::error::{ListError, ListFailureKind};
use async_trait::async_trait;
use kube::api::ListParams;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind, TypeMeta};
use kube::{Api, Client};
use serde_json::Value;

/// Lists instances of any resource type as untyped documents
pub struct KubeLister {
    client: Client,
}

impl KubeLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, resource: &ResourceTypeDescriptor, namespace: Option<&str>) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(&resource.group, &resource.version, &resource.kind);
        let ar = ApiResource::from_gvk_with_plural(&gvk, &resource.name);
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }
}

#[async_trait]
impl ResourceLister for KubeLister {
    async fn list(
        &self,
        resource: &ResourceTypeDescriptor,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>, ListError> {
        let list = self
            .api(resource, namespace)
            .list(&ListParams::default())
            .await?;

        list.items
            .into_iter()
            .map(|obj| to_document(obj, resource))
            .collect()
    }
}

/// List responses omit type metadata on items; restore it from the descriptor
fn to_document(mut obj: DynamicObject, resource: &ResourceTypeDescriptor) -> Result<Value, ListError> {
    if obj.types.is_none() {
        obj.types = Some(TypeMeta {
            api_version: resource.group_version.clone(),
            kind: resource.kind.clone(),
        });
    }
    serde_json::to_value(obj).map_err(|e| ListError::new(ListFailureKind::Other, e.to_string()))
}
