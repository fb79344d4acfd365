//! Resource Lister
//!
//! Fetches live instances for accepted resource types through the injected
//! listing port. Every failure is recorded and never aborts the run.

use crate::domain::ports::{
    DiscoveredResourceGroup, ResourceLister, ResourceTypeDescriptor, ResourceTypeError,
};
use crate::error::ListFailureKind;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// Result of listing one resource type
#[derive(Debug)]
pub enum ListOutcome {
    /// At least one instance was found
    Found(DiscoveredResourceGroup),
    /// Listing succeeded with zero instances
    Empty(ResourceTypeDescriptor),
    /// Listing failed
    Failed(ResourceTypeError),
}

/// List a single resource type
pub async fn list_resource(
    lister: &dyn ResourceLister,
    resource: ResourceTypeDescriptor,
    namespace: &str,
) -> ListOutcome {
    let scope = resource.namespaced.then_some(namespace);

    match lister.list(&resource, scope).await {
        Ok(objects) if objects.is_empty() => {
            debug!("0 objects found for {}, skipping", resource);
            ListOutcome::Empty(resource)
        }
        Ok(objects) => {
            info!("found {} objects for {}", objects.len(), resource);
            ListOutcome::Found(DiscoveredResourceGroup { resource, objects })
        }
        Err(error) => {
            match error.kind {
                ListFailureKind::NotFound => {
                    debug!("{}: {}", resource, error)
                }
                _ => warn!("{}: {}", resource, error),
            }
            ListOutcome::Failed(ResourceTypeError { resource, error })
        }
    }
}

/// List many resource types with at most `concurrency` calls in flight.
///
/// Outcomes are returned in input order regardless of completion order.
pub async fn list_all(
    lister: &dyn ResourceLister,
    resources: Vec<ResourceTypeDescriptor>,
    namespace: &str,
    concurrency: usize,
) -> Vec<ListOutcome> {
    stream::iter(resources)
        .map(|resource| list_resource(lister, resource, namespace))
        .buffered(concurrency.max(1))
        .collect()
        .await
}
