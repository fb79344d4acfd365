//! Resource Discovery Pipeline
//!
//! Composes catalog filtering, listing and ranking into a single run that is
//! parameterized by scope policy and sort key.

use crate::discovery::filter::{CatalogFilter, ScopePolicy};
use crate::discovery::lister::{list_all, ListOutcome};
use crate::discovery::ranker::{rank, SortKey};
use crate::domain::ports::{
    DiscoveredResourceGroup, ResourceCatalogRef, ResourceListerRef, ResourceTypeError,
};
use crate::error::Result;
use tracing::info;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a discovery run
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Which resource scopes are eligible
    pub scope: ScopePolicy,
    /// Primary ordering key for output
    pub sort_key: SortKey,
    /// Maximum concurrent list calls
    pub list_concurrency: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            scope: ScopePolicy::NamespacedOnly,
            sort_key: SortKey::Kind,
            list_concurrency: 8,
        }
    }
}

// =============================================================================
// Discovery Outcome
// =============================================================================

/// Everything one discovery run produced
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    /// Non-empty groups, ranked
    pub groups: Vec<DiscoveredResourceGroup>,
    /// Types whose listing failed, ranked
    pub failures: Vec<ResourceTypeError>,
    /// Number of catalog entries rejected by the filter
    pub rejected: usize,
    /// Number of accepted types with no instances
    pub empty: usize,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Discovers migratable resources in one namespace
pub struct DiscoveryPipeline {
    config: DiscoveryConfig,
    catalog: ResourceCatalogRef,
    lister: ResourceListerRef,
}

impl DiscoveryPipeline {
    pub fn new(
        config: DiscoveryConfig,
        catalog: ResourceCatalogRef,
        lister: ResourceListerRef,
    ) -> Self {
        Self {
            config,
            catalog,
            lister,
        }
    }

    /// Run discovery against `namespace`.
    ///
    /// Fails only when the catalog itself cannot be read.
    pub async fn run(&self, namespace: &str) -> Result<DiscoveryOutcome> {
        let filter = CatalogFilter::new(self.config.scope);
        let catalog = self.catalog.resource_types().await?;
        let total = catalog.len();

        let accepted: Vec<_> = catalog.into_iter().filter(|r| filter.admit(r)).collect();
        let mut outcome = DiscoveryOutcome {
            rejected: total - accepted.len(),
            ..Default::default()
        };

        let listed = list_all(
            self.lister.as_ref(),
            accepted,
            namespace,
            self.config.list_concurrency,
        )
        .await;

        for result in listed {
            match result {
                ListOutcome::Found(group) => outcome.groups.push(group),
                ListOutcome::Empty(_) => outcome.empty += 1,
                ListOutcome::Failed(err) => outcome.failures.push(err),
            }
        }

        rank(&mut outcome.groups, self.config.sort_key);
        let key = self.config.sort_key;
        outcome
            .failures
            .sort_by(|a, b| key.compare(&a.resource, &b.resource));

        info!(
            "Discovery complete: {} types with objects, {} empty, {} rejected, {} failed",
            outcome.groups.len(),
            outcome.empty,
            outcome.rejected,
            outcome.failures.len()
        );

        Ok(outcome)
    }
}
