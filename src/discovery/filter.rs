//! Resource Catalog Filter
//!
//! Decides whether a resource type from the source catalog takes part in
//! the migration.

use crate::domain::ports::ResourceTypeDescriptor;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Kinds that are never migrated
const EXCLUDED_KINDS: &[&str] = &["Event"];

/// Verb a type must support to be re-created in the target
const CREATE_VERB: &str = "create";

// =============================================================================
// Scope Policy
// =============================================================================

/// Which resource scopes take part in discovery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopePolicy {
    /// Only namespace-scoped types
    #[default]
    NamespacedOnly,
    /// Namespace-scoped and cluster-scoped types
    IncludeClusterScoped,
}

// =============================================================================
// Filter Decision
// =============================================================================

/// Why a resource type was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoVerbs,
    ExcludedKind,
    ClusterScoped,
    NotCreatable,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoVerbs => write!(f, "declares no verbs"),
            SkipReason::ExcludedKind => write!(f, "kind is never migrated"),
            SkipReason::ClusterScoped => write!(f, "is clusterscoped"),
            SkipReason::NotCreatable => write!(f, "does not support a create verb"),
        }
    }
}

/// Outcome of filtering one resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    Reject(SkipReason),
}

impl FilterDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterDecision::Accept)
    }
}

// =============================================================================
// Catalog Filter
// =============================================================================

/// Eligibility rules for resource types
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogFilter {
    scope: ScopePolicy,
}

impl CatalogFilter {
    pub fn new(scope: ScopePolicy) -> Self {
        Self { scope }
    }

    /// Evaluate the rules in order; the first rejection wins
    pub fn evaluate(&self, resource: &ResourceTypeDescriptor) -> FilterDecision {
        if resource.verbs.is_empty() {
            return FilterDecision::Reject(SkipReason::NoVerbs);
        }

        if EXCLUDED_KINDS.contains(&resource.kind.as_str()) {
            return FilterDecision::Reject(SkipReason::ExcludedKind);
        }

        if !resource.namespaced && self.scope == ScopePolicy::NamespacedOnly {
            return FilterDecision::Reject(SkipReason::ClusterScoped);
        }

        if !resource.supports(CREATE_VERB) {
            return FilterDecision::Reject(SkipReason::NotCreatable);
        }

        FilterDecision::Accept
    }

    /// Evaluate and report the decision
    pub fn admit(&self, resource: &ResourceTypeDescriptor) -> bool {
        let decision = self.evaluate(resource);
        match decision {
            FilterDecision::Accept => info!("processing resource: {}", resource),
            FilterDecision::Reject(reason) => {
                debug!("resource: {} {}, skipping", resource, reason)
            }
        }
        decision.is_accepted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(kind: &str, namespaced: bool, verbs: &[&str]) -> ResourceTypeDescriptor {
        ResourceTypeDescriptor::new(
            "",
            "v1",
            format!("{}s", kind.to_lowercase()),
            kind,
            namespaced,
            verbs.iter().copied(),
        )
    }

    #[test]
    fn test_rejection_rules() {
        let filter = CatalogFilter::default();

        assert_eq!(
            filter.evaluate(&descriptor("ConfigMap", true, &[])),
            FilterDecision::Reject(SkipReason::NoVerbs)
        );
        assert_eq!(
            filter.evaluate(&descriptor("Event", true, &["create", "list"])),
            FilterDecision::Reject(SkipReason::ExcludedKind)
        );
        assert_eq!(
            filter.evaluate(&descriptor("Namespace", false, &["create", "list"])),
            FilterDecision::Reject(SkipReason::ClusterScoped)
        );
        assert_eq!(
            filter.evaluate(&descriptor("Binding", true, &["list", "get"])),
            FilterDecision::Reject(SkipReason::NotCreatable)
        );
        assert_eq!(
            filter.evaluate(&descriptor("ConfigMap", true, &["create", "list"])),
            FilterDecision::Accept
        );
    }

    #[test]
    fn test_first_match_wins() {
        let filter = CatalogFilter::default();

        // Cluster-scoped Event without create: the kind rule fires first
        assert_eq!(
            filter.evaluate(&descriptor("Event", false, &["list"])),
            FilterDecision::Reject(SkipReason::ExcludedKind)
        );
    }

    #[test]
    fn test_create_verb_is_exact() {
        let filter = CatalogFilter::default();

        // "createtoken"-style verbs must not satisfy the create rule
        assert!(!filter
            .evaluate(&descriptor("ServiceAccount", true, &["createtoken", "list"]))
            .is_accepted());
    }

    #[test]
    fn test_no_false_rejections() {
        let filter = CatalogFilter::default();
        let kinds = ["ConfigMap", "Secret", "Deployment", "Service", "Eventual"];

        for kind in kinds {
            let d = descriptor(kind, true, &["create", "get", "list", "delete"]);
            assert!(filter.admit(&d), "{} should be accepted", kind);
        }
    }

    #[test]
    fn test_cluster_scope_policy() {
        let filter = CatalogFilter::new(ScopePolicy::IncludeClusterScoped);

        assert!(filter
            .evaluate(&descriptor("ClusterRole", false, &["create", "list"]))
            .is_accepted());
        assert_eq!(
            filter.evaluate(&descriptor("Event", false, &["create"])),
            FilterDecision::Reject(SkipReason::ExcludedKind)
        );
    }
}
