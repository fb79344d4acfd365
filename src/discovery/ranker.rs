//! Resource Ranker
//!
//! Stable ordering of discovered resource groups so that manifest writes and
//! failure reports come out in the same order on every run.

use crate::domain::ports::{DiscoveredResourceGroup, ResourceTypeDescriptor};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Primary ordering key for discovered resources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Kind,
    /// Plural resource name
    Name,
    Group,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kind" => Ok(SortKey::Kind),
            "name" => Ok(SortKey::Name),
            "group" => Ok(SortKey::Group),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

impl SortKey {
    fn key<'a>(&self, resource: &'a ResourceTypeDescriptor) -> &'a str {
        match self {
            SortKey::Kind => &resource.kind,
            SortKey::Name => &resource.name,
            SortKey::Group => &resource.group,
        }
    }

    /// Compare by key, then by plural name
    pub fn compare(&self, a: &ResourceTypeDescriptor, b: &ResourceTypeDescriptor) -> Ordering {
        self.key(a)
            .cmp(self.key(b))
            .then_with(|| a.name.cmp(&b.name))
    }
}

/// Stable-sort discovered groups in place
pub fn rank(groups: &mut [DiscoveredResourceGroup], key: SortKey) {
    groups.sort_by(|a, b| key.compare(&a.resource, &b.resource));
}
