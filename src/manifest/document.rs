//! Manifest Documents
//!
//! A manifest is an untyped, order-preserving document tree. Accessors use
//! JSON Pointer paths so no resource schema is needed.

use serde_json::{Map, Value};

/// Namespace placeholder used in file names for resources without one
pub const CLUSTER_SCOPED: &str = "clusterscoped";

/// Escape one JSON Pointer reference token (RFC 6901)
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Build a JSON Pointer from unescaped segments
pub fn pointer<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .map(|s| format!("/{}", escape_token(s.as_ref())))
        .collect()
}

// =============================================================================
// Manifest Document
// =============================================================================

/// One resource instance
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    root: Value,
}

impl ManifestDocument {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Look up a value by JSON Pointer
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.root.pointer(pointer)
    }

    /// Look up a string by dotted path (`metadata.name`)
    pub fn get_str(&self, dotted: &str) -> Option<&str> {
        self.get(&pointer(dotted.split('.')))?.as_str()
    }

    pub fn contains(&self, pointer: &str) -> bool {
        self.get(pointer).is_some()
    }

    pub fn kind(&self) -> &str {
        self.get_str("kind").unwrap_or_default()
    }

    pub fn api_version(&self) -> &str {
        self.get_str("apiVersion").unwrap_or_default()
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("metadata.name").filter(|n| !n.is_empty())
    }

    /// Namespace, or `None` for cluster-scoped resources
    pub fn namespace(&self) -> Option<&str> {
        self.get_str("metadata.namespace").filter(|n| !n.is_empty())
    }

    pub fn annotations(&self) -> Option<&Map<String, Value>> {
        self.get("/metadata/annotations")?.as_object()
    }

    /// True when the annotations mapping is absent, null or empty
    pub fn has_no_annotations(&self) -> bool {
        self.annotations().map(Map::is_empty).unwrap_or(true)
    }

    /// Controller owner references (`controller: true`)
    pub fn controller_owner(&self) -> Option<&Value> {
        self.get("/metadata/ownerReferences")?
            .as_array()?
            .iter()
            .find(|r| r.get("controller").and_then(Value::as_bool) == Some(true))
    }
}

impl From<Value> for ManifestDocument {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}
