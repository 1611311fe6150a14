use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Qualifier metadata used to disambiguate bindings that share a constraint.
///
/// Bindings declare qualifiers; callbacks (inquiries, parameters) carry the
/// metadata they require. A binding qualifies when every required entry is
/// present among its qualifiers with an equal value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindingMetadata {
    entries: BTreeMap<String, serde_json::Value>,
}

impl BindingMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when every entry of `required` is present here with an equal value
    pub fn satisfies(&self, required: &BindingMetadata) -> bool {
        required
            .entries
            .iter()
            .all(|(key, value)| self.entries.get(key) == Some(value))
    }

    /// Copy entries from `other`, keeping existing values on conflict
    pub fn merge(&mut self, other: &BindingMetadata) {
        for (key, value) in &other.entries {
            self.entries.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satisfies() {
        let qualifiers = BindingMetadata::new().with("name", "primary").with("region", "eu");
        assert!(qualifiers.satisfies(&BindingMetadata::new()));
        assert!(qualifiers.satisfies(&BindingMetadata::new().with("name", "primary")));
        assert!(!qualifiers.satisfies(&BindingMetadata::new().with("name", "replica")));
        assert!(!BindingMetadata::new().satisfies(&qualifiers));
    }

    #[test]
    fn test_merge_keeps_existing() {
        let mut metadata = BindingMetadata::new().with("name", "primary");
        metadata.merge(&BindingMetadata::new().with("name", "replica").with("ttl", 30));
        assert_eq!(metadata.get("name"), Some(&serde_json::json!("primary")));
        assert_eq!(metadata.get("ttl"), Some(&serde_json::json!(30)));
        assert_eq!(metadata.len(), 2);
    }
}
