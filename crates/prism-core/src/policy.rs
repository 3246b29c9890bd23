//! Per-type fragment cache policy.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::Fragment;

/// Fragment cache configuration for one serializer type.
///
/// Policies are immutable per type. Subtypes start from a duplicate of
/// their parent's policy via [`FragmentPolicy::inherit`] and mutate only
/// the copy, never the shared parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentPolicy {
    /// Whether fragment caching is enabled for this type.
    pub enabled: bool,
    /// Explicit cache key prefix; derived from the type name when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
    /// Fields to include in the cached fragment. Wins over `except`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only: Option<BTreeSet<String>>,
    /// Fields to exclude from the cached fragment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub except: Option<BTreeSet<String>>,
    /// Time-to-live for cached fragments of this type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Duration>,
    /// Named store override; the default store is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    /// Whether keys must carry a definition digest.
    pub require_digest: bool,
}

impl Default for FragmentPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            key_prefix: None,
            only: None,
            except: None,
            ttl: None,
            store: None,
            require_digest: false,
        }
    }
}

impl FragmentPolicy {
    /// Create an enabled policy.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    /// Create a disabled policy.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Set an explicit cache key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Restrict the cached fragment to the named fields.
    pub fn with_only(mut self, fields: &[&str]) -> Self {
        self.only = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Exclude the named fields from the cached fragment.
    pub fn with_except(mut self, fields: &[&str]) -> Self {
        self.except = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Set the fragment time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Route fragments of this type to a named store.
    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    /// Require a definition digest in derived keys.
    pub fn with_required_digest(mut self) -> Self {
        self.require_digest = true;
        self
    }

    /// Duplicate this policy for a subtype.
    ///
    /// The copy can be reconfigured freely without touching the parent.
    pub fn inherit(&self) -> Self {
        self.clone()
    }

    /// Check whether a field participates in the cached fragment.
    ///
    /// When both `only` and `except` are configured, `only` wins and
    /// `except` is ignored.
    pub fn allows(&self, field: &str) -> bool {
        if let Some(only) = &self.only {
            return only.contains(field);
        }
        if let Some(except) = &self.except {
            return !except.contains(field);
        }
        true
    }

    /// Filter an attribute fragment down to the allowed fields.
    ///
    /// Association payloads are never filtered by this policy; they are
    /// separately keyed and cached. Applying the same policy twice yields
    /// the same fragment.
    pub fn apply(&self, fragment: &Fragment) -> Fragment {
        fragment
            .iter()
            .filter(|(field, _)| self.allows(field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fragment() -> Fragment {
        let mut map = Fragment::new();
        map.insert("title".into(), json!("hello"));
        map.insert("body".into(), json!("world"));
        map.insert("rating".into(), json!(5));
        map
    }

    #[test]
    fn test_allows_everything_by_default() {
        let policy = FragmentPolicy::enabled();
        assert!(policy.allows("title"));
        assert!(policy.allows("anything"));
    }

    #[test]
    fn test_only_restricts_fields() {
        let policy = FragmentPolicy::enabled().with_only(&["title"]);
        let filtered = policy.apply(&fragment());
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("title"));
    }

    #[test]
    fn test_except_removes_fields() {
        let policy = FragmentPolicy::enabled().with_except(&["body"]);
        let filtered = policy.apply(&fragment());
        assert_eq!(filtered.len(), 2);
        assert!(!filtered.contains_key("body"));
    }

    #[test]
    fn test_only_wins_over_except() {
        let policy = FragmentPolicy::enabled()
            .with_only(&["title"])
            .with_except(&["title"]);
        assert!(policy.allows("title"));
        assert!(!policy.allows("body"));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let policy = FragmentPolicy::enabled().with_except(&["rating"]);
        let once = policy.apply(&fragment());
        let twice = policy.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_inherit_copies_never_share() {
        let parent = FragmentPolicy::enabled().with_only(&["title"]);
        let child = parent.inherit().with_only(&["title", "body"]);
        assert!(!parent.allows("body"));
        assert!(child.allows("body"));
    }
}
