//! Event metadata.
//!
//! `Metadata` rides along with every emitted event and carries whatever
//! extra information the battle driver wants to pass (damage type, the
//! name of the effect that ticked, a turn counter). The engine does not
//! interpret it; passives that care read typed values back out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String-keyed bag of JSON values attached to an event.
///
/// # Examples
///
/// ```rust
/// use zzpassive::Metadata;
///
/// let mut meta = Metadata::new();
/// meta.set("damage_type", "fire");
/// meta.set("turn", 4);
///
/// let kind: Option<String> = meta.get("damage_type");
/// assert_eq!(kind.as_deref(), Some("fire"));
/// assert_eq!(meta.get::<u32>("turn"), Some(4));
/// assert_eq!(meta.get::<u32>("missing"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    data: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    /// Create an empty metadata map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Metadata::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.set(key, value);
        self
    }

    /// Set a value.
    ///
    /// The value must be serializable. If serialization fails, the value
    /// is silently not added.
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.data.insert(key.into(), json_value);
        }
    }

    /// Get a value.
    ///
    /// Returns `None` if the key doesn't exist or if the value
    /// cannot be deserialized to the requested type.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Check if a key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Whether nothing was attached.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
