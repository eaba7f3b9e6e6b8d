//! Entity catalog models.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A known entity and its attributes, as stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub canonical_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl EntityRecord {
    pub fn new(canonical_name: impl Into<String>) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// An immutable view of the catalog taken at one refresh.
///
/// Requests hold an `Arc` to a snapshot for their whole lifetime, so a
/// concurrent refresh never becomes partially visible.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    records: BTreeMap<String, EntityRecord>,
    refreshed_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Build a snapshot; names are trimmed and duplicates keep the first
    /// record.
    pub fn new(records: impl IntoIterator<Item = EntityRecord>) -> Self {
        let mut by_name = BTreeMap::new();
        for mut record in records {
            let name = record.canonical_name.trim();
            if name.is_empty() {
                continue;
            }
            if name.len() != record.canonical_name.len() {
                record.canonical_name = name.to_string();
            }
            by_name.entry(record.canonical_name.clone()).or_insert(record);
        }
        Self {
            records: by_name,
            refreshed_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Build a snapshot from bare names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(EntityRecord::new))
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Canonical names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn name_set(&self) -> BTreeSet<&str> {
        self.names().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Case-insensitive lookup returning the canonical spelling.
    pub fn find_ignore_case(&self, name: &str) -> Option<&str> {
        let wanted = name.trim().to_lowercase();
        self.names().find(|n| n.to_lowercase() == wanted)
    }

    pub fn get(&self, name: &str) -> Option<&EntityRecord> {
        self.records.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.values()
    }

    pub fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }
}

impl Default for CatalogSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
