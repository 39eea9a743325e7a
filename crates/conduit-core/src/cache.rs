//! Shared last-known attribute values for one cluster
//!
//! Every update (from a live read, a successful write, or an unsolicited
//! report) replaces whole entries under a single write lock, so readers never
//! observe a partially applied write.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::attribute::{AttributeId, AttributeValue};

/// Where a cached value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
    Read,
    Write,
    Report,
}

/// One cached attribute value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAttribute {
    pub value: AttributeValue,
    pub source: CacheSource,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct AttributeCache {
    entries: RwLock<HashMap<AttributeId, CachedAttribute>>,
}

impl AttributeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached value for an attribute
    pub fn get(&self, id: AttributeId) -> Option<AttributeValue> {
        self.entries.read().get(&id).map(|e| e.value.clone())
    }

    /// Get the cached entry including its provenance
    pub fn entry(&self, id: AttributeId) -> Option<CachedAttribute> {
        self.entries.read().get(&id).cloned()
    }

    pub fn contains(&self, id: AttributeId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Replace a single value
    pub fn insert(&self, id: AttributeId, value: AttributeValue, source: CacheSource) {
        self.insert_many([(id, value)], source);
    }

    /// Replace several values as one update
    pub fn insert_many<I>(&self, values: I, source: CacheSource)
    where
        I: IntoIterator<Item = (AttributeId, AttributeValue)>,
    {
        let updated_at = Utc::now();
        let staged: Vec<_> = values.into_iter().collect();
        let mut entries = self.entries.write();
        for (id, value) in staged {
            entries.insert(
                id,
                CachedAttribute {
                    value,
                    source,
                    updated_at,
                },
            );
        }
    }

    /// Copy of all cached values
    pub fn snapshot(&self) -> HashMap<AttributeId, AttributeValue> {
        self.entries
            .read()
            .iter()
            .map(|(id, e)| (*id, e.value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = AttributeCache::new();
        assert!(cache.get(0x0012).is_none());

        cache.insert(0x0012, AttributeValue::Int(2000), CacheSource::Read);
        assert_eq!(cache.get(0x0012), Some(AttributeValue::Int(2000)));
        assert_eq!(cache.entry(0x0012).unwrap().source, CacheSource::Read);
    }

    #[test]
    fn test_insert_many_replaces_whole_entries() {
        let cache = AttributeCache::new();
        cache.insert(0x0000, AttributeValue::UInt(1), CacheSource::Report);
        cache.insert_many(
            [(0x0000, AttributeValue::UInt(3)), (0x0001, AttributeValue::UInt(2))],
            CacheSource::Write,
        );

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[&0x0000], AttributeValue::UInt(3));
        assert_eq!(cache.entry(0x0001).unwrap().source, CacheSource::Write);
    }

    #[test]
    fn test_clear() {
        let cache = AttributeCache::new();
        cache.insert(0x0000, AttributeValue::Int(2150), CacheSource::Report);
        cache.insert(0x001c, AttributeValue::UInt(4), CacheSource::Read);

        cache.clear();

        assert!(cache.is_empty());
        assert!(!cache.contains(0x0000));
    }
}
