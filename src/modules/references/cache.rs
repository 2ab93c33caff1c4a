use super::domain::{Reference, ResolvedReference};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Field name, target kind and source id.
///
/// The target kind is part of the key because polymorphic fields (`entity`,
/// `document`) can carry the same source id for different kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    field_name: String,
    record_kind: String,
    source_id: String,
}

impl From<&Reference> for CacheKey {
    fn from(reference: &Reference) -> Self {
        Self {
            field_name: reference.field_name.clone(),
            record_kind: reference.record_kind.clone(),
            source_id: reference.source_id.clone(),
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries_count: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// Run-scoped memo of resolved references.
///
/// Only successful lookups are stored, including "not migrated yet" answers.
/// Entries never expire; a new run starts with a new cache.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    entries: DashMap<CacheKey, ResolvedReference>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reference: &Reference) -> Option<ResolvedReference> {
        let key = CacheKey::from(reference);

        if let Some(entry) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Reference cache hit for {}:{}:{}",
                key.field_name, key.record_kind, key.source_id
            );
            return Some(entry.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Reference cache miss for {}:{}:{}",
            key.field_name, key.record_kind, key.source_id
        );
        None
    }

    pub fn insert(&self, resolved: ResolvedReference) {
        let key = CacheKey::from(&resolved.reference);
        self.entries.insert(key, resolved);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries_count: self.entries.len(),
        }
    }
}
