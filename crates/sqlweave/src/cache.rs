//! Per-dialect render cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Maps the raw fragment bytes of a statement shape to its rendered text.
///
/// Lookups take a shared lock, so concurrent renders of cached shapes never
/// wait on each other; inserts and [`RenderCache::clear`] are exclusive.
#[derive(Debug)]
pub struct RenderCache {
    map: RwLock<Option<HashMap<Box<[u8]>, Arc<str>>>>,
    /// Maximum number of entries; `0` means unbounded.
    limit: AtomicUsize,
}

impl RenderCache {
    /// An empty, unbounded cache. The map is allocated on first insert.
    pub const fn new() -> Self {
        Self {
            map: RwLock::new(None),
            limit: AtomicUsize::new(0),
        }
    }

    /// Look up previously rendered text for a shape key.
    pub fn get(&self, key: &[u8]) -> Option<Arc<str>> {
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        map.as_ref()?.get(key).cloned()
    }

    /// Store rendered text for a shape key.
    ///
    /// Returns `false` when the entry limit is reached and the shape was not
    /// stored. Existing entries keep being served.
    pub fn insert(&self, key: &[u8], sql: Arc<str>) -> bool {
        let limit = self.limit.load(Ordering::Relaxed);
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        let map = map.get_or_insert_with(HashMap::new);
        if limit > 0 && map.len() >= limit && !map.contains_key(key) {
            return false;
        }
        map.insert(key.into(), sql);
        true
    }

    /// Drop every entry and return how many there were.
    pub fn clear(&self) -> usize {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        map.take().map_or(0, |m| m.len())
    }

    /// Number of cached shapes.
    pub fn len(&self) -> usize {
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        map.as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cap the number of cached shapes. `None` removes the cap.
    pub fn set_limit(&self, limit: Option<usize>) {
        self.limit.store(limit.unwrap_or(0), Ordering::Relaxed);
    }

    /// Current entry cap, if any.
    pub fn limit(&self) -> Option<usize> {
        match self.limit.load(Ordering::Relaxed) {
            0 => None,
            n => Some(n),
        }
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new()
    }
}
