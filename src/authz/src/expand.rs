//! Wildcard expansion against the permission catalog
//!
//! Expansion is the enumerating counterpart of [`Permission::matches`]:
//! a pattern expands to every catalog entry it matches. Unknown concrete
//! permissions expand to nothing.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::catalog::PermissionCatalog;
use crate::permission::{Permission, PermissionMap};

/// Expands one permission against a catalog
///
/// - concrete: itself if present in the catalog, else nothing
/// - pattern: every matching catalog entry, in catalog order
pub fn expand(pattern: &Permission, catalog: &PermissionCatalog) -> Vec<Permission> {
    if pattern.is_concrete() {
        return if catalog.contains(pattern.as_str()) {
            vec![pattern.clone()]
        } else {
            Vec::new()
        };
    }

    catalog
        .iter()
        .filter(|candidate| pattern.matches(candidate))
        .cloned()
        .collect()
}

/// Expands every key of a map, keeping each key's value
///
/// When two input entries land on the same concrete key, the one that comes
/// later in the input wins.
pub fn expand_map(map: &PermissionMap, catalog: &PermissionCatalog) -> PermissionMap {
    let mut expanded = PermissionMap::with_capacity(map.len());
    for (permission, value) in map.iter() {
        for concrete in expand(permission, catalog) {
            expanded.insert(concrete, value);
        }
    }
    expanded
}

/// Default number of cached pattern expansions
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Statistics about expansion cache performance
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
    /// Number of cached patterns
    pub entries: usize,
    /// Least-recently-used patterns dropped to stay within capacity
    pub evictions: usize,
    /// Maximum number of cached patterns (0 when caching is off)
    pub capacity: usize,
}

impl CacheStats {
    /// Calculates the cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Catalog-bound expander with a bounded pattern cache
///
/// The catalog never changes after startup, so cached expansions never go
/// stale and need no TTL. Patterns come from callers, so the cache is an LRU
/// with a fixed capacity. Thread-safe; share it with `Arc`.
///
/// # Examples
///
/// ```
/// use gatekeeper_authz::{PermissionCatalog, WildcardExpander};
/// use gatekeeper_authz::permission::Permission;
/// use std::sync::Arc;
///
/// let catalog = PermissionCatalog::from_manifest(
///     "chats.create:own\nchats.create:all\nchats.read:own\n",
/// ).unwrap();
/// let expander = WildcardExpander::new(Arc::new(catalog));
///
/// let expanded = expander.expand(&Permission::new("chats.*:own").unwrap());
/// assert_eq!(expanded.len(), 2);
/// ```
pub struct WildcardExpander {
    /// Catalog every pattern is expanded against
    catalog: Arc<PermissionCatalog>,
    /// Pattern string -> expansion; `None` when caching is off
    cache: Option<Mutex<LruCache<String, Arc<Vec<Permission>>>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    evictions: AtomicUsize,
}

impl WildcardExpander {
    /// Creates an expander with a cache of [`DEFAULT_CACHE_CAPACITY`] patterns
    pub fn new(catalog: Arc<PermissionCatalog>) -> Self {
        Self::with_capacity(catalog, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates an expander, optionally without a cache
    pub fn with_cache(catalog: Arc<PermissionCatalog>, cache_enabled: bool) -> Self {
        let capacity = if cache_enabled { DEFAULT_CACHE_CAPACITY } else { 0 };
        Self::with_capacity(catalog, capacity)
    }

    /// Creates an expander caching at most `capacity` patterns (0 disables the cache)
    pub fn with_capacity(catalog: Arc<PermissionCatalog>, capacity: usize) -> Self {
        Self {
            catalog,
            cache: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            evictions: AtomicUsize::new(0),
        }
    }

    /// Returns the catalog
    pub fn catalog(&self) -> &Arc<PermissionCatalog> {
        &self.catalog
    }

    /// Expands one permission
    pub fn expand(&self, pattern: &Permission) -> Arc<Vec<Permission>> {
        let cache = match &self.cache {
            Some(cache) if pattern.is_pattern() => cache,
            _ => return Arc::new(expand(pattern, &self.catalog)),
        };

        if let Some(hit) = cache.lock().get(pattern.as_str()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(hit);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // Expand outside the lock; a concurrent miss on the same pattern
        // computes the same value
        let expanded = Arc::new(expand(pattern, &self.catalog));
        debug!("Expanded {} to {} permissions", pattern, expanded.len());

        let displaced = cache
            .lock()
            .push(pattern.as_str().to_string(), Arc::clone(&expanded));
        if let Some((key, _)) = displaced {
            if key != pattern.as_str() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!("Evicted cached expansion of {}", key);
            }
        }

        expanded
    }

    /// Expands a raw string; malformed input expands to nothing
    pub fn expand_str(&self, pattern: &str) -> Arc<Vec<Permission>> {
        match Permission::new(pattern) {
            Ok(permission) => self.expand(&permission),
            Err(e) => {
                warn!("Not expanding malformed permission '{}': {}", pattern, e);
                Arc::new(Vec::new())
            }
        }
    }

    /// Expands every key of a map (later entries win on collision)
    pub fn expand_map(&self, map: &PermissionMap) -> PermissionMap {
        let mut expanded = PermissionMap::with_capacity(map.len());
        for (permission, value) in map.iter() {
            for concrete in self.expand(permission).iter() {
                expanded.insert(concrete.clone(), value);
            }
        }
        expanded
    }

    /// Clears the cache and its statistics
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().clear();
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    /// Returns cache statistics
    pub fn stats(&self) -> CacheStats {
        let (entries, capacity) = match &self.cache {
            Some(cache) => {
                let cache = cache.lock();
                (cache.len(), cache.cap().get())
            }
            None => (0, 0),
        };

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
            evictions: self.evictions.load(Ordering::Relaxed),
            capacity,
        }
    }
}
