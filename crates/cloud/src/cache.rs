//! LRU cache of decoded band rasters.

use chrono::NaiveDate;
use lru::LruCache;
use orbit_core::Raster;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Key for cached bands: one band of one acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneKey {
    pub collection: String,
    pub acquired: NaiveDate,
    pub band: String,
}

impl SceneKey {
    pub fn new(collection: &str, acquired: NaiveDate, band: &str) -> Self {
        Self {
            collection: collection.to_string(),
            acquired,
            band: band.to_string(),
        }
    }
}

/// LRU cache storing decoded bands.
pub struct SceneCache {
    inner: LruCache<SceneKey, Arc<Raster<f64>>>,
}

impl SceneCache {
    /// Create a new cache holding up to `capacity` bands.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a cached band, if present.
    pub fn get(&mut self, key: &SceneKey) -> Option<Arc<Raster<f64>>> {
        self.inner.get(key).cloned()
    }

    pub fn insert(&mut self, key: SceneKey, raster: Arc<Raster<f64>>) {
        self.inner.put(key, raster);
    }

    /// Number of bands currently cached.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}
