use std::{num::NonZeroUsize, sync::Arc};

use lru::LruCache;

use crate::{
    export::PostalCode,
    weather::{DateRange, Observation},
};

pub type CacheKey = (PostalCode, DateRange);

/// Successfully fetched observations of the current session.
///
/// Holds at most `capacity` entries and evicts the least recently used one first.
pub struct WeatherCache(LruCache<CacheKey, Arc<[Observation]>>);

impl WeatherCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self(LruCache::new(capacity))
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<[Observation]>> {
        self.0.get(key).cloned()
    }

    pub fn insert(&mut self, key: CacheKey, observations: Arc<[Observation]>) {
        self.0.put(key, observations);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
