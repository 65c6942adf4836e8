#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-process caching for the lookup pipeline.
//!
//! Two tiers with different lifetimes:
//!
//! * [`TtlCache`] — a bounded map with per-category time-to-live, shared
//!   across requests. Expiry is lazy (checked on read) and eviction is
//!   insertion-order when a cache is full.
//! * [`RequestCache`] — an unbounded scratch map that lives for one logical
//!   request, deduplicating fetches the categories share (the parcel
//!   geometry, the jurisdiction).
//!
//! Nothing here persists; a process restart starts cold.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use parcel_map_models::{
    AssessorOutcome, Jurisdiction, OverlayHit, ParcelFeature, ZoningOutcome,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Jurisdiction boundaries change on political timescales.
pub const JURISDICTION_TTL: Duration = Duration::from_secs(60 * 60);

/// Parcel, zoning, and assessor data are re-published upstream on roughly
/// daily cycles; 10 minutes keeps interactive sessions snappy without
/// serving stale corrections for long.
pub const PARCEL_TTL: Duration = Duration::from_secs(10 * 60);
pub const ZONING_TTL: Duration = Duration::from_secs(10 * 60);
pub const ASSESSOR_TTL: Duration = Duration::from_secs(10 * 60);

/// Overlay layers are the flakiest upstreams, so failures age out fastest.
pub const OVERLAY_TTL: Duration = Duration::from_secs(5 * 60);

const PARCEL_CAPACITY: usize = 512;
const JURISDICTION_CAPACITY: usize = 1024;
const ZONING_CAPACITY: usize = 512;
const OVERLAY_CAPACITY: usize = 256;
const ASSESSOR_CAPACITY: usize = 512;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Bounded map with time-to-live expiry and insertion-order eviction.
///
/// Expired entries are dropped lazily when read, so `len()` reflects what a
/// reader could actually get back. Re-setting a live key overwrites its
/// value without refreshing its insertion-order position.
pub struct TtlCache<V> {
    name: &'static str,
    capacity: usize,
    ttl: Duration,
    entries: HashMap<String, Entry<V>>,
    order: VecDeque<String>,
}

impl<V> TtlCache<V> {
    #[must_use]
    pub fn new(name: &'static str, capacity: usize, ttl: Duration) -> Self {
        Self {
            name,
            capacity,
            ttl,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: V) {
        self.set_at(key, value, Instant::now());
    }

    fn set_at(&mut self, key: &str, value: V, now: Instant) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.value = value;
            entry.inserted_at = now;
            return;
        }
        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.order.push_back(key.to_string());
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted_at: now,
            },
        );
    }

    fn evict_oldest(&mut self) {
        while let Some(oldest) = self.order.pop_front() {
            // Keys that already expired out leave stale order entries
            // behind; skip those and keep popping until a live key goes.
            if self.entries.remove(&oldest).is_some() {
                log::debug!(
                    "{}: evicted '{oldest}' at capacity {}",
                    self.name,
                    self.capacity
                );
                return;
            }
        }
    }

    /// Drop every expired entry eagerly.
    pub fn cleanup(&mut self) {
        self.cleanup_at(Instant::now());
    }

    fn cleanup_at(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.duration_since(entry.inserted_at) < ttl);
        let entries = &self.entries;
        self.order.retain(|key| entries.contains_key(key));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Live entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            name: self.name.to_string(),
            entries: self.entries.len(),
            capacity: self.capacity,
            ttl_seconds: self.ttl.as_secs(),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    /// Fetch a live entry, dropping it if its TTL has elapsed.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                self.entries.remove(key);
                log::trace!("{}: expired '{key}'", self.name);
                None
            }
            None => None,
        }
    }
}

/// Snapshot of one cache's occupancy, for the stats surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub name: String,
    pub entries: usize,
    pub capacity: usize,
    pub ttl_seconds: u64,
}

fn lock<V>(cache: &Mutex<TtlCache<V>>) -> MutexGuard<'_, TtlCache<V>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The cross-request caches, one per lookup category, each behind its own
/// lock so categories never contend with each other.
pub struct CacheRegistry {
    parcels: Mutex<TtlCache<ParcelFeature>>,
    jurisdictions: Mutex<TtlCache<Jurisdiction>>,
    zoning: Mutex<TtlCache<ZoningOutcome>>,
    overlays: Mutex<TtlCache<Vec<OverlayHit>>>,
    assessor: Mutex<TtlCache<AssessorOutcome>>,
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parcels: Mutex::new(TtlCache::new("parcels", PARCEL_CAPACITY, PARCEL_TTL)),
            jurisdictions: Mutex::new(TtlCache::new(
                "jurisdictions",
                JURISDICTION_CAPACITY,
                JURISDICTION_TTL,
            )),
            zoning: Mutex::new(TtlCache::new("zoning", ZONING_CAPACITY, ZONING_TTL)),
            overlays: Mutex::new(TtlCache::new("overlays", OVERLAY_CAPACITY, OVERLAY_TTL)),
            assessor: Mutex::new(TtlCache::new("assessor", ASSESSOR_CAPACITY, ASSESSOR_TTL)),
        }
    }

    pub fn get_parcel(&self, key: &str) -> Option<ParcelFeature> {
        lock(&self.parcels).get(key)
    }

    pub fn set_parcel(&self, key: &str, value: ParcelFeature) {
        lock(&self.parcels).set(key, value);
    }

    pub fn get_jurisdiction(&self, key: &str) -> Option<Jurisdiction> {
        lock(&self.jurisdictions).get(key)
    }

    pub fn set_jurisdiction(&self, key: &str, value: Jurisdiction) {
        lock(&self.jurisdictions).set(key, value);
    }

    pub fn get_zoning(&self, key: &str) -> Option<ZoningOutcome> {
        lock(&self.zoning).get(key)
    }

    pub fn set_zoning(&self, key: &str, value: ZoningOutcome) {
        lock(&self.zoning).set(key, value);
    }

    pub fn get_overlays(&self, key: &str) -> Option<Vec<OverlayHit>> {
        lock(&self.overlays).get(key)
    }

    pub fn set_overlays(&self, key: &str, value: Vec<OverlayHit>) {
        lock(&self.overlays).set(key, value);
    }

    pub fn get_assessor(&self, key: &str) -> Option<AssessorOutcome> {
        lock(&self.assessor).get(key)
    }

    pub fn set_assessor(&self, key: &str, value: AssessorOutcome) {
        lock(&self.assessor).set(key, value);
    }

    /// Occupancy snapshot of every cache, in a stable order.
    #[must_use]
    pub fn stats(&self) -> Vec<CacheStats> {
        vec![
            lock(&self.parcels).stats(),
            lock(&self.jurisdictions).stats(),
            lock(&self.zoning).stats(),
            lock(&self.overlays).stats(),
            lock(&self.assessor).stats(),
        ]
    }

    pub fn clear_all(&self) {
        lock(&self.parcels).clear();
        lock(&self.jurisdictions).clear();
        lock(&self.zoning).clear();
        lock(&self.overlays).clear();
        lock(&self.assessor).clear();
    }

    pub fn cleanup_all(&self) {
        lock(&self.parcels).cleanup();
        lock(&self.jurisdictions).cleanup();
        lock(&self.zoning).cleanup();
        lock(&self.overlays).cleanup();
        lock(&self.assessor).cleanup();
    }
}

/// Scratch cache scoped to one logical request.
///
/// Values are stored as raw JSON so one map can hold every intermediate the
/// pipeline shares between categories.
#[derive(Debug, Default)]
pub struct RequestCache {
    values: HashMap<String, Value>,
}

impl RequestCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Fetch and deserialize. Returns `None` on a miss or a shape mismatch.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    /// Serialize and store. Values that fail to serialize are logged and
    /// skipped; the request then just re-fetches.
    pub fn set_as<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.values.insert(key.to_string(), value);
            }
            Err(e) => log::warn!("request cache: could not store '{key}': {e}"),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
