//! Per-(device, persona) artifact store with lazily enforced TTL.

use std::collections::HashMap;
use std::sync::Mutex;

use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::artifact::Artifact;
use crate::domain::device::{DeviceKey, EffectiveConfig};
use crate::domain::persona::Persona;
use crate::util::sync::mutex_lock;

use super::keys::CacheKey;
use super::ttl::Ttl;

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_HIT: &str = "inkcast_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "inkcast_cache_miss_total";
pub(crate) const METRIC_CACHE_EXPIRED: &str = "inkcast_cache_expired_total";

struct CacheEntry {
    artifact: Artifact,
    produced_at: Instant,
}

/// Rendered artifacts keyed by (device, persona).
///
/// Every operation runs under one exclusive lock spanning the whole key space. Lookups and
/// stores for different devices therefore serialize with each other; the map holds one entry
/// per active device and persona, so contention stays negligible. The lock is never held
/// across an `.await`.
#[derive(Default)]
pub struct ContentCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the artifact for `persona` on `device`.
    ///
    /// The TTL is derived from `config` unless `ttl` is supplied. An entry observed past its
    /// TTL is removed before `None` is returned.
    pub fn get(
        &self,
        device: &DeviceKey,
        persona: Persona,
        config: &EffectiveConfig,
        ttl: Option<Ttl>,
    ) -> Option<Artifact> {
        let key = CacheKey::new(device, persona);
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");

        let Some(entry) = entries.get(&key) else {
            counter!(METRIC_CACHE_MISS).increment(1);
            return None;
        };

        let ttl = ttl.unwrap_or_else(|| Ttl::for_config(config));
        if entry.produced_at.elapsed() < ttl.as_duration() {
            counter!(METRIC_CACHE_HIT).increment(1);
            return Some(entry.artifact.clone());
        }

        entries.remove(&key);
        counter!(METRIC_CACHE_EXPIRED).increment(1);
        counter!(METRIC_CACHE_MISS).increment(1);
        debug!(
            target = "inkcast::cache",
            key = %key,
            ttl_minutes = ttl.minutes(),
            "cache entry expired"
        );
        None
    }

    /// Store `artifact`, replacing any previous entry for the same slot.
    pub fn set(&self, device: &DeviceKey, persona: Persona, artifact: Artifact) {
        let entry = CacheEntry {
            artifact,
            produced_at: Instant::now(),
        };
        mutex_lock(&self.entries, SOURCE, "set").insert(CacheKey::new(device, persona), entry);
    }

    /// Whether a slot is occupied, regardless of its age.
    pub fn contains(&self, device: &DeviceKey, persona: Persona) -> bool {
        let key = CacheKey::new(device, persona);
        mutex_lock(&self.entries, SOURCE, "contains").contains_key(&key)
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
