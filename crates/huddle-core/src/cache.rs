// Memoizing result cache with a time-to-live.
//
// Expensive analytics (full-season scans, Monte Carlo runs) are stored here
// keyed by what they were computed from. Entries expire after their TTL and
// are dropped wholesale when the dashboard moves to a new season or week.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Identifies one cached computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// What was computed (e.g. "power_rankings", "playoff_odds").
    pub resource: &'static str,
    pub league_id: u64,
    pub season: u16,
    pub week: u32,
    /// Extra inputs that change the result (simulation count, seed, forced
    /// winners, ...). Empty when the result depends on the snapshot alone.
    pub params: String,
}

impl CacheKey {
    pub fn new(resource: &'static str, league_id: u64, season: u16, week: u32) -> Self {
        Self {
            resource,
            league_id,
            season,
            week,
            params: String::new(),
        }
    }

    pub fn with_params(mut self, params: impl Into<String>) -> Self {
        self.params = params.into();
        self
    }
}

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Key-value memo cache for one result type.
pub struct MemoCache<V> {
    entries: Mutex<HashMap<CacheKey, Entry<V>>>,
}

impl<V: Clone> Default for MemoCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> MemoCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, Entry<V>>> {
        self.entries.lock().expect("cache mutex poisoned")
    }

    /// Return the cached value for `key`, computing and storing it when
    /// missing or expired.
    pub fn get_or_compute<F>(&self, key: CacheKey, ttl: Duration, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        self.get_or_compute_at(key, ttl, Utc::now(), compute)
    }

    /// Same as [`get_or_compute`](Self::get_or_compute) with an explicit
    /// clock reading.
    pub fn get_or_compute_at<F>(&self, key: CacheKey, ttl: Duration, now: DateTime<Utc>, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(entry) = self.entries().get(&key) {
            if now < entry.expires_at {
                debug!(resource = key.resource, week = key.week, "cache hit");
                return entry.value.clone();
            }
        }

        // Compute without holding the lock; the closure may be slow.
        debug!(resource = key.resource, week = key.week, "cache miss");
        let value = compute();
        self.entries().insert(
            key,
            Entry {
                value: value.clone(),
                expires_at: now + ttl,
            },
        );
        value
    }

    /// Drop every entry that belongs to a different season or week of the
    /// given league. Entries for other leagues are left alone.
    pub fn retain_week(&self, league_id: u64, season: u16, week: u32) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| {
            key.league_id != league_id || (key.season == season && key.week == week)
        });
        before - entries.len()
    }

    /// Drop entries whose TTL has elapsed at `now`.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    pub fn invalidate_all(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::Cell;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 3, 12, 0, 0).unwrap()
    }

    #[test]
    fn computes_once_within_ttl() {
        let cache: MemoCache<u32> = MemoCache::new();
        let calls = Cell::new(0);
        let key = CacheKey::new("power_rankings", 1, 2024, 5);
        let compute = || {
            calls.set(calls.get() + 1);
            42
        };

        assert_eq!(cache.get_or_compute_at(key.clone(), Duration::hours(1), t0(), compute), 42);
        let again = cache.get_or_compute_at(key, Duration::hours(1), t0() + Duration::minutes(30), || {
            calls.set(calls.get() + 1);
            7
        });
        assert_eq!(again, 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn recomputes_after_expiry() {
        let cache: MemoCache<u32> = MemoCache::new();
        let key = CacheKey::new("awards", 1, 2024, 5);
        cache.get_or_compute_at(key.clone(), Duration::hours(1), t0(), || 1);
        let value = cache.get_or_compute_at(key, Duration::hours(1), t0() + Duration::hours(1), || 2);
        assert_eq!(value, 2);
    }

    #[test]
    fn params_distinguish_entries() {
        let cache: MemoCache<&'static str> = MemoCache::new();
        let base = CacheKey::new("playoff_odds", 1, 2024, 5);
        cache.get_or_compute_at(base.clone().with_params("sims=1000"), Duration::hours(1), t0(), || "a");
        let other = cache.get_or_compute_at(base.with_params("sims=500"), Duration::hours(1), t0(), || "b");
        assert_eq!(other, "b");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn retain_week_drops_stale_weeks_of_same_league_only() {
        let cache: MemoCache<u32> = MemoCache::new();
        let ttl = Duration::hours(1);
        cache.get_or_compute_at(CacheKey::new("r", 1, 2024, 4), ttl, t0(), || 4);
        cache.get_or_compute_at(CacheKey::new("r", 1, 2024, 5), ttl, t0(), || 5);
        cache.get_or_compute_at(CacheKey::new("r", 1, 2023, 5), ttl, t0(), || 6);
        cache.get_or_compute_at(CacheKey::new("r", 2, 2024, 1), ttl, t0(), || 7);

        assert_eq!(cache.retain_week(1, 2024, 5), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn evict_expired_and_invalidate_all() {
        let cache: MemoCache<u32> = MemoCache::new();
        cache.get_or_compute_at(CacheKey::new("a", 1, 2024, 1), Duration::minutes(5), t0(), || 1);
        cache.get_or_compute_at(CacheKey::new("b", 1, 2024, 1), Duration::hours(2), t0(), || 2);

        assert_eq!(cache.evict_expired(t0() + Duration::hours(1)), 1);
        assert_eq!(cache.len(), 1);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
