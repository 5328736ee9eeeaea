use std::borrow::Borrow;
use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Expiring<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Expiring<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Concurrent map whose entries disappear once their ttl has elapsed.
///
/// Expiry is checked on access; an expired entry is indistinguishable from one
/// that was never written. `purge_expired` reclaims the memory of entries nobody
/// asks for again.
pub struct ExpiringStore<K, V> {
    data: DashMap<K, Expiring<V>>,
    ttl: Duration,
}

impl<K, V> ExpiringStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            data: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Inserts or replaces `key`, restarting its clock with the store ttl.
    pub fn put(&self, key: K, value: V) {
        self.put_with_ttl(key, value, self.ttl)
    }

    /// Same as `put` with an explicit ttl. A zero ttl would expire immediately,
    /// so nothing is written.
    pub fn put_with_ttl(&self, key: K, value: V, ttl: Duration) {
        if ttl.is_zero() {
            let _ = self.data.remove(&key);
            return;
        }

        let entry = Expiring {
            value,
            expires_at: Instant::now() + ttl,
        };
        let _ = self.data.insert(key, entry);
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();

        match self.data.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        // the read guard is released above, removing now cannot deadlock the shard
        let _ = self.data.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.data.len();
        self.data.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.data.len())
    }

    /// Number of stored entries, expired ones that were not purged yet included.
    pub fn len(&self) -> usize {
        self.data.len()
    }
}
