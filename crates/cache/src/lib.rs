//! State-aware response cache for agent calls.
//!
//! Memoizes agent outputs keyed by **agent name + serialized pruned
//! input + state fingerprint**. Because the fingerprint is part of the
//! key, invalidation is implicit: any state mutation changes the
//! fingerprint and stale entries simply stop matching — no invalidation
//! bookkeeping exists anywhere.
//!
//! Freshness and bounds:
//! - per-entry TTL; a TTL of zero means "never cache"
//! - a background sweep removes expired entries
//! - an LRU policy bounds the entry count at a capacity ceiling
//!
//! The store is one explicitly constructed service object shared by
//! handle (`Arc`) across request flows. Interior state sits behind a
//! `Mutex` held only for brief map operations, never across an await.
//! Last-writer-wins on concurrent puts of the same key: equal keys are
//! assumed to produce interchangeable values.
//!
//! Time is measured with `tokio::time::Instant` so TTL behavior is
//! exercisable under paused test time.

use brainstem_core::{AgentInput, AgentOutput, StateFingerprint};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// A memoized agent output.
struct CacheEntry {
    value: AgentOutput,
    created_at: Instant,
    ttl: Duration,
    last_access: Instant,
    fingerprint: StateFingerprint,
}

impl CacheEntry {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) >= self.ttl
    }
}

/// The response cache.
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    capacity: usize,
}

impl ResponseCache {
    /// Create a cache bounded at `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Look up a memoized output.
    ///
    /// Returns `None` on an unknown key, an expired entry (which is
    /// removed on the spot), or a key serialization failure (degraded
    /// miss).
    pub fn get(
        &self,
        agent: &str,
        input: &AgentInput,
        fingerprint: &StateFingerprint,
    ) -> Option<AgentOutput> {
        let key = self.key(agent, input, fingerprint)?;
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let expired = matches!(entries.get(&key), Some(entry) if entry.expired(now));
        if expired {
            trace!(agent, "Cache entry expired");
            entries.remove(&key);
            return None;
        }

        match entries.get_mut(&key) {
            Some(entry) if entry.fingerprint == *fingerprint => {
                entry.last_access = now;
                Some(entry.value.clone())
            }
            _ => None,
        }
    }

    /// Memoize an output.
    ///
    /// A zero TTL means the value is never cached. A serialization
    /// failure is logged and swallowed — the caller sees no difference.
    pub fn put(
        &self,
        agent: &str,
        input: &AgentInput,
        fingerprint: &StateFingerprint,
        value: AgentOutput,
        ttl: Duration,
    ) {
        if ttl.is_zero() {
            return;
        }
        let Some(key) = self.key(agent, input, fingerprint) else {
            return;
        };

        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                ttl,
                last_access: now,
                fingerprint: fingerprint.clone(),
            },
        );

        if entries.len() > self.capacity {
            Self::evict_lru(&mut entries);
        }
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| !entry.expired(now));
        before - entries.len()
    }

    /// Spawn the background sweep loop. The task runs until aborted or
    /// the runtime shuts down.
    pub fn spawn_sweeper(
        self: &std::sync::Arc<Self>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = cache.sweep();
                if removed > 0 {
                    debug!(removed, "Cache sweep removed expired entries");
                }
            }
        })
    }

    /// Current entry count.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Compute the key for (agent, input, fingerprint).
    ///
    /// `None` signals a serialization failure, which degrades to a miss.
    fn key(
        &self,
        agent: &str,
        input: &AgentInput,
        fingerprint: &StateFingerprint,
    ) -> Option<String> {
        let serialized = match serde_json::to_string(input) {
            Ok(s) => s,
            Err(e) => {
                debug!(agent, error = %e, "Cache key serialization failed, treating as miss");
                return None;
            }
        };

        let mut hasher = Sha256::new();
        hasher.update(agent.as_bytes());
        hasher.update([0u8]);
        hasher.update(serialized.as_bytes());
        hasher.update([0u8]);
        hasher.update(fingerprint.0.as_bytes());
        Some(format!("{:x}", hasher.finalize()))
    }

    fn evict_lru(entries: &mut HashMap<String, CacheEntry>) {
        if let Some(key) = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone())
        {
            trace!("Evicting least-recently-used cache entry");
            entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brainstem_core::ProjectState;

    fn input(message: &str) -> AgentInput {
        AgentInput {
            message: message.into(),
            history: vec![],
            state: serde_json::Value::Null,
        }
    }

    fn fingerprint_at(revision: u64) -> StateFingerprint {
        ProjectState {
            revision,
            data: serde_json::Value::Null,
        }
        .fingerprint()
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = ResponseCache::new(16);
        let fp = fingerprint_at(1);
        let inp = input("verify the plan");

        assert!(cache.get("verify", &inp, &fp).is_none());

        cache.put(
            "verify",
            &inp,
            &fp,
            AgentOutput::public("looks sound", 80),
            Duration::from_secs(120),
        );

        let hit = cache.get("verify", &inp, &fp).unwrap();
        assert_eq!(hit.content, "looks sound");
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expiry_scenario() {
        // TTL 120s: hit at t=60s, miss at t=130s.
        let cache = ResponseCache::new(16);
        let fp = fingerprint_at(1);
        let inp = input("verify the plan");

        cache.put(
            "verify",
            &inp,
            &fp,
            AgentOutput::public("fresh", 10),
            Duration::from_millis(120_000),
        );

        tokio::time::advance(Duration::from_millis(60_000)).await;
        assert!(cache.get("verify", &inp, &fp).is_some());

        tokio::time::advance(Duration::from_millis(70_000)).await;
        assert!(cache.get("verify", &inp, &fp).is_none());
        // The expired entry was removed eagerly.
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn zero_ttl_never_caches() {
        let cache = ResponseCache::new(16);
        let fp = fingerprint_at(1);
        let inp = input("record this");

        cache.put(
            "record",
            &inp,
            &fp,
            AgentOutput::public("recorded", 5),
            Duration::ZERO,
        );
        assert!(cache.is_empty());
        assert!(cache.get("record", &inp, &fp).is_none());
    }

    #[tokio::test]
    async fn fingerprint_change_forces_miss() {
        let cache = ResponseCache::new(16);
        let inp = input("verify the plan");
        let before = fingerprint_at(1);
        let after = fingerprint_at(2);

        cache.put(
            "verify",
            &inp,
            &before,
            AgentOutput::public("stale soon", 10),
            Duration::from_secs(300),
        );

        assert!(cache.get("verify", &inp, &before).is_some());
        assert!(cache.get("verify", &inp, &after).is_none());
    }

    #[tokio::test]
    async fn different_inputs_do_not_collide() {
        let cache = ResponseCache::new(16);
        let fp = fingerprint_at(1);

        cache.put(
            "verify",
            &input("plan a"),
            &fp,
            AgentOutput::public("about a", 10),
            Duration::from_secs(300),
        );

        assert!(cache.get("verify", &input("plan b"), &fp).is_none());
        let hit = cache.get("verify", &input("plan a"), &fp).unwrap();
        assert_eq!(hit.content, "about a");
    }

    #[tokio::test]
    async fn different_agents_do_not_collide() {
        let cache = ResponseCache::new(16);
        let fp = fingerprint_at(1);
        let inp = input("same input");

        cache.put(
            "verify",
            &inp,
            &fp,
            AgentOutput::public("verify says", 10),
            Duration::from_secs(300),
        );

        assert!(cache.get("scan_assumptions", &inp, &fp).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn lru_eviction_at_capacity() {
        let cache = ResponseCache::new(2);
        let fp = fingerprint_at(1);
        let ttl = Duration::from_secs(3_600);

        cache.put("a", &input("x"), &fp, AgentOutput::public("a", 1), ttl);
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.put("b", &input("x"), &fp, AgentOutput::public("b", 1), ttl);
        tokio::time::advance(Duration::from_millis(10)).await;

        // Touch "a" so "b" becomes the least recently used.
        assert!(cache.get("a", &input("x"), &fp).is_some());
        tokio::time::advance(Duration::from_millis(10)).await;

        cache.put("c", &input("x"), &fp, AgentOutput::public("c", 1), ttl);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", &input("x"), &fp).is_some());
        assert!(cache.get("b", &input("x"), &fp).is_none());
        assert!(cache.get("c", &input("x"), &fp).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_expired_entries() {
        let cache = ResponseCache::new(16);
        let fp = fingerprint_at(1);

        cache.put(
            "short",
            &input("x"),
            &fp,
            AgentOutput::public("s", 1),
            Duration::from_secs(10),
        );
        cache.put(
            "long",
            &input("x"),
            &fp,
            AgentOutput::public("l", 1),
            Duration::from_secs(1_000),
        );

        tokio::time::advance(Duration::from_secs(60)).await;
        let removed = cache.sweep();
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("long", &input("x"), &fp).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn background_sweeper_runs() {
        let cache = std::sync::Arc::new(ResponseCache::new(16));
        let fp = fingerprint_at(1);
        cache.put(
            "short",
            &input("x"),
            &fp,
            AgentOutput::public("s", 1),
            Duration::from_secs(10),
        );

        let handle = cache.spawn_sweeper(Duration::from_secs(30));
        tokio::time::advance(Duration::from_secs(65)).await;
        // Let the sweeper task run its pending tick.
        tokio::task::yield_now().await;

        assert!(cache.is_empty());
        handle.abort();
    }

    #[tokio::test]
    async fn last_writer_wins_on_same_key() {
        let cache = ResponseCache::new(16);
        let fp = fingerprint_at(1);
        let inp = input("same");
        let ttl = Duration::from_secs(300);

        cache.put("verify", &inp, &fp, AgentOutput::public("first", 1), ttl);
        cache.put("verify", &inp, &fp, AgentOutput::public("second", 1), ttl);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("verify", &inp, &fp).unwrap().content, "second");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_access_does_not_corrupt() {
        let cache = std::sync::Arc::new(ResponseCache::new(64));
        let fp = fingerprint_at(1);
        let ttl = Duration::from_secs(300);

        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = cache.clone();
            let fp = fp.clone();
            handles.push(tokio::spawn(async move {
                for j in 0..50 {
                    let inp = input(&format!("msg-{}", j % 5));
                    cache.put(
                        "verify",
                        &inp,
                        &fp,
                        AgentOutput::public(format!("{i}-{j}"), 1),
                        ttl,
                    );
                    let _ = cache.get("verify", &inp, &fp);
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        // Five distinct inputs were written; all must be present and readable.
        assert_eq!(cache.len(), 5);
    }
}
