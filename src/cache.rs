use crate::types::Chain;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Memo key: (chain, method, hash of the call arguments).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub chain: Chain,
    pub method: &'static str,
    pub args_hash: u64,
}

impl CacheKey {
    pub fn new<A: Hash + ?Sized>(chain: Chain, method: &'static str, args: &A) -> Self {
        let mut hasher = DefaultHasher::new();
        args.hash(&mut hasher);
        Self {
            chain,
            method,
            args_hash: hasher.finish(),
        }
    }
}

/// Time-bounded memo table. A zero TTL disables caching.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: CacheKey, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        self.lock().insert(key, (Instant::now(), value));
    }

    /// Returns the cached value or runs `fetch`; errors are never cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: CacheKey, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            tracing::debug!(chain = %key.chain, method = key.method, "cache hit");
            return Ok(value);
        }
        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn invalidate_chain(&self, chain: Chain) {
        self.lock().retain(|key, _| key.chain != chain);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, (Instant, V)>> {
        // Entries stay consistent even if a holder panicked.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
