//! Time-bounded result cache keyed by request fingerprint
//!
//! Expiry is checked when an entry is read. Nothing is evicted
//! in the background; a stale entry is removed by the lookup that
//! finds it, or overwritten by the next successful store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use log::{debug, info};
use tokio::time::Instant;

/// Stored value plus the moment it was stored
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V>
{   pub value: V
  , pub inserted_at: Instant
  , pub ttl: Duration
}

impl<V> CacheEntry<V>
{   /// Live strictly before `inserted_at + ttl`
    pub fn is_live(&self, now: Instant) -> bool
    {   now.saturating_duration_since(self.inserted_at) < self.ttl
    }
}

/// Backing store for [`ResultCache`].
///
/// `set` must replace an entry whole; readers never see a
/// half-written value.
pub trait CacheStore<V>: Send + Sync
{   fn get(&self, key: &str) -> Option<CacheEntry<V>>;
    fn set(&self, key: &str, value: V, ttl: Duration);
    /// Remove `key` if it is still dead at `now`; a fresher entry
    /// stored since the caller's read is kept.
    fn evict_expired(&self, key: &str, now: Instant) -> bool;
    fn clear_all(&self);
}

/// In-process store: a map behind a read-write lock
#[derive(Debug)]
pub struct MemoryStore<V>
{   entries: RwLock<HashMap<String, CacheEntry<V>>>
}

impl<V> MemoryStore<V>
{   pub fn new() -> Self
    {   MemoryStore
        {   entries: RwLock::new(HashMap::new())
        }
    }

    /// Entries held, live or not
    pub fn len(&self) -> usize
    {   self.entries
          .read()
          .unwrap_or_else(PoisonError::into_inner)
          .len()
    }

    pub fn is_empty(&self) -> bool
    {   self.len() == 0
    }
}

impl<V> Default for MemoryStore<V>
{   fn default() -> Self
    {   MemoryStore::new()
    }
}

impl<V: Clone + Send + Sync> CacheStore<V> for MemoryStore<V>
{   fn get(&self, key: &str) -> Option<CacheEntry<V>>
    {   self.entries
          .read()
          .unwrap_or_else(PoisonError::into_inner)
          .get(key)
          .cloned()
    }

    fn set(&self, key: &str, value: V, ttl: Duration)
    {   let entry = CacheEntry
        {   value
          , inserted_at: Instant::now()
          , ttl
        };
        self.entries
          .write()
          .unwrap_or_else(PoisonError::into_inner)
          .insert(key.to_string(), entry);
    }

    fn evict_expired(&self, key: &str, now: Instant) -> bool
    {   let mut entries = self.entries
          .write()
          .unwrap_or_else(PoisonError::into_inner);
        match entries.get(key)
        {   Some(entry) if !entry.is_live(now) => {
              entries.remove(key);
              true
            }
          , _ => false
        }
    }

    fn clear_all(&self)
    {   self.entries
          .write()
          .unwrap_or_else(PoisonError::into_inner)
          .clear();
    }
}

/// Memoizes successful results for a fixed window.
/// Failures are never stored.
pub struct ResultCache<V>
{   store: Arc<dyn CacheStore<V>>
  , ttl: Duration
}

impl<V> ResultCache<V>
where
  V: Clone + Send + Sync + 'static
{   /// Cache over a fresh [`MemoryStore`]
    pub fn new(ttl: Duration) -> Self
    {   ResultCache::with_store(Arc::new(MemoryStore::new()), ttl)
    }

    pub fn with_store(store: Arc<dyn CacheStore<V>>, ttl: Duration)
      -> Self
    {   ResultCache { store, ttl }
    }

    pub fn ttl(&self) -> Duration
    {   self.ttl
    }

    /// Live value for `key`, if any. A dead entry found here is
    /// dropped from the store.
    pub fn get(&self, key: &str) -> Option<V>
    {   let entry = self.store.get(key)?;
        let now = Instant::now();
        if entry.is_live(now)
        {   debug!("Using cached content for key: {}", key);
            Some(entry.value)
        } else
        {   if self.store.evict_expired(key, now)
            {   debug!("Evicted expired content for key: {}", key);
            }
            None
        }
    }

    pub fn insert(&self, key: &str, value: V)
    {   self.store.set(key, value, self.ttl);
        debug!("Cached content for key: {}", key);
    }

    /// Serve a live entry, or run `compute` and store its success.
    ///
    /// Concurrent misses on the same key each run `compute`.
    pub async fn get_or_compute<F, Fut, E>(
      &self
    , key: &str
    , compute: F
    ) -> Result<V, E>
    where
      F: FnOnce() -> Fut
    , Fut: Future<Output = Result<V, E>>
    {   if let Some(value) = self.get(key)
        {   return Ok(value);
        }

        let value = compute().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Drop every entry
    pub fn clear(&self)
    {   self.store.clear_all();
        info!("Result cache cleared");
    }
}
