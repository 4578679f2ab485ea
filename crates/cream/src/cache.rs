//! Thread-safe facade over the table core.
//!
//! [`Cache`] wraps [`store::Table`] in an `std::sync::RwLock`. Writers
//! (`put`, `evict`, `clear`, `invalidate`) serialize on the exclusive lock.
//! `get` runs under the shared lock and only escalates to the exclusive lock
//! when it observes a hit that has outlived its lifetime: the expiry sweep
//! mutates the table, so it re-runs the lookup under exclusive access. The
//! re-probe tolerates racing writers, a put that refreshed the key between
//! the two lock acquisitions simply turns the miss back into a hit.
//!
//! Externally visible map state is sequentially consistent at operation
//! boundaries. Returned values are always freshly allocated copies, never
//! views into cache storage.

use std::sync::RwLock;

use crate::hash::{jenkins_one_at_a_time, HashFn};
use crate::store::{Lookup, Table};
use crate::types::{CacheConfig, CacheError, EvictHook};

/// A bounded, concurrent key/value cache with insertion-order eviction and a
/// uniform per-entry lifetime.
pub struct Cache {
    table: RwLock<Table>,
}

impl Cache {
    /// A cache with the default Jenkins one-at-a-time hash and no eviction
    /// hook.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_hash(config, jenkins_one_at_a_time)
    }

    /// A cache with a caller-supplied hash function.
    pub fn with_hash(config: CacheConfig, hash: HashFn) -> Self {
        Self::assemble(config, hash, None)
    }

    /// A cache that calls `hook` with `(key, value)` exactly once for every
    /// entry it destroys.
    pub fn with_eviction_hook(config: CacheConfig, hash: HashFn, hook: EvictHook) -> Self {
        Self::assemble(config, hash, Some(hook))
    }

    fn assemble(config: CacheConfig, hash: HashFn, on_evict: Option<EvictHook>) -> Self {
        Self {
            table: RwLock::new(Table::new(&config, hash, on_evict)),
        }
    }

    /// Insert or replace `key`. The cache stores its own copies of the byte
    /// slices; on any error the caller's buffers are untouched and nothing
    /// was mutated.
    pub fn put(&self, key: &[u8], value: &[u8], force: bool) -> Result<(), CacheError> {
        let mut table = self.table.write().map_err(|_| CacheError::BadArgs)?;
        table.put(key, value, force)
    }

    /// Look up `key`, returning an owned copy of the value bytes. An entry
    /// past its lifetime is removed, together with everything inserted before
    /// it, and reported as a miss.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CacheError> {
        {
            let table = self.table.read().map_err(|_| CacheError::BadArgs)?;
            match table.lookup(key)? {
                Lookup::Hit(value) => return Ok(Some(value)),
                Lookup::Miss => return Ok(None),
                Lookup::Expired => {}
            }
        }
        let mut table = self.table.write().map_err(|_| CacheError::BadArgs)?;
        table.get(key)
    }

    /// Remove `key` if present. Returns whether an entry was removed.
    pub fn evict(&self, key: &[u8]) -> Result<bool, CacheError> {
        let mut table = self.table.write().map_err(|_| CacheError::BadArgs)?;
        table.evict(key)
    }

    /// Destroy every entry, leaving the cache empty but usable.
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut table = self.table.write().map_err(|_| CacheError::BadArgs)?;
        table.clear()
    }

    /// Destroy every entry and refuse all further operations. Terminal.
    pub fn invalidate(&self) -> Result<(), CacheError> {
        let mut table = self.table.write().map_err(|_| CacheError::BadArgs)?;
        table.invalidate()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.table.read().map(|t| t.len()).unwrap_or(0)
    }

    /// `true` when no live entries exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed slot count chosen at construction.
    pub fn capacity(&self) -> usize {
        self.table.read().map(|t| t.capacity()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn cache(capacity: usize) -> Cache {
        Cache::new(CacheConfig::with_capacity(capacity))
    }

    #[test]
    fn test_put_get_round_trip() {
        let c = cache(8);
        c.put(b"key", b"value", true).expect("put");
        assert_eq!(c.get(b"key").expect("get"), Some(b"value".to_vec()));
        assert_eq!(c.len(), 1);
        assert!(!c.is_empty());
        assert_eq!(c.capacity(), 8);
    }

    #[test]
    fn test_expired_read_escalates_and_removes() {
        let c = Cache::new(CacheConfig {
            capacity: 4,
            ttl: Duration::from_millis(30),
        });
        c.put(b"k", b"v", true).expect("put");
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(c.get(b"k").expect("get"), None);
        assert_eq!(c.len(), 0, "the expired entry must be gone after the read");
    }

    #[test]
    fn test_concurrent_distinct_puts_fill_exactly() {
        const WORKERS: usize = 8;
        let c = Arc::new(cache(WORKERS));
        let handles: Vec<_> = (0..WORKERS)
            .map(|i| {
                let c = Arc::clone(&c);
                std::thread::spawn(move || {
                    let key = format!("key-{i}");
                    let value = format!("value-{i}");
                    c.put(key.as_bytes(), value.as_bytes(), true).expect("put");
                })
            })
            .collect();
        for h in handles {
            h.join().expect("writer thread panicked");
        }
        assert_eq!(c.len(), WORKERS);
        for i in 0..WORKERS {
            let key = format!("key-{i}");
            let value = format!("value-{i}");
            assert_eq!(
                c.get(key.as_bytes()).expect("get"),
                Some(value.into_bytes())
            );
        }
    }

    #[test]
    fn test_returned_copy_outlives_clear() {
        let c = cache(4);
        c.put(b"k", b"payload", true).expect("put");
        let copy = c.get(b"k").expect("get").expect("hit");
        c.clear().expect("clear");
        assert_eq!(copy, b"payload".to_vec(), "the copy is owned by the caller");
        assert_eq!(c.get(b"k").expect("get"), None);
    }

    #[test]
    fn test_invalidate_poisons_every_operation() {
        let c = cache(4);
        c.put(b"k", b"v", true).expect("put");
        c.invalidate().expect("invalidate");
        assert_eq!(c.put(b"k", b"v", true), Err(CacheError::BadArgs));
        assert_eq!(c.get(b"k").unwrap_err(), CacheError::BadArgs);
        assert_eq!(c.evict(b"k").unwrap_err(), CacheError::BadArgs);
        assert_eq!(c.clear().unwrap_err(), CacheError::BadArgs);
    }

    #[test]
    fn test_poisoned_lock_maps_to_bad_args() {
        let c = Arc::new(cache(4));
        let poisoner = Arc::clone(&c);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.table.write().expect("first write lock");
            panic!("poison the cache lock");
        })
        .join();
        assert_eq!(c.put(b"k", b"v", true), Err(CacheError::BadArgs));
        assert_eq!(c.get(b"k").unwrap_err(), CacheError::BadArgs);
        assert_eq!(c.len(), 0, "len degrades to 0 rather than panicking");
    }

    #[test]
    fn test_readers_run_against_writers() {
        // A mixed read/write burst over a small table; this is a smoke test
        // for lock ordering, the assertions are on the final state.
        let c = Arc::new(cache(16));
        let mut handles = Vec::new();
        for i in 0..4 {
            let c = Arc::clone(&c);
            handles.push(std::thread::spawn(move || {
                for round in 0..50 {
                    let key = format!("k{}", (i + round) % 16);
                    c.put(key.as_bytes(), b"v", true).expect("put");
                    let _ = c.get(key.as_bytes()).expect("get");
                }
            }));
        }
        for h in handles {
            h.join().expect("worker panicked");
        }
        assert!(c.len() <= 16);
        assert!(c.len() >= 1);
    }
}
