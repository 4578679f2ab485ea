//! Foundational public types for the cream library.
//!
//! This module defines the data shared by every other module:
//! - the key/value size limits enforced at both the wire and engine layers
//! - [`CacheConfig`] and [`ServerConfig`] construction parameters
//! - [`CacheError`], the engine's error enum
//! - [`EvictHook`], the callback invoked once per destroyed entry

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest accepted key, in bytes.
pub const MIN_KEY_SIZE: usize = 1;

/// Largest accepted key, in bytes.
pub const MAX_KEY_SIZE: usize = 64;

/// Smallest accepted value, in bytes.
pub const MIN_VALUE_SIZE: usize = 1;

/// Largest accepted value, in bytes.
pub const MAX_VALUE_SIZE: usize = 1024;

/// How long an entry may sit in the store before a lookup treats it as gone.
///
/// The lifetime is a data property of the entry, not a scheduling deadline:
/// nothing wakes up to remove stale entries, they are expired lazily by the
/// read path.
pub const DEFAULT_TTL: Duration = Duration::from_millis(2500);

/// Called with `(key, value)` exactly once for every entry the cache
/// destroys, whether by replacement, forced eviction, explicit removal,
/// expiry, `clear`, or invalidation.
pub type EvictHook = Box<dyn Fn(&[u8], &[u8]) + Send + Sync>;

/// Construction parameters for the cache engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Fixed slot count. The table never grows; a `capacity` of 0 is
    /// treated as 1.
    pub capacity: usize,

    /// Per-entry lifetime applied uniformly to every insertion.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl: DEFAULT_TTL,
        }
    }
}

impl CacheConfig {
    /// A config with the given capacity and the default lifetime.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }
}

/// Construction parameters for the TCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Number of worker threads servicing connections. 0 is treated as 1.
    pub workers: usize,

    /// Port to listen on. 0 asks the OS for an ephemeral port, which is how
    /// the integration tests run.
    pub port: u16,

    /// Engine configuration.
    pub cache: CacheConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            port: 0,
            cache: CacheConfig::default(),
        }
    }
}

/// Errors surfaced by the cache engine.
///
/// I/O problems never appear here: they are handled at the connection layer
/// and either retried or end the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CacheError {
    /// Empty or oversized key/value, an invalidated table, or a lock that
    /// could not be acquired cleanly.
    #[error("bad key, value, or cache state")]
    BadArgs,

    /// Insertion refused: every slot is live and eviction was not permitted.
    #[error("cache is full")]
    Full,
}
