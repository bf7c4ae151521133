// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Result cache: fingerprint to serialized `{output terminal: Bundle}` map.
//!
//! [`CacheManager`] sits between the engine and a [`CacheStore`] backend. It
//! owns the serialization format (JSON) and the failure policy: a backend
//! error is logged and answered as a cache miss, because results never depend
//! on the cache being available.

pub mod disk;
pub mod memory;
pub mod nats;

pub use disk::DiskCache;
pub use memory::MemoryCache;
pub use nats::{NatsCache, NatsSettings};

use crate::config::{CacheBackend, CacheConfig};
use crate::errors::CacheError;
use crate::observability::messages::cache::{CacheBackendFallback, CacheOperationFailed};
use crate::observability::messages::StructuredLog;
use crate::registry::Bundle;
use crate::traits::CacheStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// What one cache entry holds: every output terminal of a node.
pub type CacheEntry = BTreeMap<String, Bundle>;

/// Snapshot of cache activity since the manager was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub invalidations: u64,
    pub errors: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    invalidations: AtomicU64,
    errors: AtomicU64,
}

/// Shared handle to the cache; cloning is cheap.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    counters: Arc<Counters>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn memory(capacity: usize) -> Self {
        Self::new(Arc::new(MemoryCache::new(capacity)))
    }

    /// Open the configured backend, falling back to memory if it cannot be opened.
    pub async fn from_config(config: &CacheConfig) -> Self {
        match config.backend {
            CacheBackend::Memory => Self::memory(config.get_capacity()),
            CacheBackend::Disk => {
                let dir = config.get_dir();
                match DiskCache::open(&dir).await {
                    Ok(disk) => Self::new(Arc::new(disk)),
                    Err(error) => {
                        CacheBackendFallback {
                            requested: "disk",
                            error: &error,
                        }
                        .log();
                        Self::memory(config.get_capacity())
                    }
                }
            }
            CacheBackend::Nats => match NatsCache::connect(&config.nats_settings()).await {
                Ok(nats) => Self::new(Arc::new(nats)),
                Err(error) => {
                    CacheBackendFallback {
                        requested: "nats",
                        error: &error,
                    }
                    .log();
                    Self::memory(config.get_capacity())
                }
            },
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn exists(&self, key: &str) -> bool {
        match self.store.exists(key).await {
            Ok(found) => found,
            Err(error) => {
                self.degrade("exists", key, &error);
                false
            }
        }
    }

    /// The entry stored under `key`, or `None` on a miss, a backend error or
    /// an entry that no longer deserializes.
    pub async fn retrieve(&self, key: &str) -> Option<CacheEntry> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(error) => {
                self.degrade("get", key, &error);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };
        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Err(source) => {
                let error = CacheError::Serialization {
                    key: key.to_string(),
                    source,
                };
                self.degrade("decode", key, &error);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn store(&self, key: &str, entry: &CacheEntry) {
        let bytes = match serde_json::to_vec(entry) {
            Ok(bytes) => bytes,
            Err(source) => {
                let error = CacheError::Serialization {
                    key: key.to_string(),
                    source,
                };
                self.degrade("encode", key, &error);
                return;
            }
        };
        match self.store.set(key, bytes).await {
            Ok(()) => {
                self.counters.stores.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => self.degrade("set", key, &error),
        }
    }

    pub async fn delete(&self, key: &str) {
        match self.store.delete(&[key]).await {
            Ok(()) => {
                self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => self.degrade("delete", key, &error),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stores: self.counters.stores.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    fn degrade(&self, operation: &str, key: &str, error: &CacheError) {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        CacheOperationFailed {
            operation,
            key,
            error,
        }
        .log();
    }
}

/// Keys are fingerprints: non-empty, ASCII letters, digits, `-` and `_` only.
pub(crate) fn check_key(key: &str) -> Result<(), CacheError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey {
            key: key.to_string(),
        })
    }
}
