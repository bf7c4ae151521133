// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::CacheError;
use async_trait::async_trait;

/// Key/value byte store backing the result cache.
///
/// Keys are fingerprints and values are serialized bundle maps; the store
/// interprets neither. Writes for one key must be atomic: a reader sees the
/// old value, the new value, or nothing.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// Remove every listed key; absent keys are ignored.
    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}
