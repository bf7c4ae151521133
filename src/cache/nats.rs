// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::cache::check_key;
use crate::errors::CacheError;
use crate::traits::CacheStore;
use async_nats::jetstream::{self, kv};
use async_trait::async_trait;
use std::time::Duration;

/// Settings for a [`NatsCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatsSettings {
    /// Server url, e.g. `nats://127.0.0.1:4222`
    pub url: String,
    /// KV bucket shared by every process using the cache
    pub bucket: String,
    /// Entries older than this are dropped by the server; `None` keeps them forever
    pub ttl: Option<Duration>,
    /// Upper bound on the bucket size in bytes; `None` is unbounded
    pub max_bytes: Option<i64>,
    pub connect_timeout: Duration,
}

/// Cache shared across processes through a NATS JetStream key/value bucket.
///
/// The bucket is reused when it already exists and created otherwise, so any
/// number of engines pointed at the same server and bucket share results.
pub struct NatsCache {
    store: kv::Store,
    bucket: String,
}

impl NatsCache {
    /// Connect to the server and open (or create) the bucket.
    pub async fn connect(settings: &NatsSettings) -> Result<Self, CacheError> {
        let client = async_nats::ConnectOptions::new()
            .connection_timeout(settings.connect_timeout)
            .connect(settings.url.as_str())
            .await
            .map_err(|e| backend("connect", e))?;
        let jetstream = jetstream::new(client);

        let store = match jetstream.get_key_value(settings.bucket.as_str()).await {
            Ok(store) => {
                tracing::debug!(bucket = %settings.bucket, "Using existing cache bucket");
                store
            }
            Err(_) => {
                tracing::debug!(bucket = %settings.bucket, "Creating cache bucket");
                jetstream
                    .create_key_value(bucket_config(settings))
                    .await
                    .map_err(|e| backend("create_bucket", e))?
            }
        };

        Ok(Self {
            store,
            bucket: settings.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn bucket_config(settings: &NatsSettings) -> kv::Config {
    kv::Config {
        bucket: settings.bucket.clone(),
        description: "the-dataflow result cache".to_string(),
        history: 1,
        max_age: settings.ttl.unwrap_or_default(),
        max_bytes: settings.max_bytes.unwrap_or(-1),
        ..Default::default()
    }
}

fn backend(operation: &str, error: impl std::fmt::Display) -> CacheError {
    CacheError::Backend {
        reason: format!("nats {}: {}", operation, error),
    }
}

#[async_trait]
impl CacheStore for NatsCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        check_key(key)?;
        let value = self.store.get(key).await.map_err(|e| backend("get", e))?;
        Ok(value.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        check_key(key)?;
        let value = self.store.get(key).await.map_err(|e| backend("get", e))?;
        Ok(value.map(|bytes| bytes.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        check_key(key)?;
        self.store
            .put(key, value.into())
            .await
            .map_err(|e| backend("put", e))?;
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError> {
        for key in keys {
            check_key(key)?;
            self.store
                .purge(*key)
                .await
                .map_err(|e| backend("purge", e))?;
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "nats"
    }
}
