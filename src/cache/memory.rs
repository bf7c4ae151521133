// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::CacheError;
use crate::traits::CacheStore;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// In-process cache bounded to `capacity` entries.
///
/// Reads and writes mark an entry as most recently used; once the bound is
/// exceeded the least recently used entry is evicted.
pub struct MemoryCache {
    state: Mutex<LruState>,
}

struct LruState {
    capacity: usize,
    entries: HashMap<String, Vec<u8>>,
    recency: VecDeque<String>,
}

impl LruState {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    fn forget(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.recency.retain(|k| k != key);
        }
    }
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LruState {
                capacity: capacity.max(1),
                entries: HashMap::new(),
                recency: VecDeque::new(),
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.state.lock().await.entries.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut state = self.state.lock().await;
        let value = state.entries.get(key).cloned();
        if value.is_some() {
            state.touch(key);
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;
        if state.entries.insert(key.to_string(), value).is_some() {
            state.touch(key);
        } else {
            state.recency.push_back(key.to_string());
        }
        while state.entries.len() > state.capacity {
            match state.recency.pop_front() {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                }
                None => break,
            }
        }
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;
        for key in keys {
            state.forget(key);
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new(10);
        cache.set("a", b"1".to_vec()).await.unwrap();

        assert!(cache.exists("a").await.unwrap());
        assert_eq!(cache.get("a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(cache.get("b").await.unwrap(), None);

        cache.delete(&["a", "b"]).await.unwrap();
        assert!(!cache.exists("a").await.unwrap());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_least_recently_used_is_evicted() {
        let cache = MemoryCache::new(2);
        cache.set("a", vec![1]).await.unwrap();
        cache.set("b", vec![2]).await.unwrap();

        // reading "a" makes "b" the eviction candidate
        cache.get("a").await.unwrap();
        cache.set("c", vec![3]).await.unwrap();

        assert!(cache.exists("a").await.unwrap());
        assert!(!cache.exists("b").await.unwrap());
        assert!(cache.exists("c").await.unwrap());
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_overwrite_does_not_grow() {
        let cache = MemoryCache::new(2);
        cache.set("a", vec![1]).await.unwrap();
        cache.set("a", vec![2]).await.unwrap();
        cache.set("b", vec![3]).await.unwrap();

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("a").await.unwrap(), Some(vec![2]));
    }
}
