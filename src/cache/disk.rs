// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::cache::check_key;
use crate::errors::CacheError;
use crate::traits::CacheStore;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

/// One file per key under a cache directory.
///
/// Writes go to a temporary file in the same directory and are renamed into
/// place, so readers in this or another process never observe a torn entry.
/// Keys are restricted to ASCII letters, digits, `-` and `_`.
pub struct DiskCache {
    dir: PathBuf,
    counter: AtomicU64,
}

impl DiskCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self, CacheError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await.map_err(|source| CacheError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            dir,
            counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CacheError> {
        check_key(key)?;
        Ok(self.dir.join(key))
    }
}

fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        key: key.to_string(),
        source,
    }
}

#[async_trait]
impl CacheStore for DiskCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.path_for(key)?;
        fs::try_exists(&path).await.map_err(io_error(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key)(e)),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!(".{}.{}.{}.tmp", key, std::process::id(), seq));

        if let Err(e) = fs::write(&tmp, &value).await {
            return Err(io_error(key)(e));
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_error(key)(e));
        }
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError> {
        for key in keys {
            let path = self.path_for(key)?;
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(key)(e)),
            }
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "disk"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path().join("nested")).await.unwrap();

        cache.set("abc123", b"payload".to_vec()).await.unwrap();
        assert!(cache.exists("abc123").await.unwrap());
        assert_eq!(cache.get("abc123").await.unwrap(), Some(b"payload".to_vec()));
        assert!(dir.path().join("nested").join("abc123").is_file());

        cache.set("abc123", b"second".to_vec()).await.unwrap();
        assert_eq!(cache.get("abc123").await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_missing_and_delete() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path()).await.unwrap();

        assert!(!cache.exists("nothing").await.unwrap());
        assert_eq!(cache.get("nothing").await.unwrap(), None);

        cache.set("k1", vec![1]).await.unwrap();
        cache.delete(&["k1", "nothing"]).await.unwrap();
        assert!(!cache.exists("k1").await.unwrap());
    }

    #[tokio::test]
    async fn test_no_temporary_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path()).await.unwrap();
        for i in 0..5 {
            cache.set(&format!("key{}", i), vec![i]).await.unwrap();
        }

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 5);
        assert!(names.iter().all(|n| !n.ends_with(".tmp")));
    }

    #[tokio::test]
    async fn test_keys_cannot_escape_directory() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path()).await.unwrap();

        for key in ["../evil", "a/b", "", ".hidden"] {
            assert!(
                matches!(cache.set(key, vec![]).await, Err(CacheError::InvalidKey { .. })),
                "key {:?} should be rejected",
                key
            );
        }
    }
}
