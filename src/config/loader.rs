// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::cache::NatsSettings;
use crate::config::consts::{
    DEFAULT_CACHE_BUCKET, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_DIR, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_NATS_URL, FALLBACK_CONCURRENCY,
};
use crate::errors::ConfigError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level engine configuration.
///
/// Both sections are optional; an empty file yields an in-memory cache and
/// the sequential strategy.
///
/// # Example
/// ```yaml
/// cache:
///   backend: disk
///   dir: /var/cache/dataflow
///   capacity: 1000
/// engine:
///   strategy: level
///   max_concurrency: 4
///   timeout_seconds: 30
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub engine: ExecutorOptions,
}

/// Which cache backend to open.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Memory,
    Disk,
    /// NATS JetStream key/value bucket shared between processes
    Nats,
}

/// Cache section of the engine configuration.
///
/// # Fields
/// * `backend` - `memory` (default), `disk` or `nats`
/// * `dir` - directory for the disk backend (defaults to `.dataflow-cache`)
/// * `capacity` - entry bound for the memory backend (defaults to 1000, LRU eviction)
/// * `url`, `bucket` - server and KV bucket for the nats backend
/// * `ttl_seconds`, `max_bytes` - expiry and size bound of a newly created bucket
/// * `connect_timeout_ms` - how long to wait for the server before falling back to memory
#[derive(Debug, Default, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    pub dir: Option<PathBuf>,
    pub capacity: Option<usize>,
    pub url: Option<String>,
    pub bucket: Option<String>,
    pub ttl_seconds: Option<u64>,
    pub max_bytes: Option<i64>,
    pub connect_timeout_ms: Option<u64>,
}

impl CacheConfig {
    pub fn get_capacity(&self) -> usize {
        self.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY).max(1)
    }

    pub fn get_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
    }

    pub fn nats_settings(&self) -> NatsSettings {
        NatsSettings {
            url: self
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_NATS_URL.to_string()),
            bucket: self
                .bucket
                .clone()
                .unwrap_or_else(|| DEFAULT_CACHE_BUCKET.to_string()),
            ttl: self.ttl_seconds.map(Duration::from_secs),
            max_bytes: self.max_bytes,
            connect_timeout: Duration::from_millis(
                self.connect_timeout_ms.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
            ),
        }
    }
}

/// Evaluation strategy.
///
/// * `Sequential` - one node at a time in topological order
/// * `Level` - nodes grouped into topological levels, each level evaluated concurrently
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Sequential,
    Level,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::Level => "level",
        }
    }
}

/// Engine section of the configuration.
#[derive(Debug, Default, Deserialize)]
pub struct ExecutorOptions {
    #[serde(default)]
    pub strategy: Strategy,
    pub max_concurrency: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

impl ExecutorOptions {
    /// Configured concurrency, else the host's available parallelism.
    pub fn get_max_concurrency(&self) -> usize {
        self.max_concurrency
            .unwrap_or_else(default_concurrency)
            .max(1)
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

pub(crate) fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_CONCURRENCY)
}

/// Load an engine configuration; the parser is chosen by file extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    read_structured(path.as_ref())
}

/// Read and deserialize a YAML, TOML or JSON file.
pub(crate) fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = FileFormat::from_path(path)?;
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    format.parse(path, &contents)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileFormat {
    Yaml,
    Toml,
    Json,
}

impl FileFormat {
    pub(crate) fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
            Some("toml") => Ok(FileFormat::Toml),
            Some("json") => Ok(FileFormat::Json),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub(crate) fn parse<T: DeserializeOwned>(
        self,
        path: &Path,
        contents: &str,
    ) -> Result<T, ConfigError> {
        let path = path.to_path_buf();
        match self {
            FileFormat::Yaml => {
                serde_yaml::from_str(contents).map_err(|source| ConfigError::Yaml { path, source })
            }
            FileFormat::Toml => {
                toml::from_str(contents).map_err(|source| ConfigError::Toml { path, source })
            }
            FileFormat::Json => {
                serde_json::from_str(contents).map_err(|source| ConfigError::Json { path, source })
            }
        }
    }
}
