// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Cache backend failures.
///
/// These never abort an evaluation: the cache manager logs them and
/// answers as if the entry were absent.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },

    #[error("cache entry '{key}' could not be (de)serialized: {source}")]
    Serialization {
        key: String,
        source: serde_json::Error,
    },

    #[error("invalid cache key '{key}'")]
    InvalidKey { key: String },

    #[error("cache backend unavailable: {reason}")]
    Backend { reason: String },
}
