// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for cache backend events.

use crate::cache::CacheStats;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// The configured backend could not be opened; the memory backend is used instead.
///
/// # Log Level
/// `warn!`
pub struct CacheBackendFallback<'a> {
    pub requested: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for CacheBackendFallback<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Could not open {} cache ({}); falling back to memory cache",
            self.requested, self.error
        )
    }
}

impl StructuredLog for CacheBackendFallback<'_> {
    fn log(&self) {
        tracing::warn!(
            requested = self.requested,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "cache_fallback",
            span_name = name,
            requested = self.requested,
            error = %self.error,
        )
    }
}

/// A backend operation failed and was treated as a miss.
///
/// # Log Level
/// `warn!`
pub struct CacheOperationFailed<'a> {
    pub operation: &'a str,
    pub key: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for CacheOperationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cache {} failed for '{}', treating as a miss: {}",
            self.operation, self.key, self.error
        )
    }
}

impl StructuredLog for CacheOperationFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            operation = self.operation,
            key = self.key,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "cache_operation_failed",
            span_name = name,
            operation = self.operation,
            key = self.key,
            error = %self.error,
        )
    }
}

/// Cache activity summary, logged when the engine shuts down.
///
/// # Log Level
/// `info!`
pub struct CacheStatsReport<'a> {
    pub backend: &'a str,
    pub stats: &'a CacheStats,
}

impl Display for CacheStatsReport<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} cache: {} hits, {} misses, {} stores, {} invalidations, {} errors",
            self.backend,
            self.stats.hits,
            self.stats.misses,
            self.stats.stores,
            self.stats.invalidations,
            self.stats.errors
        )
    }
}

impl StructuredLog for CacheStatsReport<'_> {
    fn log(&self) {
        tracing::info!(
            backend = self.backend,
            hits = self.stats.hits,
            misses = self.stats.misses,
            stores = self.stats.stores,
            invalidations = self.stats.invalidations,
            errors = self.stats.errors,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "cache_stats",
            span_name = name,
            backend = self.backend,
            hits = self.stats.hits,
            misses = self.stats.misses,
        )
    }
}
