// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for evaluation lifecycle and per-node events.
//!
//! This module contains message types for logging events related to:
//! * Evaluation lifecycle (start, completion, failure)
//! * Level computation for the level strategy
//! * Per-node decisions: cache hit, calculation, caching, invalidation, input echo

use crate::config::NodeId;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Evaluation started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```text
/// Starting evaluation of 'reduce' with sequential strategy: 5 nodes, target=3:output
/// ```
pub struct EvaluationStarted<'a> {
    pub strategy: &'a str,
    pub template: &'a str,
    pub node_count: usize,
    /// `node:terminal`, or `"all"` for a full evaluation.
    pub target: &'a str,
}

impl Display for EvaluationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting evaluation of '{}' with {} strategy: {} nodes, target={}",
            self.template, self.strategy, self.node_count, self.target
        )
    }
}

impl StructuredLog for EvaluationStarted<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            template = self.template,
            node_count = self.node_count,
            target = self.target,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "evaluation",
            span_name = name,
            strategy = self.strategy,
            template = self.template,
            node_count = self.node_count,
            target = self.target,
        )
    }
}

/// Evaluation completed successfully.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```text
/// Evaluation completed with level strategy: 5 nodes in 12.3ms
/// ```
pub struct EvaluationCompleted<'a> {
    pub strategy: &'a str,
    pub node_count: usize,
    pub duration: std::time::Duration,
}

impl Display for EvaluationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Evaluation completed with {} strategy: {} nodes in {:?}",
            self.strategy, self.node_count, self.duration
        )
    }
}

impl StructuredLog for EvaluationCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            node_count = self.node_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "evaluation_completed",
            span_name = name,
            strategy = self.strategy,
            node_count = self.node_count,
            duration = ?self.duration,
        )
    }
}

/// Evaluation failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct EvaluationFailed<'a> {
    pub strategy: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for EvaluationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Evaluation failed with {} strategy: {}",
            self.strategy, self.error
        )
    }
}

impl StructuredLog for EvaluationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            strategy = self.strategy,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "evaluation_failed",
            span_name = name,
            strategy = self.strategy,
            error = %self.error,
        )
    }
}

/// Topological levels computed for the level strategy.
///
/// # Log Level
/// `debug!` - Scheduling detail
pub struct LevelComputationCompleted {
    pub level_count: usize,
    pub node_count: usize,
}

impl Display for LevelComputationCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Computed {} levels for {} nodes",
            self.level_count, self.node_count
        )
    }
}

impl StructuredLog for LevelComputationCompleted {
    fn log(&self) {
        tracing::debug!(
            level_count = self.level_count,
            node_count = self.node_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "level_computation",
            span_name = name,
            level_count = self.level_count,
            node_count = self.node_count,
        )
    }
}

/// A node is about to run its action.
///
/// `calls` is the number of action invocations: the item count in item mode, 1 in bundle mode.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NodeCalculating<'a> {
    pub node: NodeId,
    pub module_id: &'a str,
    pub calls: usize,
}

impl Display for NodeCalculating<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Calculating node {} ({}): {} action call(s)",
            self.node, self.module_id, self.calls
        )
    }
}

impl StructuredLog for NodeCalculating<'_> {
    fn log(&self) {
        tracing::info!(
            node = self.node,
            module_id = self.module_id,
            calls = self.calls,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "node",
            span_name = name,
            node = self.node,
            module_id = self.module_id,
            calls = self.calls,
        )
    }
}

/// A node's outputs were served from the cache.
///
/// # Log Level
/// `debug!`
pub struct NodeCacheHit<'a> {
    pub node: NodeId,
    pub module_id: &'a str,
    pub fingerprint: &'a str,
}

impl Display for NodeCacheHit<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Retrieved cached value for node {} ({}): {}",
            self.node, self.module_id, self.fingerprint
        )
    }
}

impl StructuredLog for NodeCacheHit<'_> {
    fn log(&self) {
        tracing::debug!(
            node = self.node,
            module_id = self.module_id,
            fingerprint = self.fingerprint,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "node_cache_hit",
            span_name = name,
            node = self.node,
            module_id = self.module_id,
            fingerprint = self.fingerprint,
        )
    }
}

/// A node's outputs were written to the cache.
///
/// # Log Level
/// `debug!`
pub struct NodeCached<'a> {
    pub node: NodeId,
    pub module_id: &'a str,
    pub fingerprint: &'a str,
}

impl Display for NodeCached<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Caching node {} ({}): {}",
            self.node, self.module_id, self.fingerprint
        )
    }
}

impl StructuredLog for NodeCached<'_> {
    fn log(&self) {
        tracing::debug!(
            node = self.node,
            module_id = self.module_id,
            fingerprint = self.fingerprint,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "node_cached",
            span_name = name,
            node = self.node,
            module_id = self.module_id,
            fingerprint = self.fingerprint,
        )
    }
}

/// A cached entry downstream of a non-cacheable node was deleted.
///
/// # Log Level
/// `info!` - The next evaluation of `dependent` will recompute
pub struct CacheEntryInvalidated<'a> {
    pub node: NodeId,
    pub dependent: NodeId,
    pub fingerprint: &'a str,
}

impl Display for CacheEntryInvalidated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Clearing cached value for node {} (downstream of non-cacheable node {}): {}",
            self.dependent, self.node, self.fingerprint
        )
    }
}

impl StructuredLog for CacheEntryInvalidated<'_> {
    fn log(&self) {
        tracing::info!(
            node = self.node,
            dependent = self.dependent,
            fingerprint = self.fingerprint,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "cache_invalidation",
            span_name = name,
            node = self.node,
            dependent = self.dependent,
            fingerprint = self.fingerprint,
        )
    }
}

/// The target named an input terminal; its gathered values were returned without running the node.
///
/// # Log Level
/// `debug!`
pub struct InputEchoed<'a> {
    pub node: NodeId,
    pub terminal: &'a str,
    pub values: usize,
}

impl Display for InputEchoed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Returning {} input value(s) of {}:{} without evaluating the node",
            self.values, self.node, self.terminal
        )
    }
}

impl StructuredLog for InputEchoed<'_> {
    fn log(&self) {
        tracing::debug!(
            node = self.node,
            terminal = self.terminal,
            values = self.values,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "input_echo",
            span_name = name,
            node = self.node,
            terminal = self.terminal,
            values = self.values,
        )
    }
}
