// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types, one enum per concern.
//!
//! * [`RegistryError`] - module, datatype and instrument registration and lookup
//! * [`CycleError`] - the wire graph of a template is not a DAG
//! * [`ValidationError`] - structural problems in a template found before evaluation
//! * [`ConfigError`] - reading engine configs, templates and run configs
//! * [`CacheError`] - cache backend failures (degraded to a miss by the cache manager)
//! * [`EvaluationError`] - everything that can abort an `evaluate` call

mod cache;
mod config;
mod execution;
mod registry;
mod validation;

pub use cache::CacheError;
pub use config::ConfigError;
pub use execution::EvaluationError;
pub use registry::RegistryError;
pub use validation::{CycleError, ValidationError};

use crate::config::NodeId;

/// Render a node path as `0 -> 2 -> 0`.
pub(crate) fn format_node_path(nodes: &[NodeId]) -> String {
    nodes
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
