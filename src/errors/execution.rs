// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{CycleError, RegistryError, ValidationError};
use crate::config::NodeId;
use std::time::Duration;
use thiserror::Error;

/// Errors that abort an evaluation.
///
/// Every per-node variant carries the node index and module id so the
/// failing step can be located in the template. Nodes that completed and
/// were cached before the failure stay cached.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error("template is invalid: {}", join_validation(.0))]
    InvalidTemplate(Vec<ValidationError>),

    /// A parameter or produced value failed its type check.
    #[error("node {node} ({module_id}): invalid value for '{field}': {reason}")]
    Validation {
        node: NodeId,
        module_id: String,
        field: String,
        reason: String,
    },

    /// A parameter or input list cannot be broadcast to the item count.
    #[error("node {node} ({module_id}): '{field}' has {actual} values, need 1 or {expected}")]
    Arity {
        node: NodeId,
        module_id: String,
        field: String,
        expected: usize,
        actual: usize,
    },

    /// The action returned a different number of values than the module declares outputs.
    #[error("node {node} ({module_id}): action returned {actual} outputs, module declares {expected}")]
    OutputCount {
        node: NodeId,
        module_id: String,
        expected: usize,
        actual: usize,
    },

    /// The action callable failed; `source` is its error, unchanged.
    #[error("node {node} ({module_id}): action failed: {source}")]
    Action {
        node: NodeId,
        module_id: String,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// The requested target node or terminal does not exist.
    #[error("target {node}:{terminal} does not exist")]
    MissingTarget { node: NodeId, terminal: String },

    #[error("evaluation cancelled")]
    Cancelled,

    #[error("evaluation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("internal engine error: {message}")]
    Internal { message: String },
}

impl EvaluationError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        EvaluationError::Internal {
            message: message.into(),
        }
    }

    /// Node index the error is attributed to, if any.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            EvaluationError::Validation { node, .. }
            | EvaluationError::Arity { node, .. }
            | EvaluationError::OutputCount { node, .. }
            | EvaluationError::Action { node, .. }
            | EvaluationError::MissingTarget { node, .. } => Some(*node),
            _ => None,
        }
    }
}

fn join_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
