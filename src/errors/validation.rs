// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::format_node_path;
use crate::config::NodeId;
use thiserror::Error;

/// The wire graph contains a cycle.
///
/// `cycle` is the offending path, starting and ending at the same node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("wire graph contains a cycle: {}", format_node_path(.cycle))]
pub struct CycleError {
    pub cycle: Vec<NodeId>,
}

/// Structural problems found in a template before any node runs.
///
/// Template validation accumulates every error it can find, so callers
/// usually receive a `Vec<ValidationError>`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The node refers to a module id that is not registered.
    #[error("node {node} uses unknown module '{module_id}'")]
    UnknownModule { node: NodeId, module_id: String },

    /// A terminal of the node's module declares a datatype that is not registered.
    #[error("node {node} ({module_id}): terminal '{terminal}' has unknown datatype '{datatype}'")]
    UnknownDatatype {
        node: NodeId,
        module_id: String,
        terminal: String,
        datatype: String,
    },

    /// A wire endpoint names a node index outside the template.
    #[error("wire {wire} refers to missing node {node}")]
    MissingNode { wire: usize, node: NodeId },

    /// A wire endpoint names a terminal the module does not declare.
    #[error("wire {wire} refers to unknown terminal '{terminal}' on node {node}")]
    UnknownTerminal {
        wire: usize,
        node: NodeId,
        terminal: String,
    },

    /// A wire starts at an input terminal or ends at an output terminal.
    #[error("wire {wire}: terminal '{terminal}' on node {node} is not an {expected} terminal")]
    WrongDirection {
        wire: usize,
        node: NodeId,
        terminal: String,
        expected: &'static str,
    },

    /// The two ends of a wire carry different datatypes.
    #[error("wire {wire} connects datatype '{from_type}' to '{to_type}'")]
    DatatypeMismatch {
        wire: usize,
        from_type: String,
        to_type: String,
    },

    /// The wires form a cycle.
    #[error("cyclic wiring: {}", format_node_path(.cycle))]
    CyclicWiring { cycle: Vec<NodeId> },
}

impl From<CycleError> for ValidationError {
    fn from(err: CycleError) -> Self {
        ValidationError::CyclicWiring { cycle: err.cycle }
    }
}
