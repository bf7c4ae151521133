// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for template and instrument validation.
//!
//! Most of these are warnings: the condition is tolerated but probably not
//! what the template author intended.

use crate::config::NodeId;
use crate::errors::format_node_path;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// `error!`
pub struct CycleDetected<'a> {
    pub template: &'a str,
    pub cycle: &'a [NodeId],
}

impl Display for CycleDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Template '{}' has cyclic wiring: {}",
            self.template,
            format_node_path(self.cycle)
        )
    }
}

impl StructuredLog for CycleDetected<'_> {
    fn log(&self) {
        tracing::error!(
            template = self.template,
            cycle = %format_node_path(self.cycle),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "cycle_detected",
            span_name = name,
            template = self.template,
            cycle = %format_node_path(self.cycle),
        )
    }
}

/// More than one wire feeds a `single` input terminal; values are concatenated in wire order.
///
/// `warn!`
pub struct MultipleWiresIntoSingleTerminal<'a> {
    pub node: NodeId,
    pub terminal: &'a str,
    pub wire_count: usize,
}

impl Display for MultipleWiresIntoSingleTerminal<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} wires feed single input {}:{}; their values will be concatenated",
            self.wire_count, self.node, self.terminal
        )
    }
}

impl StructuredLog for MultipleWiresIntoSingleTerminal<'_> {
    fn log(&self) {
        tracing::warn!(
            node = self.node,
            terminal = self.terminal,
            wire_count = self.wire_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "multiple_wires",
            span_name = name,
            node = self.node,
            terminal = self.terminal,
            wire_count = self.wire_count,
        )
    }
}

/// `warn!`
pub struct UnusedDatatypes<'a> {
    pub instrument_id: &'a str,
    pub datatypes: &'a [&'a str],
}

impl Display for UnusedDatatypes<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Instrument '{}' declares unused datatypes: {}",
            self.instrument_id,
            self.datatypes.join(", ")
        )
    }
}

impl StructuredLog for UnusedDatatypes<'_> {
    fn log(&self) {
        tracing::warn!(
            instrument_id = self.instrument_id,
            datatypes = %self.datatypes.join(", "),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "unused_datatypes",
            span_name = name,
            instrument_id = self.instrument_id,
        )
    }
}

/// Node definition fields the engine does not interpret.
///
/// `warn!`
pub struct IgnoredTemplateFields<'a> {
    pub node: NodeId,
    pub fields: &'a [&'a str],
}

impl Display for IgnoredTemplateFields<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Node {} has fields the engine ignores: {}",
            self.node,
            self.fields.join(", ")
        )
    }
}

impl StructuredLog for IgnoredTemplateFields<'_> {
    fn log(&self) {
        tracing::warn!(
            node = self.node,
            fields = %self.fields.join(", "),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("ignored_fields", span_name = name, node = self.node)
    }
}

/// Parameter values for keys the module does not declare; they are ignored.
///
/// `origin` is `"template"` or `"run config"`.
///
/// `warn!`
pub struct UndeclaredParameters<'a> {
    pub node: NodeId,
    pub module_id: &'a str,
    pub origin: &'a str,
    pub fields: &'a [&'a str],
}

impl Display for UndeclaredParameters<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Ignoring {} values for undeclared parameters of node {} ({}): {}",
            self.origin,
            self.node,
            self.module_id,
            self.fields.join(", ")
        )
    }
}

impl StructuredLog for UndeclaredParameters<'_> {
    fn log(&self) {
        tracing::warn!(
            node = self.node,
            module_id = self.module_id,
            origin = self.origin,
            fields = %self.fields.join(", "),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "undeclared_parameters",
            span_name = name,
            node = self.node,
            module_id = self.module_id,
        )
    }
}

/// A run config key that is not a node index of the template.
///
/// `warn!`
pub struct UnknownRunConfigNode<'a> {
    pub key: &'a str,
}

impl Display for UnknownRunConfigNode<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Run config entry '{}' does not match any node", self.key)
    }
}

impl StructuredLog for UnknownRunConfigNode<'_> {
    fn log(&self) {
        tracing::warn!(key = self.key, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("unknown_run_config_node", span_name = name, key = self.key)
    }
}

/// `error!`
pub struct TemplateValidationFailed<'a> {
    pub template: &'a str,
    pub error_count: usize,
}

impl Display for TemplateValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Template '{}' failed validation with {} error(s)",
            self.template, self.error_count
        )
    }
}

impl StructuredLog for TemplateValidationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            template = self.template,
            error_count = self.error_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "template_validation",
            span_name = name,
            template = self.template,
            error_count = self.error_count,
        )
    }
}
