// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message is a small struct borrowing the values it reports. `Display`
//! renders the human-readable text; [`StructuredLog`] emits the same event with
//! its values as tracing fields at the level the message belongs to.
//!
//! # Organization
//!
//! * `engine` - evaluation lifecycle and per-node events
//! * `cache` - cache backend selection, degraded operations, statistics
//! * `validation` - template and instrument consistency warnings
//!
//! # Usage Pattern
//!
//! ```text
//! NodeCacheHit { node: 3, module_id: "text.case", fingerprint: "9f2c..." }.log();
//!
//! let span = EvaluationStarted { strategy: "level", template: "reduce", node_count: 5, target: "3:output" }
//!     .span("evaluate");
//! ```

pub mod cache;
pub mod engine;
pub mod validation;

use tracing::Span;

/// A message that knows how to log itself with structured fields.
pub trait StructuredLog: std::fmt::Display {
    /// Emit the message as a tracing event at its own level.
    fn log(&self);

    /// A span carrying the message's fields, named `name`.
    fn span(&self, name: &str) -> Span;
}
