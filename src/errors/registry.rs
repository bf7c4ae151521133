// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors raised while registering or looking up modules, datatypes and instruments.
///
/// `kind` is one of `"module"`, `"datatype"` or `"instrument"`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// Nothing is registered under the requested id.
    #[error("{kind} '{id}' is not registered")]
    NotFound { kind: &'static str, id: String },

    /// The id is already registered with a materially different definition.
    #[error("{kind} '{id}' is already registered with a different definition")]
    Conflict { kind: &'static str, id: String },

    /// A module descriptor violates its own invariants.
    #[error("invalid module '{module_id}': {reason}")]
    InvalidModule { module_id: String, reason: String },

    /// An instrument is internally inconsistent.
    #[error("invalid instrument '{instrument_id}': {reason}")]
    InvalidInstrument {
        instrument_id: String,
        reason: String,
    },

    /// The datatype does not list the requested export format.
    #[error("datatype '{datatype}' does not support export format '{format}'")]
    UnsupportedExport { datatype: String, format: String },

    /// Rendering a bundle failed.
    #[error("failed to export '{datatype}': {reason}")]
    Export { datatype: String, reason: String },
}

impl RegistryError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        RegistryError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn conflict(kind: &'static str, id: impl Into<String>) -> Self {
        RegistryError::Conflict {
            kind,
            id: id.into(),
        }
    }
}
