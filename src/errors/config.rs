// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading engine configs, templates and run configs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML in '{}': {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid TOML in '{}': {source}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid JSON in '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The file extension is not one of yaml, yml, toml or json.
    #[error("unsupported file format for '{}' (expected .yaml, .yml, .toml or .json)", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("unsupported template version '{found}' (expected '{expected}')")]
    UnsupportedTemplateVersion { found: String, expected: String },

    /// A `NODE:TERMINAL` reference could not be parsed.
    #[error("invalid terminal reference '{value}' (expected NODE:TERMINAL)")]
    InvalidTerminalRef { value: String },

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}
