// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod dependency_graph;
mod loader;
mod template;
mod validation;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use dependency_graph::DependencyGraph;
pub use loader::{load_config, CacheBackend, CacheConfig, EngineConfig, ExecutorOptions, Strategy};
pub use template::{load_templates, NodeId, RunConfig, Template, TemplateNode, TerminalRef, Wire};
pub use validation::{check_run_config, validate_template};

pub(crate) use loader::default_concurrency;
