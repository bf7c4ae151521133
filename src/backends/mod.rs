// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Action backends: instruments whose modules the engine can evaluate.
//!
//! # Available Backends
//!
//! ## Local Backend
//! In-process Rust actions for text manipulation and analysis, registered as
//! the `text` instrument:
//! - **Input**: file loading (not cacheable)
//! - **Transform**: case conversion, prefix/suffix, joining
//! - **Analyze**: character, word and line counts
//!
//! ## Stub Backend (Test-Only)
//! Instrumented actions for engine tests (only available in test builds):
//! - **CountingAction**: records how often it ran
//! - **FailingAction**: always returns an error
//! - **SlowAction**: sleeps, for cancellation and timeout tests
//!
//! # Examples
//!
//! ```rust
//! use the_dataflow::backends::local::register_builtin;
//! use the_dataflow::registry::Registry;
//!
//! let mut registry = Registry::new();
//! register_builtin(&mut registry)?;
//! assert!(registry.lookup_module("text.case").is_ok());
//! # Ok::<(), the_dataflow::errors::RegistryError>(())
//! ```

pub mod local;
#[cfg(test)]
pub mod stub;
