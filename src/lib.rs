// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // built-in instruments
pub mod cache;      // result cache and backends
pub mod config;     // engine config, templates, validation
pub mod engine;     // evaluation engine
pub mod errors;     // error handling
pub mod observability;
pub mod registry;   // modules, datatypes, instruments
pub mod traits;     // unified abstractions
