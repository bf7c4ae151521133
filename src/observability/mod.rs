// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability: structured log messages.
//!
//! All diagnostic text is defined once in `messages` as structs implementing
//! `Display` and [`messages::StructuredLog`], instead of format strings scattered
//! through the engine. The library only emits `tracing` events; installing a
//! subscriber is left to the binary.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - evaluation lifecycle and per-node events
//! * `messages::cache` - cache backend events and statistics
//! * `messages::validation` - template and instrument warnings

pub mod messages;
