// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Only template definition version this engine understands
pub const TEMPLATE_VERSION: &str = "1.0";
/// Default entry bound for the in-memory cache backend
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;
/// Default directory for the disk cache backend, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = ".dataflow-cache";
/// Concurrency used by the level strategy when the host parallelism is unknown
pub const FALLBACK_CONCURRENCY: usize = 4;
/// Server used by the nats cache backend when no url is configured
pub const DEFAULT_NATS_URL: &str = "nats://127.0.0.1:4222";
/// KV bucket shared by every engine using the nats cache backend
pub const DEFAULT_CACHE_BUCKET: &str = "dataflow_cache";
/// How long the nats cache backend waits for the server before falling back
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;
