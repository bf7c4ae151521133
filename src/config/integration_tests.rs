// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::backends::local::register_builtin;
use crate::config::{
    load_config, load_templates, validate_template, CacheBackend, RunConfig, Strategy, Template,
    TerminalRef,
};
use crate::errors::ConfigError;
use crate::registry::Registry;
use serde_json::json;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

/// The shipped YAML engine config parses with the expected values
#[test]
fn test_memory_engine_config_loading() {
    let config = load_config("configs/engine-memory.yaml").unwrap();

    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert_eq!(config.cache.get_capacity(), 1000);
    assert_eq!(config.engine.strategy, Strategy::Sequential);
}

/// The shipped TOML engine config parses with the expected values
#[test]
fn test_level_engine_config_loading() {
    let config = load_config("configs/engine-level.toml").unwrap();

    assert_eq!(config.cache.backend, CacheBackend::Disk);
    assert_eq!(config.cache.get_dir().to_str(), Some(".dataflow-cache"));
    assert_eq!(config.engine.strategy, Strategy::Level);
    assert_eq!(config.engine.get_max_concurrency(), 4);
    assert_eq!(config.engine.get_timeout(), Some(Duration::from_secs(30)));
}

/// The shipped shared-cache config selects the nats backend
#[test]
fn test_nats_engine_config_loading() {
    let config = load_config("configs/engine-nats.yaml").unwrap();

    assert_eq!(config.cache.backend, CacheBackend::Nats);
    let settings = config.cache.nats_settings();
    assert_eq!(settings.url, "nats://127.0.0.1:4222");
    assert_eq!(settings.bucket, "dataflow_cache");
    assert_eq!(settings.ttl, Some(Duration::from_secs(86400)));
    assert_eq!(settings.max_bytes, Some(4 * 1024 * 1024 * 1024));
    assert_eq!(config.engine.strategy, Strategy::Level);
}

/// The shipped template validates against the built-in text instrument
#[test]
fn test_text_pipeline_template_validates() {
    let template = Template::load("configs/text-pipeline.json").unwrap();
    let mut registry = Registry::new();
    register_builtin(&mut registry).unwrap();

    assert_eq!(template.modules.len(), 5);
    assert_eq!(template.instrument, "text");
    assert!(validate_template(&template, &registry).is_ok());
    assert_eq!(template.order(Some(3)).unwrap(), vec![0, 1, 3]);
}

#[test]
fn test_run_config_loading() {
    let config = RunConfig::load("configs/text-pipeline.run.yaml").unwrap();

    assert_eq!(config.for_node(1).and_then(|m| m.get("mode")), Some(&json!("title")));
    assert_eq!(config.for_node(4).and_then(|m| m.get("separator")), Some(&json!(" + ")));
}

#[test]
fn test_missing_and_malformed_files() {
    let dir = TempDir::new().unwrap();

    let missing = load_config(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));

    let bad_yaml = dir.path().join("bad.yaml");
    fs::write(&bad_yaml, "cache: [unclosed").unwrap();
    assert!(matches!(load_config(&bad_yaml).unwrap_err(), ConfigError::Yaml { .. }));

    let bad_toml = dir.path().join("bad.toml");
    fs::write(&bad_toml, "cache = ").unwrap();
    assert!(matches!(load_config(&bad_toml).unwrap_err(), ConfigError::Toml { .. }));

    let ini = dir.path().join("engine.ini");
    fs::write(&ini, "").unwrap();
    assert!(matches!(load_config(&ini).unwrap_err(), ConfigError::UnsupportedFormat { .. }));
}

#[test]
fn test_template_version_mismatch_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("old.json");
    fs::write(&path, r#"{"name": "old", "version": "0.9", "modules": []}"#).unwrap();

    let err = Template::load(&path).unwrap_err();
    assert!(err.to_string().contains("0.9"));
}

/// Only `<instrument>.<name>.json` files are picked up
#[test]
fn test_load_templates_by_instrument() {
    let dir = TempDir::new().unwrap();
    let write = |name: &str, template: &Template| {
        fs::write(dir.path().join(name), template.to_json().unwrap()).unwrap();
    };
    write("text.basic.json", &Template::new("basic", "text"));
    write("text.full.json", &Template::new("full", "text"));
    write("other.basic.json", &Template::new("basic", "other"));
    fs::write(dir.path().join("text.notes.txt"), "ignored").unwrap();

    let templates = load_templates(dir.path(), "text").unwrap();

    assert_eq!(templates.keys().collect::<Vec<_>>(), vec!["basic", "full"]);
    assert_eq!(templates["full"].name, "full");
}

#[test]
fn test_target_parsing_for_cli() {
    let target: TerminalRef = "4:output".parse().unwrap();
    assert_eq!(target, TerminalRef::new(4, "output"));
}
