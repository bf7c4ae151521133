// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test-only actions and the `test` instrument built from them.

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::registry::{DataType, Instrument, Module, ParamKind, Parameter, Registry, Terminal, ValueKind};
use crate::traits::{Action, ActionArgs, ActionOutput};

pub const VALUE: &str = "test.value";
pub const NUMBER: &str = "test.num";

/// Wraps a closure and counts how often it was invoked
pub struct CountingAction<F> {
    calls: Arc<AtomicUsize>,
    inner: F,
}

impl<F> CountingAction<F>
where
    F: Fn(ActionArgs) -> anyhow::Result<ActionOutput> + Send + Sync,
{
    pub fn new(calls: Arc<AtomicUsize>, inner: F) -> Self {
        Self { calls, inner }
    }
}

#[async_trait]
impl<F> Action for CountingAction<F>
where
    F: Fn(ActionArgs) -> anyhow::Result<ActionOutput> + Send + Sync,
{
    async fn invoke(&self, args: ActionArgs) -> anyhow::Result<ActionOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.inner)(args)
    }
}

/// An action that always fails, for error propagation tests
pub struct FailingAction {
    pub message: String,
}

#[async_trait]
impl Action for FailingAction {
    async fn invoke(&self, _args: ActionArgs) -> anyhow::Result<ActionOutput> {
        Err(anyhow!("{}", self.message))
    }
}

/// Sleeps for `millis` before answering, for cancellation and timeout tests
pub struct SlowAction {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Action for SlowAction {
    async fn invoke(&self, args: ActionArgs) -> anyhow::Result<ActionOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let millis = args.get("millis").and_then(Value::as_u64).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(ActionOutput::single(json!(millis)))
    }
}

/// Registry holding the `test` instrument, plus handles to observe it.
pub struct Fixture {
    pub registry: Arc<Registry>,
    counters: BTreeMap<&'static str, Arc<AtomicUsize>>,
    /// What `test.source` returns; stands in for an external resource.
    pub source: Arc<Mutex<Vec<Value>>>,
}

impl Fixture {
    pub fn new() -> Self {
        let source = Arc::new(Mutex::new(vec![json!(1), json!(2)]));
        let mut counters = BTreeMap::new();
        let mut counter = |id: &'static str| {
            let calls = Arc::new(AtomicUsize::new(0));
            counters.insert(id, Arc::clone(&calls));
            calls
        };

        let load = Module::builder("test.load", "1")
            .name("Load")
            .output(Terminal::multiple("output", VALUE))
            .field(Parameter::new("items", ParamKind::Any).with_default(json!([])))
            .action(CountingAction::new(counter("test.load"), |args| {
                let items = args.get("items").cloned().unwrap_or_else(|| json!([]));
                Ok(ActionOutput::single(items))
            }))
            .build();

        let shared = Arc::clone(&source);
        let source_module = Module::builder("test.source", "1")
            .name("Source")
            .output(Terminal::multiple("output", VALUE))
            .cacheable(false)
            .action(CountingAction::new(counter("test.source"), move |_| {
                let values = shared.lock().map_err(|_| anyhow!("source lock poisoned"))?.clone();
                Ok(ActionOutput::single(Value::Array(values)))
            }))
            .build();

        let mask = Module::builder("test.mask", "1")
            .name("Mask")
            .input(Terminal::single("input", VALUE))
            .output(Terminal::single("output", VALUE))
            .field(
                Parameter::new("factor", ParamKind::float())
                    .with_default(json!(1.0))
                    .multiple(),
            )
            .action(CountingAction::new(counter("test.mask"), |args| {
                let input = args.get_f64("input")?;
                let factor = args.get_f64("factor").unwrap_or(1.0);
                Ok(ActionOutput::single(json!(input * factor)))
            }))
            .build();

        let join = Module::builder("test.join", "1")
            .name("Join")
            .input(Terminal::multiple("input", VALUE))
            .output(Terminal::single("output", VALUE))
            .action(CountingAction::new(counter("test.join"), |args| {
                Ok(ActionOutput::single(args.require("input")?.clone()))
            }))
            .build();

        let pair = Module::builder("test.pair", "1")
            .name("Pair")
            .input(Terminal::single("left", VALUE))
            .input(Terminal::single("right", VALUE))
            .output(Terminal::single("output", VALUE))
            .action(CountingAction::new(counter("test.pair"), |args| {
                let left = args.get("left").cloned().unwrap_or(Value::Null);
                let right = args.get("right").cloned().unwrap_or(Value::Null);
                Ok(ActionOutput::single(json!([left, right])))
            }))
            .build();

        let split = Module::builder("test.split", "1")
            .name("Split")
            .input(Terminal::multiple("input", VALUE))
            .output(Terminal::single("first", VALUE))
            .output(Terminal::multiple("rest", VALUE))
            .action(CountingAction::new(counter("test.split"), |args| {
                let items = args.get_array("input")?;
                let first = items.first().cloned().unwrap_or(Value::Null);
                let rest = items.iter().skip(1).cloned().collect();
                Ok(ActionOutput::tuple(vec![first, Value::Array(rest)]))
            }))
            .build();

        let fail = Module::builder("test.fail", "1")
            .name("Fail")
            .input(Terminal::multiple("input", VALUE))
            .output(Terminal::single("output", VALUE))
            .action(FailingAction {
                message: "detector offline".to_string(),
            })
            .build();

        let slow = Module::builder("test.slow", "1")
            .name("Slow")
            .output(Terminal::single("output", VALUE))
            .field(Parameter::new("millis", ParamKind::int()).with_default(json!(0)))
            .action(SlowAction {
                calls: counter("test.slow"),
            })
            .build();

        let bad_type = Module::builder("test.bad_type", "1")
            .name("Bad Type")
            .output(Terminal::single("output", NUMBER))
            .action_fn(|_| Ok(ActionOutput::single(json!("not a number"))))
            .build();

        let modules = [load, source_module, mask, join, pair, split, fail, slow, bad_type]
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .expect("stub modules are valid");
        let instrument = Instrument::new(
            "test",
            "Test Instrument",
            vec![("All".to_string(), modules)],
            vec![
                DataType::new(VALUE, ValueKind::Any),
                DataType::new(NUMBER, ValueKind::Number),
            ],
        )
        .expect("stub instrument is valid");

        let mut registry = Registry::new();
        registry
            .register_instrument(instrument)
            .expect("stub instrument registers");

        Self {
            registry: Arc::new(registry),
            counters,
            source,
        }
    }

    /// How many times the action of module `id` has run.
    pub fn calls(&self, id: &str) -> usize {
        self.counters
            .get(id)
            .map_or(0, |c| c.load(Ordering::SeqCst))
    }

    pub fn set_source(&self, values: Vec<Value>) {
        *self.source.lock().unwrap() = values;
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
