// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-node evaluation shared by every strategy.
//!
//! Each node moves through the same steps:
//!
//! 1. **Gather** the bundles delivered to each input terminal, concatenated in wire order
//! 2. **Echo** the gathered values when the target names one of this node's inputs
//! 3. **Invalidate** cached dependents when the module is not cacheable
//! 4. **Lookup** the node's fingerprint in the cache
//! 5. **Invoke** the action under the arity/broadcast protocol
//! 6. **Store** the outputs when the module is cacheable
//! 7. **Record** the outputs for downstream nodes
//!
//! The context is shared behind an `Arc`; the results map is the only state
//! mutated during evaluation and sits behind one lock.

use crate::cache::{CacheEntry, CacheManager};
use crate::config::{DependencyGraph, NodeId, Template, TerminalRef};
use crate::engine::arity::{assemble_outputs, plan_invocations};
use crate::engine::fingerprint::Fingerprint;
use crate::errors::EvaluationError;
use crate::observability::messages::engine::{
    CacheEntryInvalidated, InputEchoed, NodeCacheHit, NodeCached, NodeCalculating,
};
use crate::observability::messages::StructuredLog;
use crate::registry::{Bundle, Module, Registry};
use crate::traits::ActionOutput;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Outputs of finished nodes, keyed by `(node, output terminal)`.
pub(crate) type ResultMap = BTreeMap<TerminalRef, Arc<Bundle>>;

/// What evaluating one node produced.
pub(crate) enum NodeOutcome {
    /// Outputs were recorded in the results map.
    Done,
    /// The target is an input terminal of this node; evaluation stops here.
    Echo(Arc<Bundle>),
}

/// Everything one evaluation needs, resolved up front.
pub(crate) struct EvalContext {
    pub registry: Arc<Registry>,
    pub cache: CacheManager,
    pub template: Arc<Template>,
    pub graph: DependencyGraph,
    /// Nodes to visit, in dependency order.
    pub order: Vec<NodeId>,
    /// Indexed by node.
    pub modules: Vec<Arc<Module>>,
    /// Effective parameter values, indexed by node.
    pub configs: Vec<Map<String, Value>>,
    /// Indexed by node; computed for the whole template.
    pub fingerprints: Vec<Fingerprint>,
    pub target: Option<TerminalRef>,
    pub results: Mutex<ResultMap>,
    pub token: CancellationToken,
}

impl EvalContext {
    pub async fn evaluate_node(&self, node: NodeId) -> Result<NodeOutcome, EvaluationError> {
        if self.token.is_cancelled() {
            return Err(EvaluationError::Cancelled);
        }
        let module = &self.modules[node];
        let inputs = self.gather_inputs(node).await?;

        if let Some(bundle) = self.echo(node, module, &inputs) {
            return Ok(NodeOutcome::Echo(bundle));
        }

        if !module.cacheable {
            self.cancellable(self.invalidate_dependents(node)).await?;
        }

        let fingerprint = &self.fingerprints[node];
        if let Some(entry) = self.cancellable(self.lookup(module, fingerprint)).await? {
            NodeCacheHit {
                node,
                module_id: &module.id,
                fingerprint: fingerprint.as_str(),
            }
            .log();
            self.record(node, entry).await;
            return Ok(NodeOutcome::Done);
        }

        let entry = self.calculate(node, module, &inputs).await?;

        if module.cacheable {
            NodeCached {
                node,
                module_id: &module.id,
                fingerprint: fingerprint.as_str(),
            }
            .log();
            self.cancellable(self.cache.store(fingerprint.as_str(), &entry)).await?;
        }
        self.record(node, entry).await;
        Ok(NodeOutcome::Done)
    }

    /// Await cache I/O unless the evaluation is cancelled first.
    async fn cancellable<T>(&self, io: impl Future<Output = T>) -> Result<T, EvaluationError> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(EvaluationError::Cancelled),
            value = io => Ok(value),
        }
    }

    async fn gather_inputs(&self, node: NodeId) -> Result<BTreeMap<String, Vec<Value>>, EvaluationError> {
        let results = self.results.lock().await;
        let mut inputs: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for wire in self.template.input_wires(node) {
            let source = TerminalRef::new(wire.source_node(), wire.source_terminal());
            let bundle = results.get(&source).ok_or_else(|| {
                EvaluationError::internal(format!("node {} needs {} before it was evaluated", node, source))
            })?;
            inputs
                .entry(wire.target_terminal().to_string())
                .or_default()
                .extend(bundle.values.iter().cloned());
        }
        Ok(inputs)
    }

    fn echo(
        &self,
        node: NodeId,
        module: &Module,
        inputs: &BTreeMap<String, Vec<Value>>,
    ) -> Option<Arc<Bundle>> {
        let target = self.target.as_ref().filter(|t| t.node == node)?;
        let terminal = module.input(&target.terminal)?;
        let values = inputs.get(&terminal.id).cloned().unwrap_or_default();
        InputEchoed {
            node,
            terminal: &terminal.id,
            values: values.len(),
        }
        .log();
        Some(Arc::new(Bundle::new(terminal.datatype.clone(), values)))
    }

    async fn invalidate_dependents(&self, node: NodeId) {
        for dependent in self.graph.dependents(node) {
            let Some(fingerprint) = self.fingerprints.get(dependent) else {
                continue;
            };
            if self.cache.exists(fingerprint.as_str()).await {
                CacheEntryInvalidated {
                    node,
                    dependent,
                    fingerprint: fingerprint.as_str(),
                }
                .log();
                self.cache.delete(fingerprint.as_str()).await;
            }
        }
    }

    /// A cached entry, if it covers every output terminal of `module`.
    async fn lookup(&self, module: &Module, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let entry = self.cache.retrieve(fingerprint.as_str()).await?;
        module
            .outputs
            .iter()
            .all(|t| entry.contains_key(&t.id))
            .then_some(entry)
    }

    async fn calculate(
        &self,
        node: NodeId,
        module: &Module,
        inputs: &BTreeMap<String, Vec<Value>>,
    ) -> Result<CacheEntry, EvaluationError> {
        let calls = plan_invocations(node, module, &self.configs[node], inputs)?;
        NodeCalculating {
            node,
            module_id: &module.id,
            calls: calls.len(),
        }
        .log();

        let mut results: Vec<ActionOutput> = Vec::with_capacity(calls.len());
        for args in calls {
            let output = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(EvaluationError::Cancelled),
                output = module.action().invoke(args) => output,
            };
            results.push(output.map_err(|err| EvaluationError::Action {
                node,
                module_id: module.id.clone(),
                source: err.into(),
            })?);
        }

        let outputs = assemble_outputs(node, module, &self.registry, results)?;
        Ok(module
            .outputs
            .iter()
            .map(|terminal| {
                let values = outputs.get(&terminal.id).cloned().unwrap_or_default();
                (terminal.id.clone(), Bundle::new(terminal.datatype.clone(), values))
            })
            .collect())
    }

    async fn record(&self, node: NodeId, entry: CacheEntry) {
        let mut results = self.results.lock().await;
        for (terminal, bundle) in entry {
            results.insert(TerminalRef::new(node, terminal), Arc::new(bundle));
        }
    }
}
