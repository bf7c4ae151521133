// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The execution engine.
//!
//! [`Engine`] evaluates a [`Template`] against a [`RunConfig`], consulting and
//! populating the cache, either over the whole graph or only over the
//! ancestors of one requested terminal.
//!
//! # Strategies
//!
//! * **Sequential**: one node at a time in dependency order
//! * **Level**: topological levels, nodes within a level run concurrently
//!   (see [`LevelByLevelExecutor`])
//!
//! Both strategies produce identical results.

pub mod arity;
pub mod fingerprint;
pub mod level_by_level;
mod node;


pub use fingerprint::{canonicalize, effective_config, Fingerprint};
pub use level_by_level::LevelByLevelExecutor;

use crate::cache::{CacheManager, CacheStats};
use crate::config::{
    check_run_config, default_concurrency, validate_template, EngineConfig, ExecutorOptions, RunConfig,
    Strategy, Template, TerminalRef,
};
use crate::errors::{CycleError, EvaluationError, ValidationError};
use crate::observability::messages::cache::CacheStatsReport;
use crate::observability::messages::engine::{EvaluationCompleted, EvaluationFailed, EvaluationStarted};
use crate::observability::messages::validation::TemplateValidationFailed;
use crate::observability::messages::StructuredLog;
use crate::registry::{Bundle, Registry};
use node::{EvalContext, NodeOutcome, ResultMap};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Runtime knobs for an [`Engine`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub strategy: Strategy,
    pub max_concurrency: usize,
    pub timeout: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Sequential,
            max_concurrency: default_concurrency(),
            timeout: None,
        }
    }
}

impl From<&ExecutorOptions> for EngineOptions {
    fn from(options: &ExecutorOptions) -> Self {
        Self {
            strategy: options.strategy,
            max_concurrency: options.get_max_concurrency(),
            timeout: options.get_timeout(),
        }
    }
}

/// Every output bundle of a full evaluation, keyed by `(node, terminal)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Results(ResultMap);

impl Results {
    pub fn get(&self, node: usize, terminal: &str) -> Option<&Arc<Bundle>> {
        self.0.get(&TerminalRef::new(node, terminal))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TerminalRef, &Arc<Bundle>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `{"node:terminal": {"datatype": .., "values": [..]}}`
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(key, bundle)| {
                let value = serde_json::to_value(bundle.as_ref()).unwrap_or(Value::Null);
                (key.to_string(), value)
            })
            .collect();
        Value::Object(map)
    }
}

/// Outcome of [`Engine::evaluate_with_token`].
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    All(Results),
    Target(Arc<Bundle>),
}

/// Evaluates templates against a registry and a cache.
pub struct Engine {
    registry: Arc<Registry>,
    cache: CacheManager,
    options: EngineOptions,
}

impl Engine {
    pub fn new(registry: Arc<Registry>, cache: CacheManager) -> Self {
        Self::with_options(registry, cache, EngineOptions::default())
    }

    pub fn with_options(registry: Arc<Registry>, cache: CacheManager, options: EngineOptions) -> Self {
        Self {
            registry,
            cache,
            options,
        }
    }

    /// Open the configured cache backend and apply the executor options.
    pub async fn from_config(registry: Arc<Registry>, config: &EngineConfig) -> Self {
        let cache = CacheManager::from_config(&config.cache).await;
        Self::with_options(registry, cache, EngineOptions::from(&config.engine))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Evaluate every node and return every output bundle.
    pub async fn evaluate(&self, template: &Template, config: &RunConfig) -> Result<Results, EvaluationError> {
        match self
            .evaluate_with_token(template, config, None, CancellationToken::new())
            .await?
        {
            Evaluation::All(results) => Ok(results),
            Evaluation::Target(_) => Err(EvaluationError::internal("full evaluation returned a single bundle")),
        }
    }

    /// Evaluate only the ancestors of `target.node` and return the bundle at `target`.
    ///
    /// When `target` names an input terminal, the values wired into it are
    /// returned without running the node itself.
    pub async fn evaluate_target(
        &self,
        template: &Template,
        config: &RunConfig,
        target: TerminalRef,
    ) -> Result<Arc<Bundle>, EvaluationError> {
        match self
            .evaluate_with_token(template, config, Some(target), CancellationToken::new())
            .await?
        {
            Evaluation::Target(bundle) => Ok(bundle),
            Evaluation::All(_) => Err(EvaluationError::internal("target evaluation returned every bundle")),
        }
    }

    /// Evaluate with a caller-supplied cancellation token.
    ///
    /// Cancelling the token aborts between nodes or during an action call and
    /// returns [`EvaluationError::Cancelled`]. Nodes cached before the
    /// cancellation stay cached.
    pub async fn evaluate_with_token(
        &self,
        template: &Template,
        config: &RunConfig,
        target: Option<TerminalRef>,
        token: CancellationToken,
    ) -> Result<Evaluation, EvaluationError> {
        let strategy = self.options.strategy.as_str();
        let ctx = Arc::new(self.prepare(template, config, target, token.child_token())?);

        let target_label = ctx
            .target
            .as_ref()
            .map_or_else(|| "all".to_string(), ToString::to_string);
        EvaluationStarted {
            strategy,
            template: &template.name,
            node_count: ctx.order.len(),
            target: &target_label,
        }
        .log();

        let start = Instant::now();
        let outcome = self.run_with_timeout(Arc::clone(&ctx)).await;
        let outcome = outcome.and_then(|echo| Self::finish(&ctx, echo));

        match &outcome {
            Ok(_) => EvaluationCompleted {
                strategy,
                node_count: ctx.order.len(),
                duration: start.elapsed(),
            }
            .log(),
            Err(error) => EvaluationFailed { strategy, error }.log(),
        }
        outcome
    }

    /// For each node, whether its outputs are already cached. Runs no actions.
    pub async fn is_calculated(&self, template: &Template, config: &RunConfig) -> Result<Vec<bool>, EvaluationError> {
        let fingerprints = self.fingerprint_template(template, config)?;
        let mut calculated = Vec::with_capacity(fingerprints.len());
        for fingerprint in &fingerprints {
            calculated.push(self.cache.exists(fingerprint.as_str()).await);
        }
        Ok(calculated)
    }

    /// One fingerprint per node, indexed by node.
    pub fn fingerprint_template(
        &self,
        template: &Template,
        config: &RunConfig,
    ) -> Result<Vec<Fingerprint>, EvaluationError> {
        fingerprint::fingerprint_template(template, &self.registry, config)
    }

    /// Log the cache statistics and return them.
    pub fn shutdown(&self) -> CacheStats {
        let stats = self.cache.stats();
        CacheStatsReport {
            backend: self.cache.backend(),
            stats: &stats,
        }
        .log();
        stats
    }

    /// Resolve everything one evaluation needs.
    ///
    /// A template whose only defect is a cycle fails with
    /// [`EvaluationError::Cycle`]; any other structural problem fails with
    /// [`EvaluationError::InvalidTemplate`] listing every error found.
    fn prepare(
        &self,
        template: &Template,
        config: &RunConfig,
        target: Option<TerminalRef>,
        token: CancellationToken,
    ) -> Result<EvalContext, EvaluationError> {
        if let Err(errors) = validate_template(template, &self.registry) {
            TemplateValidationFailed {
                template: &template.name,
                error_count: errors.len(),
            }
            .log();
            let error = match errors.as_slice() {
                [ValidationError::CyclicWiring { cycle }] => EvaluationError::Cycle(CycleError {
                    cycle: cycle.clone(),
                }),
                _ => EvaluationError::InvalidTemplate(errors),
            };
            return Err(error);
        }
        check_run_config(template, &self.registry, config);

        let modules = template
            .modules
            .iter()
            .map(|node| self.registry.lookup_module(&node.module))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(target) = &target {
            let exists = modules
                .get(target.node)
                .is_some_and(|m| m.input(&target.terminal).is_some() || m.output(&target.terminal).is_some());
            if !exists {
                return Err(EvaluationError::MissingTarget {
                    node: target.node,
                    terminal: target.terminal.clone(),
                });
            }
        }

        let configs = template
            .modules
            .iter()
            .enumerate()
            .map(|(node, definition)| effective_config(&modules[node], definition, config.for_node(node)))
            .collect();
        let fingerprints = self.fingerprint_template(template, config)?;
        let order = template.order(target.as_ref().map(|t| t.node))?;

        Ok(EvalContext {
            registry: Arc::clone(&self.registry),
            cache: self.cache.clone(),
            template: Arc::new(template.clone()),
            graph: template.graph(),
            order,
            modules,
            configs,
            fingerprints,
            target,
            results: Mutex::new(ResultMap::new()),
            token,
        })
    }

    async fn run_with_timeout(&self, ctx: Arc<EvalContext>) -> Result<Option<Arc<Bundle>>, EvaluationError> {
        let token = ctx.token.clone();
        let run = self.run(ctx);
        let Some(limit) = self.options.timeout else {
            return run.await;
        };
        match tokio::time::timeout(limit, run).await {
            Ok(outcome) => outcome,
            Err(_) => {
                token.cancel();
                Err(EvaluationError::TimedOut(limit))
            }
        }
    }

    async fn run(&self, ctx: Arc<EvalContext>) -> Result<Option<Arc<Bundle>>, EvaluationError> {
        match self.options.strategy {
            Strategy::Sequential => {
                for &node in &ctx.order {
                    if let NodeOutcome::Echo(bundle) = ctx.evaluate_node(node).await? {
                        return Ok(Some(bundle));
                    }
                }
                Ok(None)
            }
            Strategy::Level => {
                LevelByLevelExecutor::new(self.options.max_concurrency)
                    .run(ctx)
                    .await
            }
        }
    }

    fn finish(ctx: &EvalContext, echo: Option<Arc<Bundle>>) -> Result<Evaluation, EvaluationError> {
        if let Some(bundle) = echo {
            return Ok(Evaluation::Target(bundle));
        }
        let results = ctx
            .results
            .try_lock()
            .map_err(|_| EvaluationError::internal("results still locked after evaluation"))?;
        match &ctx.target {
            Some(target) => results
                .get(target)
                .cloned()
                .map(Evaluation::Target)
                .ok_or_else(|| EvaluationError::MissingTarget {
                    node: target.node,
                    terminal: target.terminal.clone(),
                }),
            None => Ok(Evaluation::All(Results(results.clone()))),
        }
    }
}
