// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::NodeId;
use crate::engine::node::{EvalContext, NodeOutcome};
use crate::errors::EvaluationError;
use crate::observability::messages::engine::LevelComputationCompleted;
use crate::observability::messages::StructuredLog;
use crate::registry::Bundle;

/// Level-by-Level executor: evaluates the nodes of one topological level
/// concurrently, then moves on to the next.
///
/// ## Execution Strategy
///
/// 1. **Topological Level Computation**: Kahn's algorithm over the nodes being
///    evaluated; level 0 holds the nodes with no upstream, level N the nodes
///    whose upstreams all sit in levels 0..N-1
/// 2. **Level Execution**: one task per node, bounded by a semaphore of
///    `max_concurrency` permits; the next level starts once every task of the
///    current level has finished
///
/// Nodes in one level never feed each other, so each reads only results
/// recorded by earlier levels and the outcome matches sequential evaluation.
///
/// ## Failure Handling
///
/// The first failing node cancels the evaluation token so its siblings stop at
/// their next cancellation point. The executor still waits for every task of
/// the level and reports the first error that is not a cancellation.
pub struct LevelByLevelExecutor {
    /// Maximum number of nodes evaluated at once within a level
    max_concurrency: usize,
}

impl LevelByLevelExecutor {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub(crate) async fn run(&self, ctx: Arc<EvalContext>) -> Result<Option<Arc<Bundle>>, EvaluationError> {
        let levels = ctx.graph.levels(&ctx.order)?;
        LevelComputationCompleted {
            level_count: levels.len(),
            node_count: ctx.order.len(),
        }
        .log();

        for level in &levels {
            if let Some(echo) = self.execute_level(level, &ctx).await? {
                return Ok(Some(echo));
            }
        }
        Ok(None)
    }

    async fn execute_level(
        &self,
        level: &[NodeId],
        ctx: &Arc<EvalContext>,
    ) -> Result<Option<Arc<Bundle>>, EvaluationError> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = Vec::with_capacity(level.len());

        for &node in level {
            let ctx = Arc::clone(ctx);
            let semaphore = Arc::clone(&semaphore);

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.map_err(|e| {
                    EvaluationError::internal(format!(
                        "failed to acquire semaphore permit for node {}: {}",
                        node, e
                    ))
                })?;
                ctx.evaluate_node(node).await
            }));
        }

        let mut failure: Option<EvaluationError> = None;
        let mut echo = None;
        for task in tasks {
            let outcome = task
                .await
                .map_err(|join_error| EvaluationError::internal(format!("task join error: {}", join_error)))
                .and_then(|result| result);
            match outcome {
                Ok(NodeOutcome::Done) => {}
                Ok(NodeOutcome::Echo(bundle)) => echo = Some(bundle),
                Err(error) => {
                    ctx.token.cancel();
                    failure = match failure {
                        None => Some(error),
                        Some(EvaluationError::Cancelled) if !matches!(error, EvaluationError::Cancelled) => {
                            Some(error)
                        }
                        kept => kept,
                    };
                }
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(echo),
        }
    }
}

impl Default for LevelByLevelExecutor {
    fn default() -> Self {
        Self::new(crate::config::default_concurrency())
    }
}
