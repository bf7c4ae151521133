// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The arity/broadcast protocol.
//!
//! A module runs in *bundle mode* (one call over whole bundles) when it has no
//! inputs or its first input is `multiple`; otherwise it runs in *item mode*,
//! one call per element delivered to the first input. Every parameter and every
//! `single` input must then supply 0, 1 or N values:
//!
//! | values | parameter            | single input           |
//! |--------|----------------------|------------------------|
//! | 0      | omitted              | `null` in every call   |
//! | N      | element-wise         | element-wise           |
//! | 1      | broadcast            | broadcast              |
//! | other  | `Arity` error        | `Arity` error          |
//!
//! A `multiple` input is passed whole to every call (`[]` when nothing was wired).

use crate::config::NodeId;
use crate::errors::EvaluationError;
use crate::registry::{Module, Parameter, Registry, Terminal};
use crate::traits::{ActionArgs, ActionOutput};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Number of action calls for a node given its gathered inputs.
pub fn call_count(module: &Module, inputs: &BTreeMap<String, Vec<Value>>) -> usize {
    match module.inputs.first() {
        Some(first) if module.item_mode() => inputs.get(&first.id).map_or(0, Vec::len),
        _ => 1,
    }
}

/// Resolve the per-call arguments for one node.
///
/// `config` is the node's effective configuration; `inputs` holds the values
/// gathered for each input terminal, concatenated in wire order.
pub fn plan_invocations(
    node: NodeId,
    module: &Module,
    config: &Map<String, Value>,
    inputs: &BTreeMap<String, Vec<Value>>,
) -> Result<Vec<ActionArgs>, EvaluationError> {
    let calls = call_count(module, inputs);
    let mut args = vec![ActionArgs::new(); calls];

    for field in &module.fields {
        let values = field_values(node, module, field, config)?;
        let Some(per_call) = spread(node, module, &field.id, values, calls)? else {
            continue;
        };
        for (call, value) in args.iter_mut().zip(per_call) {
            if !value.is_null() {
                call.insert(field.id.clone(), value);
            }
        }
    }

    for terminal in &module.inputs {
        let delivered = inputs.get(&terminal.id).cloned().unwrap_or_default();
        let per_call = if delivered.is_empty() {
            let placeholder = if terminal.is_multiple() {
                Value::Array(Vec::new())
            } else {
                Value::Null
            };
            vec![placeholder; calls]
        } else if terminal.is_multiple() {
            vec![Value::Array(delivered); calls]
        } else {
            spread(node, module, &terminal.id, delivered, calls)?.unwrap_or_default()
        };
        for (call, value) in args.iter_mut().zip(per_call) {
            call.insert(terminal.id.clone(), value);
        }
    }

    Ok(args)
}

/// Validated value list for one parameter.
fn field_values(
    node: NodeId,
    module: &Module,
    field: &Parameter,
    config: &Map<String, Value>,
) -> Result<Vec<Value>, EvaluationError> {
    let configured = config.get(&field.id).unwrap_or(&field.default);
    let values = field.values(configured);
    for value in &values {
        if value.is_null() {
            continue;
        }
        field.kind.check(value).map_err(|reason| EvaluationError::Validation {
            node,
            module_id: module.id.clone(),
            field: field.id.clone(),
            reason,
        })?;
    }
    Ok(values)
}

/// Stretch `values` to one per call. `None` means "nothing to pass".
fn spread(
    node: NodeId,
    module: &Module,
    name: &str,
    values: Vec<Value>,
    calls: usize,
) -> Result<Option<Vec<Value>>, EvaluationError> {
    match values.len() {
        0 => Ok(None),
        n if n == calls => Ok(Some(values)),
        1 => Ok(Some(vec![values[0].clone(); calls])),
        actual => Err(EvaluationError::Arity {
            node,
            module_id: module.id.clone(),
            field: name.to_string(),
            expected: calls,
            actual,
        }),
    }
}

/// Collect the per-call results into one value list per output terminal.
///
/// `multiple` outputs are concatenated across calls; `single` outputs get one
/// value per call. Every value is checked against its terminal's datatype.
pub fn assemble_outputs(
    node: NodeId,
    module: &Module,
    registry: &Registry,
    results: Vec<ActionOutput>,
) -> Result<BTreeMap<String, Vec<Value>>, EvaluationError> {
    let mut outputs: BTreeMap<String, Vec<Value>> = module
        .outputs
        .iter()
        .map(|t| (t.id.clone(), Vec::new()))
        .collect();

    for result in results {
        if result.len() != module.outputs.len() {
            return Err(EvaluationError::OutputCount {
                node,
                module_id: module.id.clone(),
                expected: module.outputs.len(),
                actual: result.len(),
            });
        }
        for (terminal, value) in module.outputs.iter().zip(result.into_values()) {
            let slot = outputs.entry(terminal.id.clone()).or_default();
            if terminal.is_multiple() {
                match value {
                    Value::Array(items) => slot.extend(items),
                    other => {
                        return Err(invalid_output(
                            node,
                            module,
                            terminal,
                            format!("multiple output must be a list, got {}", other),
                        ))
                    }
                }
            } else {
                slot.push(value);
            }
        }
    }

    for terminal in &module.outputs {
        let Ok(datatype) = registry.lookup_datatype(&terminal.datatype) else {
            continue;
        };
        let values = outputs.get(&terminal.id).map(Vec::as_slice).unwrap_or_default();
        if let Some(bad) = values.iter().find(|v| !datatype.check(v)) {
            return Err(invalid_output(
                node,
                module,
                terminal,
                format!("value {} is not a valid {}", bad, datatype.id),
            ));
        }
    }

    Ok(outputs)
}

fn invalid_output(node: NodeId, module: &Module, terminal: &Terminal, reason: String) -> EvaluationError {
    EvaluationError::Validation {
        node,
        module_id: module.id.clone(),
        field: terminal.id.clone(),
        reason,
    }
}
