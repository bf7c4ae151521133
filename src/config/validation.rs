// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Template validation against a registry.
//!
//! Validation runs before any node is evaluated and reports every problem it
//! can find rather than stopping at the first. The checks run in three stages:
//!
//! 1. **Nodes**: each node's module is registered and its terminals use
//!    registered datatypes
//! 2. **Wires**: both endpoints exist, the source is an output terminal, the
//!    target is an input terminal, and the datatypes agree
//! 3. **Cycles**: depth-first search over the wire graph
//!
//! Cycle detection needs well-formed wires, so it is skipped when the second
//! stage reports anything. Unknown modules do not block it.
//!
//! Some conditions are tolerated and only logged: several wires into one
//! `single` input, parameter values for undeclared parameters, and node fields
//! the engine does not interpret.

use crate::config::template::{NodeId, RunConfig, Template};
use crate::errors::ValidationError;
use crate::observability::messages::validation::{
    CycleDetected, IgnoredTemplateFields, MultipleWiresIntoSingleTerminal, UndeclaredParameters,
    UnknownRunConfigNode,
};
use crate::observability::messages::StructuredLog;
use crate::registry::{Module, Registry};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Validate `template` against `registry`.
///
/// # Returns
///
/// * `Ok(())` - every module resolves, every wire is well formed and the graph is acyclic
/// * `Err(Vec<ValidationError>)` - all problems found
pub fn validate_template(template: &Template, registry: &Registry) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let modules = resolve_modules(template, registry, &mut errors);
    let before_wires = errors.len();
    validate_wires(template, &modules, &mut errors);

    if errors.len() == before_wires {
        if let Err(cycle) = template.order(None) {
            CycleDetected {
                template: &template.name,
                cycle: &cycle.cycle,
            }
            .log();
            errors.push(cycle.into());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Log run config entries that do not reach any declared parameter.
pub fn check_run_config(template: &Template, registry: &Registry, config: &RunConfig) {
    for (key, fields) in &config.0 {
        let node = match key.parse::<NodeId>() {
            Ok(node) if node < template.modules.len() => node,
            _ => {
                UnknownRunConfigNode { key }.log();
                continue;
            }
        };
        if let Ok(module) = registry.lookup_module(&template.modules[node].module) {
            warn_undeclared(node, &module, "run config", fields);
        }
    }
}

fn resolve_modules(
    template: &Template,
    registry: &Registry,
    errors: &mut Vec<ValidationError>,
) -> Vec<Option<Arc<Module>>> {
    template
        .modules
        .iter()
        .enumerate()
        .map(|(node, definition)| {
            let module = match registry.lookup_module(&definition.module) {
                Ok(module) => module,
                Err(_) => {
                    errors.push(ValidationError::UnknownModule {
                        node,
                        module_id: definition.module.clone(),
                    });
                    return None;
                }
            };

            for terminal in module.terminals() {
                if registry.lookup_datatype(&terminal.datatype).is_err() {
                    errors.push(ValidationError::UnknownDatatype {
                        node,
                        module_id: module.id.clone(),
                        terminal: terminal.id.clone(),
                        datatype: terminal.datatype.clone(),
                    });
                }
            }

            warn_undeclared(node, &module, "template", &definition.config);
            if !definition.extra.is_empty() {
                let fields: Vec<&str> = definition.extra.keys().map(String::as_str).collect();
                IgnoredTemplateFields {
                    node,
                    fields: &fields,
                }
                .log();
            }
            Some(module)
        })
        .collect()
}

fn validate_wires(
    template: &Template,
    modules: &[Option<Arc<Module>>],
    errors: &mut Vec<ValidationError>,
) {
    let mut fan_in: BTreeMap<(NodeId, &str), usize> = BTreeMap::new();

    for (index, wire) in template.wires.iter().enumerate() {
        let mut endpoints_ok = true;
        for node in [wire.source_node(), wire.target_node()] {
            if node >= modules.len() {
                errors.push(ValidationError::MissingNode { wire: index, node });
                endpoints_ok = false;
            }
        }
        if !endpoints_ok {
            continue;
        }
        // unknown modules were already reported
        let (Some(source), Some(target)) = (&modules[wire.source_node()], &modules[wire.target_node()]) else {
            continue;
        };

        let output = source.output(wire.source_terminal());
        if output.is_none() {
            errors.push(terminal_error(index, wire.source_node(), wire.source_terminal(), source, "output"));
        }
        let input = target.input(wire.target_terminal());
        if input.is_none() {
            errors.push(terminal_error(index, wire.target_node(), wire.target_terminal(), target, "input"));
        }

        if let (Some(output), Some(input)) = (output, input) {
            if output.datatype != input.datatype {
                errors.push(ValidationError::DatatypeMismatch {
                    wire: index,
                    from_type: output.datatype.clone(),
                    to_type: input.datatype.clone(),
                });
            }
            if !input.is_multiple() {
                *fan_in
                    .entry((wire.target_node(), wire.target_terminal()))
                    .or_default() += 1;
            }
        }
    }

    for ((node, terminal), wire_count) in fan_in {
        if wire_count > 1 {
            MultipleWiresIntoSingleTerminal {
                node,
                terminal,
                wire_count,
            }
            .log();
        }
    }
}

/// A wire endpoint that is missing, or present on the wrong side of the module.
fn terminal_error(
    wire: usize,
    node: NodeId,
    terminal: &str,
    module: &Module,
    expected: &'static str,
) -> ValidationError {
    let wrong_side = match expected {
        "output" => module.input(terminal).is_some(),
        _ => module.output(terminal).is_some(),
    };
    if wrong_side {
        ValidationError::WrongDirection {
            wire,
            node,
            terminal: terminal.to_string(),
            expected,
        }
    } else {
        ValidationError::UnknownTerminal {
            wire,
            node,
            terminal: terminal.to_string(),
        }
    }
}

fn warn_undeclared(node: NodeId, module: &Module, origin: &str, values: &Map<String, Value>) {
    let undeclared: Vec<&str> = values
        .keys()
        .filter(|k| module.field(k).is_none())
        .map(String::as_str)
        .collect();
    if !undeclared.is_empty() {
        UndeclaredParameters {
            node,
            module_id: &module.id,
            origin,
            fields: &undeclared,
        }
        .log();
    }
}
