// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Content fingerprints for cache keying.
//!
//! A node's fingerprint is a SHA-256 digest over, in order:
//!
//! ```text
//! module id | module version | canonical effective config |
//!   (source terminal | target terminal | source fingerprint) for each inbound wire, in wire order
//! ```
//!
//! Each part is prefixed with its byte length before hashing, so no two part
//! lists produce the same byte stream. The canonical config is JSON with object
//! keys sorted at every depth; arrays keep their order; floats with no
//! fractional part are written as integers.

use crate::config::{NodeId, RunConfig, Template, TemplateNode};
use crate::errors::EvaluationError;
use crate::registry::{Module, Registry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 digest identifying one node's computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render `value` as JSON with object keys sorted at every depth.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Number(number) => match integral(number) {
            Some(int) => out.push_str(&int.to_string()),
            None => out.push_str(&number.to_string()),
        },
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// The integer a float holds exactly, e.g. `3.0` -> `3`, so both spellings hash alike.
fn integral(number: &Number) -> Option<i64> {
    if !number.is_f64() {
        return None;
    }
    let float = number.as_f64()?;
    // i64::MAX is not representable as f64; 2^63 is the first value past the range
    let in_range = float >= -(2f64.powi(63)) && float < 2f64.powi(63);
    (float.fract() == 0.0 && in_range).then_some(float as i64)
}

/// Effective parameter values for a node: module defaults, replaced by the
/// template's stored values, replaced by the run-time values.
///
/// Only declared parameters are included; other keys are ignored.
pub fn effective_config(
    module: &Module,
    node: &TemplateNode,
    runtime: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    module
        .fields
        .iter()
        .map(|field| {
            let value = runtime
                .and_then(|r| r.get(&field.id))
                .or_else(|| node.config.get(&field.id))
                .unwrap_or(&field.default)
                .clone();
            (field.id.clone(), value)
        })
        .collect()
}

/// One inbound wire's contribution to a fingerprint.
pub struct InboundFingerprint<'a> {
    pub source_terminal: &'a str,
    pub target_terminal: &'a str,
    pub fingerprint: &'a Fingerprint,
}

/// Fingerprint a node from its module identity, effective config and inbound wires.
pub fn fingerprint_node(
    module: &Module,
    config: &Map<String, Value>,
    inbound: &[InboundFingerprint<'_>],
) -> Fingerprint {
    let canonical = canonicalize(&Value::Object(config.clone()));

    let mut hasher = Sha256::new();
    let mut part = |bytes: &[u8]| {
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    };
    part(module.id.as_bytes());
    part(module.version.as_bytes());
    part(canonical.as_bytes());
    for wire in inbound {
        part(wire.source_terminal.as_bytes());
        part(wire.target_terminal.as_bytes());
        part(wire.fingerprint.as_str().as_bytes());
    }
    Fingerprint(hex::encode(hasher.finalize()))
}

/// Fingerprint every node of `template`, indexed by node.
///
/// Nodes are visited in full dependency order, since each fingerprint
/// consumes the fingerprints of its upstream nodes.
pub fn fingerprint_template(
    template: &Template,
    registry: &Registry,
    config: &RunConfig,
) -> Result<Vec<Fingerprint>, EvaluationError> {
    let mut fingerprints: Vec<Option<Fingerprint>> = vec![None; template.modules.len()];

    for (node, wires) in template.ordered(None)? {
        let definition = &template.modules[node];
        let module = registry.lookup_module(&definition.module)?;
        let effective = effective_config(&module, definition, config.for_node(node));

        let mut inbound = Vec::with_capacity(wires.len());
        for wire in &wires {
            let fingerprint = upstream(&fingerprints, wire.source_node())?;
            inbound.push(InboundFingerprint {
                source_terminal: wire.source_terminal(),
                target_terminal: wire.target_terminal(),
                fingerprint,
            });
        }
        let fingerprint = fingerprint_node(&module, &effective, &inbound);
        fingerprints[node] = Some(fingerprint);
    }

    fingerprints
        .into_iter()
        .enumerate()
        .map(|(node, fp)| {
            fp.ok_or_else(|| EvaluationError::internal(format!("node {} was not fingerprinted", node)))
        })
        .collect()
}

fn upstream(fingerprints: &[Option<Fingerprint>], node: NodeId) -> Result<&Fingerprint, EvaluationError> {
    fingerprints
        .get(node)
        .and_then(Option::as_ref)
        .ok_or_else(|| EvaluationError::internal(format!("upstream node {} has no fingerprint", node)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ParamKind, Parameter, Terminal};
    use crate::traits::ActionOutput;
    use serde_json::json;

    fn module(version: &str) -> Module {
        Module::builder("fp.scale", version)
            .input(Terminal::multiple("input", "num"))
            .output(Terminal::single("output", "num"))
            .field(Parameter::new("factor", ParamKind::float()).with_default(json!(1.0)))
            .field(Parameter::new("opts", ParamKind::Any).with_default(json!({})))
            .action_fn(|_| Ok(ActionOutput::single(json!(0))))
            .build()
            .unwrap()
    }

    fn config(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_canonicalize_sorts_nested_keys() {
        let a = json!({"b": 1, "a": {"y": [3, 1], "x": null}});
        assert_eq!(canonicalize(&a), r#"{"a":{"x":null,"y":[3,1]},"b":1}"#);
    }

    #[test]
    fn test_integral_floats_canonicalize_as_integers() {
        let value = json!({"f": 3.0, "g": [2.5, -0.0, 1e300], "i": 3});
        assert_eq!(canonicalize(&value), r#"{"f":3,"g":[2.5,0,1e300],"i":3}"#);
    }

    #[test]
    fn test_yaml_int_and_json_float_share_a_fingerprint() {
        let from_yaml: Value = serde_yaml::from_str("factor: 3\nopts: {depth: 2}\n").unwrap();
        let from_json: Value = serde_json::from_str(r#"{"opts": {"depth": 2.0}, "factor": 3.0}"#).unwrap();

        assert_eq!(
            fingerprint_node(&module("1"), &config(from_yaml), &[]),
            fingerprint_node(&module("1"), &config(from_json), &[])
        );
        assert_ne!(
            fingerprint_node(&module("1"), &config(json!({"factor": 3})), &[]),
            fingerprint_node(&module("1"), &config(json!({"factor": 3.5})), &[])
        );
    }

    #[test]
    fn test_key_permutation_is_stable() {
        let m = module("1");
        let a = config(json!({"factor": 2.0, "opts": {"mode": "x", "limit": 3}}));
        let b = config(json!({"opts": {"limit": 3, "mode": "x"}, "factor": 2.0}));

        assert_eq!(fingerprint_node(&m, &a, &[]), fingerprint_node(&m, &a, &[]));
        assert_eq!(fingerprint_node(&m, &a, &[]), fingerprint_node(&m, &b, &[]));
    }

    #[test]
    fn test_identity_and_config_change_fingerprint() {
        let base = config(json!({"factor": 2.0}));
        let reference = fingerprint_node(&module("1"), &base, &[]);

        assert_ne!(reference, fingerprint_node(&module("2"), &base, &[]));
        assert_ne!(reference, fingerprint_node(&module("1"), &config(json!({"factor": 3.0})), &[]));
        assert_ne!(
            fingerprint_node(&module("1"), &config(json!({"opts": [1, 2]})), &[]),
            fingerprint_node(&module("1"), &config(json!({"opts": [2, 1]})), &[])
        );
        assert_eq!(reference.as_str().len(), 64);
    }

    #[test]
    fn test_wire_order_changes_fingerprint() {
        let m = module("1");
        let cfg = config(json!({}));
        let up_a = Fingerprint("a".repeat(64));
        let up_b = Fingerprint("b".repeat(64));
        fn wire(fingerprint: &Fingerprint) -> InboundFingerprint<'_> {
            InboundFingerprint {
                source_terminal: "output",
                target_terminal: "input",
                fingerprint,
            }
        }

        let ab = fingerprint_node(&m, &cfg, &[wire(&up_a), wire(&up_b)]);
        let ba = fingerprint_node(&m, &cfg, &[wire(&up_b), wire(&up_a)]);
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_length_prefix_separates_parts() {
        let m = module("1");
        let cfg = config(json!({}));
        let fp = Fingerprint("x".into());
        let split_one = [InboundFingerprint {
            source_terminal: "ab",
            target_terminal: "c",
            fingerprint: &fp,
        }];
        let split_two = [InboundFingerprint {
            source_terminal: "a",
            target_terminal: "bc",
            fingerprint: &fp,
        }];
        assert_ne!(
            fingerprint_node(&m, &cfg, &split_one),
            fingerprint_node(&m, &cfg, &split_two)
        );
    }

    #[test]
    fn test_effective_config_layering() {
        let m = module("1");
        let node = TemplateNode::new("fp.scale")
            .with("factor", json!(2.0))
            .with("undeclared", json!(true));
        let runtime = config(json!({"opts": {"k": 1}}));

        let effective = effective_config(&m, &node, Some(&runtime));
        assert_eq!(Value::Object(effective), json!({"factor": 2.0, "opts": {"k": 1}}));

        let defaults = effective_config(&m, &TemplateNode::new("fp.scale"), None);
        assert_eq!(Value::Object(defaults), json!({"factor": 1.0, "opts": {}}));
    }
}
