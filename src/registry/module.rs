// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Module descriptors: terminals, parameters and the action callable.
//!
//! A [`Module`] is built once when its instrument registers it and is
//! immutable afterwards. [`ModuleBuilder::build`] checks the descriptor
//! invariants:
//!
//! * terminal ids are unique across inputs and outputs
//! * parameter ids are unique and disjoint from terminal ids
//! * every parameter default passes its own kind check

use crate::errors::RegistryError;
use crate::traits::{Action, ActionArgs, ActionOutput, FnAction};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// How many values flow through a terminal per action call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    /// Exactly one value.
    Single,
    /// An ordered list of any length, handled as one unit.
    Multiple,
}

/// A named input or output slot on a module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Terminal {
    pub id: String,
    pub datatype: String,
    pub arity: Arity,
    pub label: String,
    pub description: String,
}

impl Terminal {
    pub fn single(id: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::new(id, datatype, Arity::Single)
    }

    pub fn multiple(id: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::new(id, datatype, Arity::Multiple)
    }

    fn new(id: impl Into<String>, datatype: impl Into<String>, arity: Arity) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            datatype: datatype.into(),
            arity,
            description: String::new(),
        }
    }

    pub fn describe(mut self, label: impl Into<String>, description: impl Into<String>) -> Self {
        self.label = label.into();
        self.description = description.into();
        self
    }

    pub fn is_multiple(&self) -> bool {
        self.arity == Arity::Multiple
    }
}

/// The value kind a parameter accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    Int {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Float {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Str,
    Bool,
    /// One of a closed set of strings.
    Opt { choices: Vec<String> },
    /// Two numbers, `[x, y]`.
    Coordinate,
    List { item: Box<ParamKind> },
    Any,
}

impl ParamKind {
    pub fn int() -> Self {
        ParamKind::Int {
            min: None,
            max: None,
        }
    }

    pub fn float() -> Self {
        ParamKind::Float {
            min: None,
            max: None,
        }
    }

    pub fn opt<S: Into<String>>(choices: impl IntoIterator<Item = S>) -> Self {
        ParamKind::Opt {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    pub fn list(item: ParamKind) -> Self {
        ParamKind::List {
            item: Box::new(item),
        }
    }

    /// Check one value against the kind, describing the mismatch on failure.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            ParamKind::Int { min, max } => {
                let n = as_integer(value).ok_or_else(|| format!("expected an integer, got {}", value))?;
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("{} is below the minimum {}", n, min));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("{} is above the maximum {}", n, max));
                    }
                }
                Ok(())
            }
            ParamKind::Float { min, max } => {
                let x = value
                    .as_f64()
                    .ok_or_else(|| format!("expected a number, got {}", value))?;
                if let Some(min) = min {
                    if x < *min {
                        return Err(format!("{} is below the minimum {}", x, min));
                    }
                }
                if let Some(max) = max {
                    if x > *max {
                        return Err(format!("{} is above the maximum {}", x, max));
                    }
                }
                Ok(())
            }
            ParamKind::Str => match value {
                Value::String(_) => Ok(()),
                other => Err(format!("expected a string, got {}", other)),
            },
            ParamKind::Bool => match value {
                Value::Bool(_) => Ok(()),
                other => Err(format!("expected a boolean, got {}", other)),
            },
            ParamKind::Opt { choices } => match value.as_str() {
                Some(s) if choices.iter().any(|c| c == s) => Ok(()),
                _ => Err(format!("expected one of [{}], got {}", choices.join(", "), value)),
            },
            ParamKind::Coordinate => match value.as_array() {
                Some(items) if items.len() == 2 && items.iter().all(Value::is_number) => Ok(()),
                _ => Err(format!("expected a coordinate [x, y], got {}", value)),
            },
            ParamKind::List { item } => {
                let items = value
                    .as_array()
                    .ok_or_else(|| format!("expected a list, got {}", value))?;
                for (i, v) in items.iter().enumerate() {
                    item.check(v).map_err(|e| format!("item {}: {}", i, e))?;
                }
                Ok(())
            }
            ParamKind::Any => Ok(()),
        }
    }
}

/// Integers, plus floats with no fractional part.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let x = value.as_f64()?;
    if x.fract() == 0.0 && x >= i64::MIN as f64 && x <= i64::MAX as f64 {
        Some(x as i64)
    } else {
        None
    }
}

/// A declared parameter ("field") of a module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub id: String,
    #[serde(flatten)]
    pub kind: ParamKind,
    pub default: Value,
    /// Takes one value per item in item mode.
    pub multiple: bool,
    pub description: String,
}

impl Parameter {
    pub fn new(id: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            id: id.into(),
            kind,
            default: Value::Null,
            multiple: false,
            description: String::new(),
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Expand a configured value into the per-item value list.
    ///
    /// Single-valued parameters wrap a value into a one-element list and treat
    /// `null` as absent. Multiple-valued parameters take an array as the list
    /// itself and wrap anything else.
    pub fn values(&self, value: &Value) -> Vec<Value> {
        match (self.multiple, value) {
            (_, Value::Null) => Vec::new(),
            (true, Value::Array(items)) => items.clone(),
            _ => vec![value.clone()],
        }
    }
}

/// Serializable description of a module, without its callable.
///
/// Two registrations under one id are identical when their definitions are equal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleDefinition {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub inputs: Vec<Terminal>,
    pub outputs: Vec<Terminal>,
    pub fields: Vec<Parameter>,
    pub cacheable: bool,
    pub visible: bool,
}

/// One computation step.
pub struct Module {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub inputs: Vec<Terminal>,
    pub outputs: Vec<Terminal>,
    pub fields: Vec<Parameter>,
    pub cacheable: bool,
    pub visible: bool,
    action: Arc<dyn Action>,
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("fields", &self.fields)
            .field("cacheable", &self.cacheable)
            .finish_non_exhaustive()
    }
}

impl Module {
    pub fn builder(id: impl Into<String>, version: impl Into<String>) -> ModuleBuilder {
        ModuleBuilder::new(id, version)
    }

    pub fn action(&self) -> &Arc<dyn Action> {
        &self.action
    }

    pub fn input(&self, id: &str) -> Option<&Terminal> {
        self.inputs.iter().find(|t| t.id == id)
    }

    pub fn output(&self, id: &str) -> Option<&Terminal> {
        self.outputs.iter().find(|t| t.id == id)
    }

    pub fn field(&self, id: &str) -> Option<&Parameter> {
        self.fields.iter().find(|p| p.id == id)
    }

    /// Every terminal, inputs first.
    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// True when the action runs once per item of the first input.
    ///
    /// Modules with no inputs, or whose first input is `multiple`, run once
    /// over whole bundles.
    pub fn item_mode(&self) -> bool {
        matches!(self.inputs.first(), Some(t) if t.arity == Arity::Single)
    }

    pub fn definition(&self) -> ModuleDefinition {
        ModuleDefinition {
            id: self.id.clone(),
            version: self.version.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            fields: self.fields.clone(),
            cacheable: self.cacheable,
            visible: self.visible,
        }
    }
}

/// Builder for [`Module`].
pub struct ModuleBuilder {
    id: String,
    version: String,
    name: Option<String>,
    description: String,
    author: String,
    inputs: Vec<Terminal>,
    outputs: Vec<Terminal>,
    fields: Vec<Parameter>,
    cacheable: bool,
    visible: bool,
    action: Option<Arc<dyn Action>>,
}

impl ModuleBuilder {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            name: None,
            description: String::new(),
            author: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            fields: Vec::new(),
            cacheable: true,
            visible: true,
            action: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn input(mut self, terminal: Terminal) -> Self {
        self.inputs.push(terminal);
        self
    }

    pub fn output(mut self, terminal: Terminal) -> Self {
        self.outputs.push(terminal);
        self
    }

    pub fn field(mut self, parameter: Parameter) -> Self {
        self.fields.push(parameter);
        self
    }

    pub fn cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn action<A: Action + 'static>(mut self, action: A) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    pub fn shared_action(mut self, action: Arc<dyn Action>) -> Self {
        self.action = Some(action);
        self
    }

    pub fn action_fn<F>(self, f: F) -> Self
    where
        F: Fn(ActionArgs) -> anyhow::Result<ActionOutput> + Send + Sync + 'static,
    {
        self.action(FnAction(f))
    }

    pub fn build(self) -> Result<Module, RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidModule {
            module_id: self.id.clone(),
            reason,
        };

        if self.id.is_empty() {
            return Err(invalid("module id is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for terminal in self.inputs.iter().chain(self.outputs.iter()) {
            if !seen.insert(terminal.id.as_str()) {
                return Err(invalid(format!("duplicate terminal id '{}'", terminal.id)));
            }
        }
        let mut fields = HashSet::new();
        for field in &self.fields {
            if seen.contains(field.id.as_str()) {
                return Err(invalid(format!(
                    "parameter '{}' shares its id with a terminal",
                    field.id
                )));
            }
            if !fields.insert(field.id.as_str()) {
                return Err(invalid(format!("duplicate parameter id '{}'", field.id)));
            }
            for value in field.values(&field.default) {
                field
                    .kind
                    .check(&value)
                    .map_err(|e| invalid(format!("default for '{}': {}", field.id, e)))?;
            }
        }

        let action = self
            .action
            .clone()
            .ok_or_else(|| invalid("no action".to_string()))?;

        Ok(Module {
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            id: self.id,
            version: self.version,
            description: self.description,
            author: self.author,
            inputs: self.inputs,
            outputs: self.outputs,
            fields: self.fields,
            cacheable: self.cacheable,
            visible: self.visible,
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop() -> impl Fn(ActionArgs) -> anyhow::Result<ActionOutput> + Send + Sync + 'static {
        |_args| Ok(ActionOutput::none())
    }

    #[test]
    fn test_param_kind_checks() {
        let cases = vec![
            (ParamKind::int(), json!(3), true),
            (ParamKind::int(), json!(3.0), true),
            (ParamKind::int(), json!(3.5), false),
            (ParamKind::Int { min: Some(0), max: Some(10) }, json!(11), false),
            (ParamKind::Float { min: Some(0.0), max: None }, json!(-0.5), false),
            (ParamKind::float(), json!(2), true),
            (ParamKind::Str, json!("a"), true),
            (ParamKind::Str, json!(1), false),
            (ParamKind::Bool, json!(false), true),
            (ParamKind::opt(["upper", "lower"]), json!("lower"), true),
            (ParamKind::opt(["upper", "lower"]), json!("title"), false),
            (ParamKind::Coordinate, json!([1, 2.5]), true),
            (ParamKind::Coordinate, json!([1]), false),
            (ParamKind::list(ParamKind::Str), json!(["a", "b"]), true),
            (ParamKind::list(ParamKind::Str), json!(["a", 1]), false),
            (ParamKind::Any, json!({"x": [1]}), true),
        ];

        for (kind, value, ok) in cases {
            assert_eq!(kind.check(&value).is_ok(), ok, "{:?} against {}", kind, value);
        }
    }

    #[test]
    fn test_parameter_values() {
        let single = Parameter::new("p", ParamKind::Any);
        assert_eq!(single.values(&json!(null)), Vec::<Value>::new());
        assert_eq!(single.values(&json!([1, 2])), vec![json!([1, 2])]);

        let multiple = Parameter::new("p", ParamKind::Any).multiple();
        assert_eq!(multiple.values(&json!([1, 2])), vec![json!(1), json!(2)]);
        assert_eq!(multiple.values(&json!(7)), vec![json!(7)]);
        assert!(multiple.values(&json!([])).is_empty());
    }

    #[test]
    fn test_builder_rejects_duplicate_terminals() {
        let err = Module::builder("x.dup", "1")
            .input(Terminal::single("data", "t"))
            .output(Terminal::single("data", "t"))
            .action_fn(noop())
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidModule { .. }));
    }

    #[test]
    fn test_builder_rejects_field_terminal_overlap() {
        let err = Module::builder("x.overlap", "1")
            .input(Terminal::single("scale", "t"))
            .field(Parameter::new("scale", ParamKind::float()))
            .action_fn(noop())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("shares its id"));
    }

    #[test]
    fn test_builder_rejects_bad_default() {
        let err = Module::builder("x.default", "1")
            .field(Parameter::new("mode", ParamKind::opt(["a"])).with_default(json!("b")))
            .action_fn(noop())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("default for 'mode'"));
    }

    #[test]
    fn test_builder_requires_action() {
        assert!(Module::builder("x.none", "1").build().is_err());
    }

    #[test]
    fn test_item_mode_follows_first_input() {
        let build = |inputs: Vec<Terminal>| {
            let mut b = Module::builder("x.m", "1").action_fn(noop());
            for t in inputs {
                b = b.input(t);
            }
            b.build().unwrap()
        };

        assert!(!build(vec![]).item_mode());
        assert!(build(vec![Terminal::single("a", "t"), Terminal::multiple("b", "t")]).item_mode());
        assert!(!build(vec![Terminal::multiple("a", "t"), Terminal::single("b", "t")]).item_mode());
    }

    #[test]
    fn test_definition_ignores_callable() {
        let a = Module::builder("x.same", "1")
            .output(Terminal::single("output", "t"))
            .action_fn(noop())
            .build()
            .unwrap();
        let b = Module::builder("x.same", "1")
            .output(Terminal::single("output", "t"))
            .action_fn(|_| Ok(ActionOutput::single(json!(1))))
            .build()
            .unwrap();

        assert_eq!(a.definition(), b.definition());
        assert_eq!(a.name, "x.same");
        let json = serde_json::to_value(a.definition()).unwrap();
        assert_eq!(json["outputs"][0]["arity"], json!("single"));
    }
}
