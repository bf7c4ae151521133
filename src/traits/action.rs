// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Named arguments for one action call.
///
/// Holds the resolved value of every input terminal and every parameter that
/// was not omitted. An input terminal that received nothing is present as
/// `null` (single) or `[]` (multiple).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionArgs(BTreeMap<String, Value>);

impl ActionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// The value, or an error naming the missing argument.
    pub fn require(&self, name: &str) -> anyhow::Result<&Value> {
        self.0
            .get(name)
            .ok_or_else(|| anyhow!("missing argument '{}'", name))
    }

    pub fn get_str(&self, name: &str) -> anyhow::Result<&str> {
        self.require(name)?
            .as_str()
            .with_context(|| format!("argument '{}' is not a string", name))
    }

    /// String argument, or `default` when the parameter was omitted.
    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> anyhow::Result<&'a str> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.get_str(name),
        }
    }

    pub fn get_f64(&self, name: &str) -> anyhow::Result<f64> {
        self.require(name)?
            .as_f64()
            .with_context(|| format!("argument '{}' is not a number", name))
    }

    pub fn get_array(&self, name: &str) -> anyhow::Result<&Vec<Value>> {
        self.require(name)?
            .as_array()
            .with_context(|| format!("argument '{}' is not a list", name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for ActionArgs {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Values returned by one action call, positionally matching the module's
/// declared output terminals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutput(pub Vec<Value>);

impl ActionOutput {
    /// For modules with no outputs.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// For modules with exactly one output.
    pub fn single(value: Value) -> Self {
        Self(vec![value])
    }

    /// For modules with several outputs, in declaration order.
    pub fn tuple(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl From<Value> for ActionOutput {
    fn from(value: Value) -> Self {
        ActionOutput::single(value)
    }
}

/// The callable behind a module.
///
/// Errors are propagated to the caller unchanged, wrapped with the node index
/// and module id that raised them.
#[async_trait]
pub trait Action: Send + Sync {
    async fn invoke(&self, args: ActionArgs) -> anyhow::Result<ActionOutput>;
}

/// Adapter turning a synchronous closure into an [`Action`].
pub struct FnAction<F>(pub F);

#[async_trait]
impl<F> Action for FnAction<F>
where
    F: Fn(ActionArgs) -> anyhow::Result<ActionOutput> + Send + Sync,
{
    async fn invoke(&self, args: ActionArgs) -> anyhow::Result<ActionOutput> {
        (self.0)(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let mut args = ActionArgs::new();
        args.insert("text", json!("abc"));
        args.insert("scale", json!(2));
        args.insert("items", json!([1, 2]));
        args.insert("nothing", Value::Null);

        assert_eq!(args.get_str("text").unwrap(), "abc");
        assert_eq!(args.get_f64("scale").unwrap(), 2.0);
        assert_eq!(args.get_array("items").unwrap().len(), 2);
        assert_eq!(args.str_or("missing", "dflt").unwrap(), "dflt");
        assert_eq!(args.str_or("nothing", "dflt").unwrap(), "dflt");
        assert!(args.get_str("scale").is_err());
        assert!(args.require("missing").is_err());
    }

    #[tokio::test]
    async fn test_fn_action() {
        let action = FnAction(|args: ActionArgs| -> anyhow::Result<ActionOutput> {
            let n = args.get_f64("n")?;
            Ok(ActionOutput::single(json!(n + 1.0)))
        });

        let args: ActionArgs = [("n".to_string(), json!(1.0))].into_iter().collect();
        let out = action.invoke(args).await.unwrap();
        assert_eq!(out, ActionOutput::single(json!(2.0)));

        assert!(action.invoke(ActionArgs::new()).await.is_err());
    }
}
