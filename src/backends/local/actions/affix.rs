// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::RegistryError;
use crate::registry::{Module, ParamKind, Parameter, Terminal};
use crate::traits::{Action, ActionArgs, ActionOutput};

use super::DOCUMENT;

/// Prefix/Suffix Adder action - wraps each document
pub struct PrefixSuffixAdder;

pub fn module() -> Result<Module, RegistryError> {
    Module::builder("text.affix", "1.0")
        .name("Add Prefix/Suffix")
        .description("Wrap each document between a prefix and a suffix")
        .input(Terminal::single("input", DOCUMENT))
        .output(Terminal::single("output", DOCUMENT))
        .field(Parameter::new("prefix", ParamKind::Str).with_default(json!("[")))
        .field(Parameter::new("suffix", ParamKind::Str).with_default(json!("]")))
        .action(PrefixSuffixAdder)
        .build()
}

#[async_trait]
impl Action for PrefixSuffixAdder {
    async fn invoke(&self, args: ActionArgs) -> anyhow::Result<ActionOutput> {
        let input = args.get_str("input")?;
        let prefix = args.str_or("prefix", "")?;
        let suffix = args.str_or("suffix", "")?;
        Ok(ActionOutput::single(Value::String(format!("{}{}{}", prefix, input, suffix))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prefix_and_suffix() {
        let cases = vec![
            (Some("<<"), Some(">>"), "<<text>>"),
            (Some("> "), None, "> text"),
            (None, Some("!"), "text!"),
            (None, None, "text"),
        ];

        for (prefix, suffix, expected) in cases {
            let mut args = ActionArgs::new();
            args.insert("input", json!("text"));
            if let Some(p) = prefix {
                args.insert("prefix", json!(p));
            }
            if let Some(s) = suffix {
                args.insert("suffix", json!(s));
            }
            let output = PrefixSuffixAdder.invoke(args).await.unwrap();
            assert_eq!(output.into_values(), vec![json!(expected)]);
        }
    }
}
