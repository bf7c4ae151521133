// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::bail;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::RegistryError;
use crate::registry::{Module, ParamKind, Parameter, Terminal};
use crate::traits::{Action, ActionArgs, ActionOutput};

use super::DOCUMENT;

const MODES: [&str; 5] = ["upper", "lower", "proper", "title", "reverse"];

/// Words kept lowercase by title case unless they start the text.
const SMALL_WORDS: [&str; 14] = [
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Change Text Case action - converts one document per call
pub struct ChangeTextCase;

pub fn module() -> Result<Module, RegistryError> {
    Module::builder("text.case", "1.0")
        .name("Change Case")
        .description("Convert each document to upper, lower, proper or title case, or reverse it")
        .input(Terminal::single("input", DOCUMENT))
        .output(Terminal::single("output", DOCUMENT))
        .field(
            Parameter::new("mode", ParamKind::opt(MODES))
                .with_default(json!("upper"))
                .multiple()
                .describe("case conversion, one per document or one for all"),
        )
        .action(ChangeTextCase)
        .build()
}

pub fn change_case(input: &str, mode: &str) -> anyhow::Result<String> {
    let result = match mode {
        "upper" => input.to_uppercase(),
        "lower" => input.to_lowercase(),
        "proper" => input
            .split_whitespace()
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
        "title" => input
            .split_whitespace()
            .enumerate()
            .map(|(i, word)| {
                let lower = word.to_lowercase();
                if i == 0 || !SMALL_WORDS.contains(&lower.as_str()) {
                    capitalize(word)
                } else {
                    lower
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
        "reverse" => input.chars().rev().collect(),
        other => bail!("unknown case mode: {}", other),
    };
    Ok(result)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
    }
}

#[async_trait]
impl Action for ChangeTextCase {
    async fn invoke(&self, args: ActionArgs) -> anyhow::Result<ActionOutput> {
        let input = args.get_str("input")?;
        let mode = args.str_or("mode", "upper")?;
        Ok(ActionOutput::single(Value::String(change_case(input, mode)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes() {
        let cases = vec![
            ("upper", "hello world", "HELLO WORLD"),
            ("lower", "Hello World", "hello world"),
            ("proper", "hELLO wORLD", "Hello World"),
            ("title", "the lord of the rings", "The Lord of the Rings"),
            ("reverse", "abc", "cba"),
        ];

        for (mode, input, expected) in cases {
            assert_eq!(change_case(input, mode).unwrap(), expected, "mode {}", mode);
        }
        assert!(change_case("x", "shout").is_err());
    }

    #[tokio::test]
    async fn test_invoke_defaults_to_upper() {
        let mut args = ActionArgs::new();
        args.insert("input", json!("quiet"));

        let output = ChangeTextCase.invoke(args).await.unwrap();
        assert_eq!(output.into_values(), vec![json!("QUIET")]);
    }

    #[tokio::test]
    async fn test_missing_input_is_an_error() {
        let mut args = ActionArgs::new();
        args.insert("input", Value::Null);
        assert!(ChangeTextCase.invoke(args).await.is_err());
    }
}
