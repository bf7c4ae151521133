// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::RegistryError;
use crate::registry::{Module, Terminal};
use crate::traits::{Action, ActionArgs, ActionOutput};

use super::{DOCUMENT, STATS};

/// Token Counter action - character, word and line counts per document
pub struct TokenCounter;

#[derive(Debug, Serialize, PartialEq)]
pub struct TokenCount {
    pub chars: usize,
    pub words: usize,
    pub lines: usize,
}

impl TokenCount {
    pub fn of(text: &str) -> Self {
        Self {
            chars: text.chars().count(),
            words: text.split_whitespace().count(),
            lines: text.lines().count().max(1),
        }
    }
}

pub fn module() -> Result<Module, RegistryError> {
    Module::builder("text.count", "1.0")
        .name("Count Tokens")
        .description("Count characters, words and lines of each document")
        .input(Terminal::single("input", DOCUMENT))
        .output(Terminal::single("output", STATS))
        .action(TokenCounter)
        .build()
}

#[async_trait]
impl Action for TokenCounter {
    async fn invoke(&self, args: ActionArgs) -> anyhow::Result<ActionOutput> {
        let input = args.get_str("input")?;
        Ok(ActionOutput::single(serde_json::to_value(TokenCount::of(input))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counts() {
        assert_eq!(
            TokenCount::of("hello world\nfrom alpha\n"),
            TokenCount {
                chars: 23,
                words: 4,
                lines: 2
            }
        );
        assert_eq!(TokenCount::of("").lines, 1);
    }

    #[tokio::test]
    async fn test_invoke_returns_object() {
        let mut args = ActionArgs::new();
        args.insert("input", json!("one two"));

        let output = TokenCounter.invoke(args).await.unwrap();
        assert_eq!(
            output.into_values(),
            vec![json!({"chars": 7, "words": 2, "lines": 1})]
        );
    }
}
