// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::RegistryError;
use crate::registry::{Module, ParamKind, Parameter, Terminal};
use crate::traits::{Action, ActionArgs, ActionOutput};

use super::DOCUMENT;

/// Load action - reads each listed file as one document.
///
/// Not cacheable: the files may change between evaluations, so everything
/// downstream is recomputed on every run.
pub struct LoadText;

pub fn module() -> Result<Module, RegistryError> {
    Module::builder("text.load", "1.0")
        .name("Load")
        .description("Read text files, one document per file")
        .output(Terminal::multiple("output", DOCUMENT))
        .field(
            Parameter::new("files", ParamKind::list(ParamKind::Str))
                .with_default(json!([]))
                .describe("paths of the files to read"),
        )
        .cacheable(false)
        .action(LoadText)
        .build()
}

#[async_trait]
impl Action for LoadText {
    async fn invoke(&self, args: ActionArgs) -> anyhow::Result<ActionOutput> {
        let mut documents = Vec::new();
        let files = match args.get("files") {
            Some(_) => args.get_array("files")?.clone(),
            None => Vec::new(),
        };
        for file in &files {
            let path = file.as_str().context("file path is not a string")?;
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path))?;
            documents.push(Value::String(text));
        }
        Ok(ActionOutput::single(Value::Array(documents)))
    }
}
