// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::RegistryError;
use crate::registry::{Module, ParamKind, Parameter, Terminal};
use crate::traits::{Action, ActionArgs, ActionOutput};

use super::DOCUMENT;

/// Join action - concatenates every delivered document into one
pub struct JoinText;

pub fn module() -> Result<Module, RegistryError> {
    Module::builder("text.join", "1.0")
        .name("Join")
        .description("Concatenate all documents into a single document")
        .input(Terminal::multiple("input", DOCUMENT))
        .output(Terminal::single("output", DOCUMENT))
        .field(Parameter::new("separator", ParamKind::Str).with_default(json!("\n")))
        .action(JoinText)
        .build()
}

#[async_trait]
impl Action for JoinText {
    async fn invoke(&self, args: ActionArgs) -> anyhow::Result<ActionOutput> {
        let separator = args.str_or("separator", "\n")?;
        let parts = args
            .get_array("input")?
            .iter()
            .enumerate()
            .map(|(i, v)| v.as_str().with_context(|| format!("document {} is not text", i)))
            .collect::<anyhow::Result<Vec<&str>>>()?;
        Ok(ActionOutput::single(Value::String(parts.join(separator))))
    }
}
