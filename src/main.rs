// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context};
use std::env;
use std::sync::Arc;
use std::time::Instant;
use the_dataflow::backends::local::register_builtin;
use the_dataflow::config::{load_config, RunConfig, Template, TerminalRef};
use the_dataflow::engine::Engine;
use the_dataflow::registry::Registry;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: the-dataflow <engine-config> <template> [run-config] [--target NODE:TERMINAL] [--calculated]";

/// Parsed command line
struct Args {
    engine_config: String,
    template: String,
    run_config: Option<String>,
    target: Option<TerminalRef>,
    calculated: bool,
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut positional = Vec::new();
    let mut target = None;
    let mut calculated = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--target" => {
                let value = iter.next().context("--target needs a NODE:TERMINAL value")?;
                target = Some(value.parse::<TerminalRef>()?);
            }
            "--calculated" => calculated = true,
            flag if flag.starts_with("--") => bail!("unknown option {}\n{}", flag, USAGE),
            _ => positional.push(arg.clone()),
        }
    }

    let mut positional = positional.into_iter();
    let (Some(engine_config), Some(template)) = (positional.next(), positional.next()) else {
        bail!("{}", USAGE);
    };
    let run_config = positional.next();
    if positional.next().is_some() {
        bail!("too many arguments\n{}", USAGE);
    }

    Ok(Args {
        engine_config,
        template,
        run_config,
        target,
        calculated,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = env::args().skip(1).collect();
    let args = parse_args(&argv)?;
    let start_time = Instant::now();

    let engine_config = load_config(&args.engine_config)
        .with_context(|| format!("loading engine config {}", args.engine_config))?;
    let template = Template::load(&args.template)
        .with_context(|| format!("loading template {}", args.template))?;
    let run_config = match &args.run_config {
        Some(path) => RunConfig::load(path).with_context(|| format!("loading run config {}", path))?,
        None => RunConfig::new(),
    };

    let mut registry = Registry::new();
    register_builtin(&mut registry)?;
    let engine = Engine::from_config(Arc::new(registry), &engine_config).await;

    let output = if args.calculated {
        serde_json::to_value(engine.is_calculated(&template, &run_config).await?)?
    } else if let Some(target) = args.target {
        serde_json::to_value(engine.evaluate_target(&template, &run_config, target).await?.as_ref())?
    } else {
        engine.evaluate(&template, &run_config).await?.to_json()
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    let stats = engine.shutdown();
    tracing::info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        hits = stats.hits,
        misses = stats.misses,
        "done"
    );
    Ok(())
}
