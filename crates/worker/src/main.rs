use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use kino_pipeline::runner::ProcessRunner;
use kino_worker::config::WorkerConfig;
use kino_worker::steps::{run_step, Step};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Run one trailer-pipeline step: JSON in, JSON out.
#[derive(Debug, Parser)]
#[command(name = "kino-worker", version, about)]
struct Cli {
    /// Step to run.
    #[arg(value_enum)]
    step: Step,

    /// Read the step input from this file instead of stdin.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kino_worker=info,kino_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env().context("invalid worker configuration")?;

    let raw = match &cli.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading step input from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading step input from stdin")?;
            buf
        }
    };
    let input: serde_json::Value =
        serde_json::from_str(&raw).context("step input is not valid JSON")?;

    let runner = ProcessRunner::new(config.command_timeout);
    let output = run_step(cli.step, input, &config, &runner)
        .await
        .with_context(|| format!("step {} failed", cli.step.name()))?;

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");

    Ok(())
}
