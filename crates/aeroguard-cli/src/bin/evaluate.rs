//! Score a recorded telemetry file offline with the core risk engine.

use aeroguard_cli::EvaluationInput;
use aeroguard_core::{AirspaceClassifier, RiskEngine, RiskRules};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

/// Evaluate a telemetry record without a running server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON file holding a telemetry record or {telemetry, zone, weather}
    input: PathBuf,

    /// Optional JSON rule table
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Pretty-print the verdict
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let rules = match &args.rules {
        Some(path) => RiskRules::from_path(path)?,
        None => RiskRules::default(),
    };
    let engine = RiskEngine::new(rules)?;

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let input = EvaluationInput::from_json_str(&raw)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;

    let result = input.evaluate(&engine, &AirspaceClassifier::default())?;
    tracing::debug!(score = result.verdict.score, "Evaluated {}", args.input.display());

    let out = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", out);
    Ok(())
}
