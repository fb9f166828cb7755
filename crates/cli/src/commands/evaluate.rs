//! Evaluate a bar file and print the resulting signal.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use orbfib_core::{ConfigLoader, SessionConfig};
use orbfib_paper::load_bars_csv;
use orbfib_strategy::{EngineConfig, FibOrbEngine, TradeSignal};

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// 5-minute bar CSV (timestamp,symbol,open,high,low,close,volume)
    #[arg(short, long)]
    pub bars: PathBuf,

    /// Opening range lengths in minutes, tried in order (e.g. "30,15,60")
    #[arg(long, value_delimiter = ',')]
    pub orb: Option<Vec<u32>>,

    /// Config file whose [session] section configures the engine
    #[arg(short, long)]
    pub config: Option<String>,
}

/// # Errors
/// Returns an error if the bar file or config cannot be loaded.
pub fn run_evaluate(args: &EvaluateArgs) -> Result<()> {
    match evaluate(args)? {
        Some(signal) => println!("{}", serde_json::to_string_pretty(&signal)?),
        None => println!("No signal."),
    }
    Ok(())
}

fn evaluate(args: &EvaluateArgs) -> Result<Option<TradeSignal>> {
    let session = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?.session,
        None => SessionConfig::default(),
    };
    let mut engine_config = EngineConfig::from_session(&session)?;
    if let Some(orb) = &args.orb {
        engine_config.orb_sequence.clone_from(orb);
    }

    let bars = load_bars_csv(&args.bars)
        .with_context(|| format!("Failed to load bars from {}", args.bars.display()))?;
    tracing::info!(bars = bars.len(), orb = ?engine_config.orb_sequence, "Evaluating");
    Ok(FibOrbEngine::new(engine_config).evaluate(&bars))
}
