//! Paper session over recorded CSV bars.
//!
//! Bars up to `--at` drive entries; later 1-minute closes feed the watchers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use orbfib_core::AppConfig;
use orbfib_options_manager::{
    BracketExecutor, OrbRunner, SqliteJournal, SubmissionLedger, WatchOutcome, WebhookNotifier,
};
use orbfib_paper::{PaperGateway, ReplayMarketData, SyntheticOptionChain};
use tracing::{info, warn};

use super::parse_at;

#[derive(Args, Debug, Clone)]
pub struct PaperSessionArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// Directory holding {SYMBOL}_1m.csv and {SYMBOL}_5m.csv
    #[arg(short, long)]
    pub data_dir: PathBuf,

    /// Session clock in RFC 3339 (defaults to now)
    #[arg(long)]
    pub at: Option<String>,
}

/// Runs one paper session with an already-loaded config.
///
/// # Errors
/// Returns an error if data, journal or runner setup fails.
pub async fn run_paper_session(args: &PaperSessionArgs, config: AppConfig) -> Result<()> {
    let at = parse_at(args.at.as_deref())?;
    info!(%at, symbols = ?config.symbols, data_dir = %args.data_dir.display(), "Starting paper session");

    let market = Arc::new(
        ReplayMarketData::from_csv_dir(&args.data_dir, &config.symbols, at)
            .context("Failed to load replay data")?,
    );
    let chains = Arc::new(SyntheticOptionChain::default());
    for symbol in &config.symbols {
        match market.close_at(symbol, at).or_else(|| market.peek_price(symbol)) {
            Some(price) => chains.set_underlying(symbol, price),
            None => warn!(symbol, "No reference price; chain unavailable"),
        }
    }

    ensure_sqlite_parent(&config.journal.database_url)?;
    let journal = Arc::new(SqliteJournal::connect(&config.journal.database_url).await?);
    let executor = Arc::new(BracketExecutor::new(
        Arc::new(PaperGateway::new()),
        Arc::new(SubmissionLedger::new()),
    ));
    let notifier = Arc::new(WebhookNotifier::new(&config.notifications)?);
    let equity = config.risk.account_equity;

    let runner = Arc::new(OrbRunner::new(
        config,
        market,
        chains,
        executor,
        journal.clone(),
        notifier,
    )?);

    let interrupt = runner.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping watchers");
            interrupt.stop_watchers();
        }
    });

    let outcomes = runner.run_session(at).await;
    print_summary(&outcomes);

    journal
        .record_equity_snapshot(chrono::Utc::now(), equity)
        .await
        .context("Failed to record equity snapshot")?;
    Ok(())
}

/// Creates the directory of a file-backed SQLite URL.
fn ensure_sqlite_parent(url: &str) -> Result<()> {
    let Some(rest) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or_default();
    if file.is_empty() || file.starts_with(':') {
        return Ok(());
    }
    if let Some(parent) = std::path::Path::new(file).parent() {
        if !parent.as_os_str().is_empty() {
            info!("Creating directory for SQLite database: {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn print_summary(outcomes: &[WatchOutcome]) {
    if outcomes.is_empty() {
        println!("No positions opened.");
        return;
    }
    println!("{:<8} {:<26} {:<6} {:>5}  exit", "symbol", "option", "dir", "qty");
    for outcome in outcomes {
        let state = outcome.state();
        let exit = outcome
            .reason()
            .map_or_else(|| "open (stopped)".to_string(), |r| r.to_string());
        println!(
            "{:<8} {:<26} {:<6} {:>5}  {exit}",
            state.symbol,
            state.option_symbol,
            state.direction.as_str(),
            state.qty
        );
    }
}
