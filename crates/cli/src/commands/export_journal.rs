//! Export the trade journal to CSV.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use orbfib_core::TradeJournal;
use orbfib_options_manager::{export_csv, SqliteJournal};

#[derive(Args, Debug, Clone)]
pub struct ExportJournalArgs {
    /// Journal database URL
    #[arg(long, env = "ORBFIB_JOURNAL__DATABASE_URL", default_value = "sqlite://journal.db?mode=rwc")]
    pub database: String,

    /// Output CSV path
    #[arg(short, long)]
    pub out: PathBuf,
}

/// # Errors
/// Returns an error if the journal cannot be read or the file written.
pub async fn run_export_journal(args: &ExportJournalArgs) -> Result<()> {
    let journal = SqliteJournal::connect(&args.database).await?;
    let rows = journal.all_trades().await?;
    export_csv(&rows, &args.out)?;
    println!("Exported {} trades to {}", rows.len(), args.out.display());
    Ok(())
}
