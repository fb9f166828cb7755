//! CLI commands for the ORB/Fibonacci options trader.

pub mod evaluate;
pub mod export_journal;
pub mod paper_session;

pub use evaluate::{run_evaluate, EvaluateArgs};
pub use export_journal::{run_export_journal, ExportJournalArgs};
pub use paper_session::{run_paper_session, PaperSessionArgs};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Parses an RFC 3339 timestamp, defaulting to now.
pub(crate) fn parse_at(at: Option<&str>) -> Result<DateTime<Utc>> {
    at.map_or_else(
        || Ok(Utc::now()),
        |s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("Invalid --at '{s}'. Use RFC 3339, e.g. 2024-01-05T15:30:00Z"))
        },
    )
}
