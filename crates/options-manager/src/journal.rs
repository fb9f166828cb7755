//! Trade journal backends and CSV export.
//!
//! Prices are stored as decimal strings so they round-trip exactly.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use orbfib_core::{ExitLeg, ExitRecord, JournalRow, LimitsState, TradeJournal, TradeRecord};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Column order of the `trades` table and of exported CSV files.
pub const TRADE_COLUMNS: [&str; 25] = [
    "trade_id",
    "date",
    "symbol",
    "orb_len",
    "direction",
    "A",
    "B",
    "entry_level",
    "entry_ts",
    "entry_under_px",
    "stop_under_px",
    "t1_under_px",
    "t2_under_px",
    "option_sym",
    "qty",
    "entry_opt_px",
    "hard_stop_opt_px",
    "exit1_ts",
    "exit1_px",
    "exit2_ts",
    "exit2_px",
    "pnl_usd",
    "pnl_pct",
    "exit_reason",
    "notes",
];

const SCHEMA: [&str; 3] = [
    r"
    CREATE TABLE IF NOT EXISTS trades (
        trade_id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        symbol TEXT NOT NULL,
        orb_len INTEGER NOT NULL,
        direction TEXT NOT NULL,
        A TEXT NOT NULL,
        B TEXT NOT NULL,
        entry_level TEXT NOT NULL,
        entry_ts TEXT NOT NULL,
        entry_under_px TEXT NOT NULL,
        stop_under_px TEXT NOT NULL,
        t1_under_px TEXT NOT NULL,
        t2_under_px TEXT NOT NULL,
        option_sym TEXT NOT NULL,
        qty INTEGER NOT NULL,
        entry_opt_px TEXT NOT NULL,
        hard_stop_opt_px TEXT NOT NULL,
        exit1_ts TEXT,
        exit1_px TEXT,
        exit2_ts TEXT,
        exit2_px TEXT,
        pnl_usd TEXT,
        pnl_pct TEXT,
        exit_reason TEXT NOT NULL DEFAULT '',
        notes TEXT NOT NULL DEFAULT ''
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS limits_state (
        date TEXT PRIMARY KEY,
        trades_taken INTEGER NOT NULL DEFAULT 0,
        mtd_pnl TEXT NOT NULL DEFAULT '0',
        daily_loss_hit INTEGER NOT NULL DEFAULT 0
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS equity_snapshots (
        ts TEXT NOT NULL,
        equity_usd TEXT NOT NULL
    )
    ",
];

/// `SQLite` journal with the `trades`, `limits_state` and `equity_snapshots` tables.
#[derive(Clone)]
pub struct SqliteJournal {
    pool: SqlitePool,
}

impl SqliteJournal {
    /// Connects and creates missing tables.
    ///
    /// # Errors
    ///
    /// Returns error if the connection or table creation fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        // a second connection to `sqlite::memory:` would open a separate database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to open journal at {database_url}"))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .context("Failed to create journal tables")?;
        }

        tracing::debug!(database_url, "Journal ready");
        Ok(Self { pool })
    }

    /// Appends an account equity snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    pub async fn record_equity_snapshot(&self, ts: DateTime<Utc>, equity: Decimal) -> Result<()> {
        sqlx::query("INSERT INTO equity_snapshots (ts, equity_usd) VALUES (?1, ?2)")
            .bind(ts.to_rfc3339())
            .bind(equity.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Snapshots in insertion order.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails or a stored value does not parse.
    pub async fn equity_snapshots(&self) -> Result<Vec<(DateTime<Utc>, Decimal)>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT ts, equity_usd FROM equity_snapshots ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|(ts, equity)| Ok((parse_ts(&ts)?, parse_decimal(&equity)?)))
            .collect()
    }
}

#[async_trait]
impl TradeJournal for SqliteJournal {
    async fn limits_state(&self, date: NaiveDate) -> Result<LimitsState> {
        let row = sqlx::query_as::<_, (i64, String, bool)>(
            "SELECT trades_taken, mtd_pnl, daily_loss_hit FROM limits_state WHERE date = ?1",
        )
        .bind(date.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some((trades_taken, mtd_pnl, daily_loss_hit)) = row else {
            return Ok(LimitsState::default());
        };
        Ok(LimitsState {
            trades_taken: u32::try_from(trades_taken).unwrap_or(u32::MAX),
            mtd_pnl: parse_decimal(&mtd_pnl)?,
            daily_loss_hit,
        })
    }

    async fn mark_daily_loss_hit(&self, date: NaiveDate) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO limits_state (date, daily_loss_hit) VALUES (?1, 1)
            ON CONFLICT(date) DO UPDATE SET daily_loss_hit = 1
            ",
        )
        .bind(date.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_trade(&self, trade: &TradeRecord) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            INSERT INTO trades (
                date, symbol, orb_len, direction, A, B, entry_level, entry_ts, entry_under_px,
                stop_under_px, t1_under_px, t2_under_px, option_sym, qty, entry_opt_px,
                hard_stop_opt_px, exit_reason, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            ",
        )
        .bind(trade.trade_date.to_string())
        .bind(&trade.symbol)
        .bind(i64::from(trade.orb_len))
        .bind(trade.direction.as_str())
        .bind(trade.anchor_a.to_string())
        .bind(trade.anchor_b.to_string())
        .bind(&trade.entry_level)
        .bind(trade.entry_ts.to_rfc3339())
        .bind(trade.entry_under_px.to_string())
        .bind(trade.stop_under_px.to_string())
        .bind(trade.t1_under_px.to_string())
        .bind(trade.t2_under_px.to_string())
        .bind(&trade.option_sym)
        .bind(i64::from(trade.qty))
        .bind(trade.entry_opt_px.to_string())
        .bind(trade.hard_stop_opt_px.to_string())
        .bind(&trade.exit_reason)
        .bind(&trade.notes)
        .execute(&mut *tx)
        .await
        .context("Failed to insert trade")?;

        sqlx::query(
            r"
            INSERT INTO limits_state (date, trades_taken) VALUES (?1, 1)
            ON CONFLICT(date) DO UPDATE SET trades_taken = trades_taken + 1
            ",
        )
        .bind(trade.trade_date.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let trade_id = result.last_insert_rowid();
        tracing::info!(trade_id, symbol = trade.symbol, "Recorded trade");
        Ok(trade_id)
    }

    async fn record_exit(&self, exit: &ExitRecord) -> Result<()> {
        let (ts_col, px_col) = match exit.leg {
            ExitLeg::Partial => ("exit1_ts", "exit1_px"),
            ExitLeg::Final => ("exit2_ts", "exit2_px"),
        };
        let query = format!(
            r"
            UPDATE trades SET
                {ts_col} = ?1,
                {px_col} = ?2,
                pnl_usd = COALESCE(?3, pnl_usd),
                pnl_pct = COALESCE(?4, pnl_pct),
                exit_reason = COALESCE(?5, exit_reason)
            WHERE trade_id = ?6
            "
        );
        let result = sqlx::query(&query)
            .bind(exit.ts.to_rfc3339())
            .bind(exit.price.to_string())
            .bind(exit.pnl_usd.map(|v| v.to_string()))
            .bind(exit.pnl_pct.map(|v| v.to_string()))
            .bind(exit.reason.as_deref())
            .bind(exit.trade_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("No trade with id {}", exit.trade_id));
        }
        Ok(())
    }

    async fn update_mtd_pnl(&self, date: NaiveDate, pnl_delta: Decimal) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, (String,)>(
            "SELECT mtd_pnl FROM limits_state WHERE date = ?1",
        )
        .bind(date.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        let current = match current {
            Some((value,)) => parse_decimal(&value)?,
            None => Decimal::ZERO,
        };

        sqlx::query(
            r"
            INSERT INTO limits_state (date, mtd_pnl) VALUES (?1, ?2)
            ON CONFLICT(date) DO UPDATE SET mtd_pnl = excluded.mtd_pnl
            ",
        )
        .bind(date.to_string())
        .bind((current + pnl_delta).to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn all_trades(&self) -> Result<Vec<JournalRow>> {
        let rows = sqlx::query("SELECT * FROM trades ORDER BY trade_id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_journal).collect()
    }
}

fn row_to_journal(row: &SqliteRow) -> Result<JournalRow> {
    let date: String = row.try_get("date")?;
    let direction: String = row.try_get("direction")?;
    let trade = TradeRecord {
        trade_date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("Bad trade date {date}"))?,
        symbol: row.try_get("symbol")?,
        orb_len: u32::try_from(row.try_get::<i64, _>("orb_len")?)?,
        direction: direction.parse().map_err(|e: String| anyhow!(e))?,
        anchor_a: decimal_col(row, "A")?,
        anchor_b: decimal_col(row, "B")?,
        entry_level: row.try_get("entry_level")?,
        entry_ts: parse_ts(&row.try_get::<String, _>("entry_ts")?)?,
        entry_under_px: decimal_col(row, "entry_under_px")?,
        stop_under_px: decimal_col(row, "stop_under_px")?,
        t1_under_px: decimal_col(row, "t1_under_px")?,
        t2_under_px: decimal_col(row, "t2_under_px")?,
        option_sym: row.try_get("option_sym")?,
        qty: u32::try_from(row.try_get::<i64, _>("qty")?)?,
        entry_opt_px: decimal_col(row, "entry_opt_px")?,
        hard_stop_opt_px: decimal_col(row, "hard_stop_opt_px")?,
        exit_reason: row.try_get("exit_reason")?,
        notes: row.try_get("notes")?,
    };

    Ok(JournalRow {
        trade_id: row.try_get("trade_id")?,
        trade,
        exit1_ts: optional_ts_col(row, "exit1_ts")?,
        exit1_px: optional_decimal_col(row, "exit1_px")?,
        exit2_ts: optional_ts_col(row, "exit2_ts")?,
        exit2_px: optional_decimal_col(row, "exit2_px")?,
        pnl_usd: optional_decimal_col(row, "pnl_usd")?,
        pnl_pct: optional_decimal_col(row, "pnl_pct")?,
    })
}

fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value).with_context(|| format!("Bad decimal {value}"))
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Bad timestamp {value}"))?
        .with_timezone(&Utc))
}

fn decimal_col(row: &SqliteRow, column: &str) -> Result<Decimal> {
    parse_decimal(&row.try_get::<String, _>(column)?)
}

fn optional_decimal_col(row: &SqliteRow, column: &str) -> Result<Option<Decimal>> {
    row.try_get::<Option<String>, _>(column)?
        .as_deref()
        .map(parse_decimal)
        .transpose()
}

fn optional_ts_col(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
    row.try_get::<Option<String>, _>(column)?
        .as_deref()
        .map(parse_ts)
        .transpose()
}

/// Journal kept in memory, for paper runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    trades: Vec<JournalRow>,
    limits: HashMap<NaiveDate, LimitsState>,
}

impl InMemoryJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradeJournal for InMemoryJournal {
    async fn limits_state(&self, date: NaiveDate) -> Result<LimitsState> {
        Ok(self.inner.lock().limits.get(&date).copied().unwrap_or_default())
    }

    async fn mark_daily_loss_hit(&self, date: NaiveDate) -> Result<()> {
        self.inner.lock().limits.entry(date).or_default().daily_loss_hit = true;
        Ok(())
    }

    async fn record_trade(&self, trade: &TradeRecord) -> Result<i64> {
        let mut inner = self.inner.lock();
        let trade_id = i64::try_from(inner.trades.len())? + 1;
        inner.trades.push(JournalRow {
            trade_id,
            trade: trade.clone(),
            exit1_ts: None,
            exit1_px: None,
            exit2_ts: None,
            exit2_px: None,
            pnl_usd: None,
            pnl_pct: None,
        });
        inner.limits.entry(trade.trade_date).or_default().trades_taken += 1;
        Ok(trade_id)
    }

    async fn record_exit(&self, exit: &ExitRecord) -> Result<()> {
        let mut inner = self.inner.lock();
        let row = inner
            .trades
            .iter_mut()
            .find(|r| r.trade_id == exit.trade_id)
            .ok_or_else(|| anyhow!("No trade with id {}", exit.trade_id))?;
        match exit.leg {
            ExitLeg::Partial => {
                row.exit1_ts = Some(exit.ts);
                row.exit1_px = Some(exit.price);
            }
            ExitLeg::Final => {
                row.exit2_ts = Some(exit.ts);
                row.exit2_px = Some(exit.price);
            }
        }
        if exit.pnl_usd.is_some() {
            row.pnl_usd = exit.pnl_usd;
        }
        if exit.pnl_pct.is_some() {
            row.pnl_pct = exit.pnl_pct;
        }
        if let Some(reason) = &exit.reason {
            row.trade.exit_reason.clone_from(reason);
        }
        Ok(())
    }

    async fn update_mtd_pnl(&self, date: NaiveDate, pnl_delta: Decimal) -> Result<()> {
        self.inner.lock().limits.entry(date).or_default().mtd_pnl += pnl_delta;
        Ok(())
    }

    async fn all_trades(&self) -> Result<Vec<JournalRow>> {
        Ok(self.inner.lock().trades.clone())
    }
}

/// Writes journal rows to `path` as CSV with [`TRADE_COLUMNS`] as header.
///
/// # Errors
///
/// Returns error if the file cannot be written.
pub fn export_csv(rows: &[JournalRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(TRADE_COLUMNS)?;

    let opt = |v: Option<String>| v.unwrap_or_default();
    for row in rows {
        let t = &row.trade;
        writer.write_record([
            row.trade_id.to_string(),
            t.trade_date.to_string(),
            t.symbol.clone(),
            t.orb_len.to_string(),
            t.direction.to_string(),
            t.anchor_a.to_string(),
            t.anchor_b.to_string(),
            t.entry_level.clone(),
            t.entry_ts.to_rfc3339(),
            t.entry_under_px.to_string(),
            t.stop_under_px.to_string(),
            t.t1_under_px.to_string(),
            t.t2_under_px.to_string(),
            t.option_sym.clone(),
            t.qty.to_string(),
            t.entry_opt_px.to_string(),
            t.hard_stop_opt_px.to_string(),
            opt(row.exit1_ts.map(|ts| ts.to_rfc3339())),
            opt(row.exit1_px.map(|p| p.to_string())),
            opt(row.exit2_ts.map(|ts| ts.to_rfc3339())),
            opt(row.exit2_px.map(|p| p.to_string())),
            opt(row.pnl_usd.map(|p| p.to_string())),
            opt(row.pnl_pct.map(|p| p.to_string())),
            t.exit_reason.clone(),
            t.notes.clone(),
        ])?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = rows.len(), "Exported journal");
    Ok(())
}
