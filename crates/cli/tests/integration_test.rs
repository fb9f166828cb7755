use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use orbfib_core::{AppConfig, TradeJournal};
use orbfib_options_manager::{
    export_csv, BracketExecutor, LogNotifier, OrbRunner, SqliteJournal, SubmissionLedger,
};
use orbfib_paper::{PaperGateway, ReplayMarketData, SyntheticOptionChain};

fn ny(h: u32, m: u32) -> DateTime<Utc> {
    chrono_tz::America::New_York
        .with_ymd_and_hms(2024, 3, 8, h, m, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn write_csv(path: &Path, rows: &[(DateTime<Utc>, &str, &str, &str, &str)]) {
    let mut body = String::from("timestamp,symbol,open,high,low,close,volume\n");
    for (ts, o, h, l, c) in rows {
        writeln!(body, "{},SPY,{o},{h},{l},{c},1000", ts.to_rfc3339()).unwrap();
    }
    std::fs::write(path, body).unwrap();
}

/// Flat open, a breakout at 10:05, a retest at 10:10, then a rally after 10:15.
fn write_breakout_day(dir: &Path) {
    let mut one: Vec<_> = (0..40)
        .map(|i| (ny(9, 30) + Duration::minutes(i), "100", "100", "100", "100"))
        .collect();
    one.push((ny(10, 16), "106", "106", "106", "106"));
    one.push((ny(10, 17), "200", "200", "200", "200"));
    write_csv(&dir.join("SPY_1m.csv"), &one);

    let mut five: Vec<_> = (0..7)
        .map(|i| (ny(9, 30) + Duration::minutes(5 * i), "100", "100", "100", "100"))
        .collect();
    five.push((ny(10, 5), "100", "111", "100", "111"));
    five.push((ny(10, 10), "105", "106", "104", "105"));
    write_csv(&dir.join("SPY_5m.csv"), &five);
}

#[tokio::test]
async fn csv_day_trades_and_exports_journal() {
    let data = tempfile::tempdir().unwrap();
    write_breakout_day(data.path());
    let at = ny(10, 15);

    let mut config = AppConfig::default();
    config.symbols = vec!["SPY".to_string()];
    config.watcher.poll_min_ms = 0;
    config.watcher.poll_max_ms = 0;

    let market = Arc::new(ReplayMarketData::from_csv_dir(data.path(), &config.symbols, at).unwrap());
    let chains = Arc::new(SyntheticOptionChain::default());
    chains.set_underlying("SPY", market.close_at("SPY", at).unwrap());

    let db = data.path().join("journal.db");
    let journal = Arc::new(
        SqliteJournal::connect(&format!("sqlite://{}?mode=rwc", db.display()))
            .await
            .unwrap(),
    );
    let executor = Arc::new(BracketExecutor::new(
        Arc::new(PaperGateway::new()),
        Arc::new(SubmissionLedger::new()),
    ));
    let runner = OrbRunner::new(
        config,
        market,
        chains,
        executor,
        journal.clone(),
        Arc::new(LogNotifier),
    )
    .unwrap();

    let outcomes = runner.run_session(at).await;
    assert_eq!(outcomes.len(), 1);

    let rows = journal.all_trades().await.unwrap();
    assert_eq!(rows.len(), 1);
    let out = data.path().join("trades.csv");
    export_csv(&rows, &out).unwrap();

    let text = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("trade_id,date,symbol"));
    assert!(lines[1].contains("2024-03-08,SPY,30,long"));
    assert!(lines[1].contains("runner"));
}

#[test]
fn missing_bar_files_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let result = ReplayMarketData::from_csv_dir(dir.path(), &["QQQ".to_string()], Utc::now());
    assert!(result.is_err());
}
