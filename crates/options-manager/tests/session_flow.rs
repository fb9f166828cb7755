use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use orbfib_core::{AppConfig, Bar, Direction, Timeframe, TradeJournal};
use orbfib_options_manager::{
    BracketExecutor, ExitReason, InMemoryJournal, LogNotifier, OrbRunner, SubmissionLedger,
};
use orbfib_paper::{PaperEvent, PaperGateway, ReplayMarketData, SyntheticOptionChain};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn ny(h: u32, m: u32) -> DateTime<Utc> {
    chrono_tz::America::New_York
        .with_ymd_and_hms(2024, 3, 8, h, m, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn flat(count: usize, step_minutes: i64, price: Decimal) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let ts = ny(9, 30) + Duration::minutes(step_minutes * i as i64);
            Bar::new(ts, price, price, price, price, 500)
        })
        .collect()
}

/// Quiet 30-minute range at 100, a breakout to 111, then a retest near 105.
fn breakout_day(tape: Vec<Decimal>) -> ReplayMarketData {
    let mut five = flat(7, 5, dec!(100));
    five.push(Bar::new(ny(10, 5), dec!(100), dec!(111), dec!(100), dec!(111), 2_000));
    five.push(Bar::new(ny(10, 10), dec!(105), dec!(106), dec!(104), dec!(105), 2_000));
    ReplayMarketData::new()
        .with_bars("SPY", Timeframe::OneMinute, flat(40, 1, dec!(100)))
        .with_bars("SPY", Timeframe::FiveMinute, five)
        .with_tape("SPY", tape)
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.symbols = vec!["SPY".to_string()];
    config.session.latest_entry_time = None;
    config.watcher.poll_min_ms = 0;
    config.watcher.poll_max_ms = 0;
    config
}

struct Harness {
    runner: OrbRunner,
    gateway: Arc<PaperGateway>,
    journal: Arc<InMemoryJournal>,
}

fn harness(config: AppConfig, market: ReplayMarketData) -> Harness {
    let chains = Arc::new(SyntheticOptionChain::default());
    chains.set_underlying("SPY", dec!(105.2));
    let gateway = Arc::new(PaperGateway::new());
    let journal = Arc::new(InMemoryJournal::new());
    let executor = Arc::new(BracketExecutor::new(
        gateway.clone(),
        Arc::new(SubmissionLedger::new()),
    ));
    let runner = OrbRunner::new(
        config,
        Arc::new(market),
        chains,
        executor,
        journal.clone(),
        Arc::new(LogNotifier),
    )
    .unwrap();
    Harness {
        runner,
        gateway,
        journal,
    }
}

#[tokio::test]
async fn breakout_session_enters_once_and_exits_on_runner() {
    let h = harness(config(), breakout_day(vec![dec!(106), dec!(200)]));

    let outcomes = h.runner.run_session(ny(10, 15)).await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].reason(), Some(ExitReason::Runner));
    assert_eq!(outcomes[0].state().direction, Direction::Long);

    let orders = h.gateway.submitted_orders();
    assert_eq!(orders.len(), 1);
    assert!(orders[0].option_symbol.starts_with("SPY_20240308_C"));
    assert!(orders[0].quantity > 0);
    assert!(orders[0].take_profit_price.is_none());
    assert!(h
        .gateway
        .events()
        .iter()
        .any(|e| matches!(e, PaperEvent::Closed { quantity: None, .. })));

    let rows = h.journal.all_trades().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].trade.orb_len, 30);
    assert_eq!(rows[0].trade.exit_reason, "runner");
    assert_eq!(rows[0].exit2_px, Some(dec!(200)));

    let date = ny(10, 15).date_naive();
    assert!(h.runner.is_locked("SPY", date));
    assert!(h.runner.run_for_symbol("SPY", ny(10, 20)).await.unwrap().is_none());
    assert_eq!(h.gateway.submitted_orders().len(), 1);
    assert_eq!(h.journal.limits_state(date).await.unwrap().trades_taken, 1);
}

#[tokio::test]
async fn rejected_orders_fall_through_every_range_length() {
    let h = harness(config(), breakout_day(vec![dec!(106)]));
    h.gateway
        .reject_submissions(Some("insufficient buying power".to_string()));

    let handle = h.runner.run_for_symbol("SPY", ny(10, 15)).await.unwrap();
    assert!(handle.is_none());
    assert!(h.journal.all_trades().await.unwrap().is_empty());
    assert!(!h.runner.is_locked("SPY", ny(10, 15).date_naive()));
}

#[tokio::test]
async fn guards_block_entries() {
    let mut late = config();
    late.session.latest_entry_time = chrono::NaiveTime::from_hms_opt(10, 0, 0);
    let h = harness(late, breakout_day(vec![dec!(106)]));
    assert!(h.runner.market_guard(ny(10, 15)).is_none());
    assert!(h.runner.market_guard(ny(9, 45)).is_some());

    let h = harness(config(), breakout_day(vec![dec!(106)]));
    let saturday = ny(10, 15) + Duration::days(1);
    assert!(h.runner.run_for_symbol("SPY", saturday).await.unwrap().is_none());
    assert!(h.runner.run_for_symbol("SPY", ny(16, 30)).await.unwrap().is_none());

    h.journal
        .mark_daily_loss_hit(ny(10, 15).date_naive())
        .await
        .unwrap();
    assert!(h.runner.run_for_symbol("SPY", ny(10, 15)).await.unwrap().is_none());
    assert!(h.gateway.events().is_empty());
}

#[tokio::test]
async fn stop_watchers_leaves_position_open() {
    let h = harness(config(), breakout_day(vec![dec!(106)]));
    let handle = h
        .runner
        .run_for_symbol("SPY", ny(10, 15))
        .await
        .unwrap()
        .expect("entry placed");

    h.runner.stop_watchers();
    let outcome = handle.await.unwrap();
    assert!(outcome.reason().is_none());
    assert!(!h
        .gateway
        .events()
        .iter()
        .any(|e| matches!(e, PaperEvent::Closed { .. })));
}
