//! End-to-end tests for the position ledger

use std::sync::Arc;

use chrono::Utc;
use copy_ledger::breaker::CircuitBreaker;
use copy_ledger::config::EngineConfig;
use copy_ledger::error::{Error, ErrorKind};
use copy_ledger::events::LedgerEvent;
use copy_ledger::ledger::Ledger;
use copy_ledger::registry::StaticPriceSource;
use copy_ledger::settlement::SCALE;
use copy_ledger::transfer::RecordingTransfer;

fn engine_config() -> EngineConfig {
    EngineConfig {
        fee_bps: 100,
        min_open_amount: 1,
        max_open_amount: 100 * SCALE,
        min_sell_amount: 1,
    }
}

#[test]
fn test_full_lifecycle_with_price_move() {
    let breaker = Arc::new(CircuitBreaker::new());
    let transfer = Arc::new(RecordingTransfer::new());
    let mut ledger = Ledger::new(engine_config(), breaker, transfer.clone());

    let source = Arc::new(StaticPriceSource::new("feed-x", 100));
    ledger.register_asset("X", source.clone()).unwrap();
    ledger.fund(10 * SCALE).unwrap();

    let index = ledger.open("alice", "X", SCALE, Utc::now()).unwrap();
    assert_eq!(ledger.active_investment("alice", "X"), SCALE);

    source.set_price(150);
    assert_eq!(ledger.unrealized_pnl("alice").unwrap(), (SCALE / 2) as i128);

    let pnl = ledger.close_by_index("alice", index).unwrap();
    assert_eq!(pnl, (SCALE / 2) as i128);
    // payout = 1.0 + 0.5 - 1% of 0.5
    assert_eq!(
        transfer.total_sent_to("alice"),
        SCALE + SCALE / 2 - SCALE / 200
    );
    assert_eq!(ledger.active_investment("alice", "X"), 0);

    let events = ledger.take_events();
    assert!(events.iter().any(|e| matches!(
        e,
        LedgerEvent::PositionOpened { account, .. } if account == "alice"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        LedgerEvent::PositionClosed { exit_price: 150, .. }
    )));
}

#[test]
fn test_partial_sell_walkthrough() {
    // Two positions of Y, amounts 2 and 3, flat price: selling 4 consumes
    // the first entirely and 2 of the second, aggregate pnl 0.
    let breaker = Arc::new(CircuitBreaker::new());
    let transfer = Arc::new(RecordingTransfer::new());
    let mut ledger = Ledger::new(engine_config(), breaker, transfer.clone());
    ledger
        .register_asset("Y", Arc::new(StaticPriceSource::new("feed-y", 100)))
        .unwrap();
    ledger.fund(10 * SCALE).unwrap();

    ledger.open("alice", "Y", 2 * SCALE, Utc::now()).unwrap();
    ledger.open("alice", "Y", 3 * SCALE, Utc::now()).unwrap();

    let pnl = ledger.partial_sell("alice", "Y", 4 * SCALE).unwrap();
    assert_eq!(pnl, 0);
    assert_eq!(transfer.total_sent_to("alice"), 4 * SCALE);

    let positions = ledger.positions("alice");
    assert!(!positions[0].active);
    assert!(positions[1].active);
    assert_eq!(positions[1].invested, SCALE);
}

#[test]
fn test_partial_sell_payout_close_to_full_close() {
    // Selling a position in two chunks loses at most one unit per chunk to
    // truncation versus closing it outright.
    let breaker = Arc::new(CircuitBreaker::new());

    let sold = {
        let transfer = Arc::new(RecordingTransfer::new());
        let mut ledger = Ledger::new(engine_config(), breaker.clone(), transfer.clone());
        let source = Arc::new(StaticPriceSource::new("feed-y", 100));
        ledger.register_asset("Y", source.clone()).unwrap();
        ledger.fund(100 * SCALE).unwrap();
        ledger.open("alice", "Y", 1_000_003, Utc::now()).unwrap();
        source.set_price(137);
        ledger.partial_sell("alice", "Y", 600_000).unwrap();
        ledger.partial_sell("alice", "Y", 400_003).unwrap();
        transfer.total_sent_to("alice")
    };

    let closed = {
        let transfer = Arc::new(RecordingTransfer::new());
        let mut ledger = Ledger::new(engine_config(), breaker.clone(), transfer.clone());
        let source = Arc::new(StaticPriceSource::new("feed-y", 100));
        ledger.register_asset("Y", source.clone()).unwrap();
        ledger.fund(100 * SCALE).unwrap();
        let index = ledger.open("alice", "Y", 1_000_003, Utc::now()).unwrap();
        source.set_price(137);
        ledger.close_by_index("alice", index).unwrap();
        transfer.total_sent_to("alice")
    };

    assert!(sold <= closed);
    assert!(closed - sold <= 2, "chunk truncation exceeded one unit per chunk");
}

#[test]
fn test_error_kinds_surface_to_callers() {
    let breaker = Arc::new(CircuitBreaker::new());
    let transfer = Arc::new(RecordingTransfer::new());
    let mut ledger = Ledger::new(engine_config(), breaker.clone(), transfer);

    assert_eq!(
        ledger.open("alice", "X", SCALE, Utc::now()).unwrap_err().kind(),
        ErrorKind::Validation
    );

    ledger
        .register_asset("X", Arc::new(StaticPriceSource::new("feed-x", 100)))
        .unwrap();
    assert_eq!(
        ledger.close_by_index("alice", 0).unwrap_err().kind(),
        ErrorKind::State
    );

    breaker.engage();
    assert_eq!(
        ledger.open("alice", "X", SCALE, Utc::now()),
        Err(Error::Halted)
    );
}
