//! End-to-end tests for copy-trading delegation

use std::sync::Arc;

use chrono::Utc;
use copy_ledger::breaker::CircuitBreaker;
use copy_ledger::config::EngineConfig;
use copy_ledger::copy::CopyDesk;
use copy_ledger::error::Error;
use copy_ledger::ledger::Ledger;
use copy_ledger::registry::StaticPriceSource;
use copy_ledger::transfer::RecordingTransfer;

struct World {
    ledger: Ledger,
    desk: CopyDesk,
    source: Arc<StaticPriceSource>,
    transfer: Arc<RecordingTransfer>,
    breaker: Arc<CircuitBreaker>,
}

fn world() -> World {
    let breaker = Arc::new(CircuitBreaker::new());
    let transfer = Arc::new(RecordingTransfer::new());
    let config = EngineConfig {
        fee_bps: 100,
        min_open_amount: 1,
        max_open_amount: 1_000_000,
        min_sell_amount: 1,
    };
    let mut ledger = Ledger::new(config, breaker.clone(), transfer.clone());
    let source = Arc::new(StaticPriceSource::new("feed-y", 100));
    ledger.register_asset("Y", source.clone()).unwrap();
    // House liquidity so profitable exits can settle above deposits.
    ledger.fund(1_000_000).unwrap();

    let mut desk = CopyDesk::new(breaker.clone());
    desk.roles_mut().grant("automation");

    World {
        ledger,
        desk,
        source,
        transfer,
        breaker,
    }
}

#[test]
fn test_copy_trade_walkthrough() {
    // Follower deposits 10, follows at 50%; automation mirrors a buy of 10.
    let mut w = world();
    w.desk.deposit(&mut w.ledger, "fred", 10).unwrap();
    w.desk.follow("fred", "tina", 50).unwrap();

    w.desk
        .execute_copy_trade(&mut w.ledger, "automation", "fred", "tina", "Y", 10, Utc::now())
        .unwrap();

    assert_eq!(w.desk.pooled_balance("fred"), 5);
    assert_eq!(w.desk.vault_position("fred", "Y"), 5);
    assert_eq!(w.ledger.active_investment("fred", "Y"), 5);
}

#[test]
fn test_copy_trade_insufficient_pool_is_a_no_op() {
    let mut w = world();
    w.desk.deposit(&mut w.ledger, "fred", 4).unwrap();
    w.desk.follow("fred", "tina", 50).unwrap();

    let err = w
        .desk
        .execute_copy_trade(&mut w.ledger, "automation", "fred", "tina", "Y", 10, Utc::now())
        .unwrap_err();
    assert_eq!(
        err,
        Error::InsufficientBalance {
            available: 4,
            required: 5
        }
    );
    assert_eq!(w.desk.pooled_balance("fred"), 4);
    assert_eq!(w.ledger.active_investment("fred", "Y"), 0);
}

#[test]
fn test_copy_sell_realizes_profit_for_follower() {
    let mut w = world();
    w.desk.deposit(&mut w.ledger, "fred", 1_000).unwrap();
    w.desk.follow("fred", "tina", 100).unwrap();
    w.desk
        .execute_copy_trade(&mut w.ledger, "automation", "fred", "tina", "Y", 1_000, Utc::now())
        .unwrap();

    // Price rises 50%; automation mirrors a full exit.
    w.source.set_price(150);
    let pnl = w
        .desk
        .execute_copy_sell(&mut w.ledger, "automation", "fred", "tina", "Y", 100)
        .unwrap();

    // pnl = 500, fee = 5, payout = 1495
    assert_eq!(pnl, 500);
    assert_eq!(w.transfer.total_sent_to("fred"), 1_495);
    assert_eq!(w.desk.vault_position("fred", "Y"), 0);
    assert_eq!(w.ledger.active_investment("fred", "Y"), 0);
}

#[test]
fn test_copy_sell_half_keeps_half_open() {
    let mut w = world();
    w.desk.deposit(&mut w.ledger, "fred", 1_000).unwrap();
    w.desk.follow("fred", "tina", 100).unwrap();
    w.desk
        .execute_copy_trade(&mut w.ledger, "automation", "fred", "tina", "Y", 1_000, Utc::now())
        .unwrap();

    w.desk
        .execute_copy_sell(&mut w.ledger, "automation", "fred", "tina", "Y", 50)
        .unwrap();

    assert_eq!(w.desk.vault_position("fred", "Y"), 500);
    assert_eq!(w.ledger.active_investment("fred", "Y"), 500);
    assert_eq!(w.transfer.total_sent_to("fred"), 500);
}

#[test]
fn test_unfollow_stops_copying() {
    let mut w = world();
    w.desk.deposit(&mut w.ledger, "fred", 100).unwrap();
    w.desk.follow("fred", "tina", 50).unwrap();
    w.desk.unfollow("fred", "tina").unwrap();

    let err = w
        .desk
        .execute_copy_trade(&mut w.ledger, "automation", "fred", "tina", "Y", 10, Utc::now())
        .unwrap_err();
    assert_eq!(err, Error::NotFollowing("tina".into()));
}

#[test]
fn test_breaker_halts_desk_and_ledger_together() {
    let mut w = world();
    w.desk.deposit(&mut w.ledger, "fred", 100).unwrap();
    w.desk.follow("fred", "tina", 50).unwrap();

    w.breaker.engage();
    assert_eq!(
        w.desk.deposit(&mut w.ledger, "fred", 1),
        Err(Error::Halted)
    );
    assert_eq!(
        w.ledger.open("fred", "Y", 10, Utc::now()),
        Err(Error::Halted)
    );

    // Reads on both components keep working while halted.
    assert_eq!(w.desk.pooled_balance("fred"), 100);
    assert_eq!(w.desk.follower_count("tina"), 1);
    assert!(w.ledger.positions("fred").is_empty());

    w.breaker.disengage();
    assert!(w.desk.deposit(&mut w.ledger, "fred", 1).is_ok());
}

#[test]
fn test_withdraw_returns_uncommitted_value() {
    let mut w = world();
    w.desk.deposit(&mut w.ledger, "fred", 100).unwrap();
    w.desk.follow("fred", "tina", 50).unwrap();
    w.desk
        .execute_copy_trade(&mut w.ledger, "automation", "fred", "tina", "Y", 100, Utc::now())
        .unwrap();

    // 50 committed, 50 withdrawable.
    assert_eq!(w.desk.pooled_balance("fred"), 50);
    w.desk.withdraw(&mut w.ledger, "fred", 50).unwrap();
    assert_eq!(w.desk.pooled_balance("fred"), 0);
    assert_eq!(w.transfer.total_sent_to("fred"), 50);

    let err = w.desk.withdraw(&mut w.ledger, "fred", 1).unwrap_err();
    assert!(matches!(err, Error::InsufficientBalance { .. }));
}
