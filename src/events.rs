//! Events emitted by mutating operations
//!
//! Each event carries enough fields for an observer to reconstruct ledger
//! history. Components buffer events internally; observers drain them with
//! `take_events`.

use serde::{Deserialize, Serialize};

use crate::settlement::{Amount, Price};

/// Observable state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A new position was appended to an account's book
    PositionOpened {
        account: String,
        asset: String,
        amount: Amount,
        entry_price: Price,
    },
    /// A position (or a partial-sell aggregate) was settled
    PositionClosed {
        account: String,
        asset: String,
        exit_price: Price,
        pnl: i128,
        payout: Amount,
    },
    /// Profit was paid out without touching principal
    ProfitWithdrawn { account: String, amount: Amount },
    /// An asset's price source was registered, replaced, or removed
    PriceSourceChanged { asset: String, source: String },
    /// Value entered a follower's pooled balance
    FundsDeposited { account: String, amount: Amount },
    /// Value left a follower's pooled balance
    FundsWithdrawn { account: String, amount: Amount },
    /// A following relationship was established
    TraderFollowed {
        follower: String,
        trader: String,
        percentage: u8,
    },
    /// A following relationship was cleared
    TraderUnfollowed { follower: String, trader: String },
    /// The automation role mirrored a trader's action for a follower
    TradeCopied {
        follower: String,
        trader: String,
        asset: String,
        amount: Amount,
    },
}
