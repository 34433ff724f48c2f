//! Position records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::settlement::{Amount, Price};

/// One account's exposure to an asset at a recorded entry price.
///
/// Positions are appended to an account's book and never removed or
/// reordered, so an index into the book identifies a position for its whole
/// lifetime. Once `active` is false the record is immutable and excluded
/// from every aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Asset symbol
    pub asset: String,
    /// Invested principal, smallest value unit
    pub invested: Amount,
    /// Entry price, 18-decimal fixed point
    pub entry_price: Price,
    /// Entry timestamp
    pub entry_time: DateTime<Utc>,
    /// False once fully closed
    pub active: bool,
}

impl Position {
    pub(crate) fn new(
        asset: impl Into<String>,
        invested: Amount,
        entry_price: Price,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            asset: asset.into(),
            invested,
            entry_price,
            entry_time,
            active: true,
        }
    }

    /// Whether this position is an active holding of `asset`
    pub fn matches(&self, asset: &str) -> bool {
        self.active && self.asset == asset
    }

    /// Reduce invested principal by `amount`, deactivating at zero.
    /// Caller guarantees `amount <= invested`.
    pub(crate) fn reduce(&mut self, amount: Amount) {
        self.invested -= amount;
        if self.invested == 0 {
            self.active = false;
        }
    }

    /// Re-base the entry price so future PnL is computed from `price`
    pub(crate) fn rebase(&mut self, price: Price) {
        self.entry_price = price;
    }
}
