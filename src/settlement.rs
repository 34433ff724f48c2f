//! Pure PnL and settlement arithmetic
//!
//! All money math runs on 18-decimal fixed-point integers. Division
//! truncates toward zero at two points: the price-change ratio and the
//! per-chunk proportional PnL share computed by the allocator. The
//! truncation direction is part of the protocol and tests pin it down.

use crate::error::{Error, Result};

/// Fixed-point base: 10^18 fractional digits
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Sanity ceiling on any price reading, in the same fixed-point base
pub const PRICE_CEILING: u128 = 1_000_000_000_000_000;

/// Basis-point denominator
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Maximum configurable fee: 1000 bps = 10%
pub const MAX_FEE_BPS: u32 = 1_000;

/// Value amount in the smallest unit
pub type Amount = u128;

/// 18-decimal fixed-point price
pub type Price = u128;

/// Outcome of settling a principal against its realized PnL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Net amount owed to the account
    pub payout: Amount,
    /// Fee taken from the profit, zero on a loss
    pub fee: Amount,
}

/// Signed profit or loss implied by the move from `entry_price` to
/// `current_price` over `invested`.
///
/// `ratio = (current - entry) * SCALE / entry`, `pnl = invested * ratio / SCALE`,
/// both divisions truncating toward zero. A zero entry price is rejected
/// here even though registration already refuses zero prices.
pub fn compute_pnl(entry_price: Price, current_price: Price, invested: Amount) -> Result<i128> {
    if entry_price == 0 {
        return Err(Error::ZeroEntryPrice);
    }

    let entry = i128::try_from(entry_price).map_err(|_| Error::Overflow)?;
    let current = i128::try_from(current_price).map_err(|_| Error::Overflow)?;
    let invested = i128::try_from(invested).map_err(|_| Error::Overflow)?;
    let scale = SCALE as i128;

    let ratio = current
        .checked_sub(entry)
        .and_then(|diff| diff.checked_mul(scale))
        .ok_or(Error::Overflow)?
        / entry;

    let pnl = invested.checked_mul(ratio).ok_or(Error::Overflow)? / scale;
    Ok(pnl)
}

/// Convert realized PnL and principal into a net payout and fee.
///
/// Profit pays `invested + pnl - fee` with `fee = pnl * fee_bps / 10_000`
/// (truncating). A loss is deducted from principal, floored at zero, and
/// never charged a fee. `fee_bps` is bounded by the caller's configuration;
/// this function does not clamp it.
pub fn compute_settlement(pnl: i128, invested: Amount, fee_bps: u32) -> Result<Settlement> {
    if pnl >= 0 {
        let profit = pnl.unsigned_abs();
        let fee = profit
            .checked_mul(u128::from(fee_bps))
            .ok_or(Error::Overflow)?
            / BPS_DENOMINATOR;
        let payout = invested
            .checked_add(profit)
            .and_then(|gross| gross.checked_sub(fee))
            .ok_or(Error::Overflow)?;
        Ok(Settlement { payout, fee })
    } else {
        let loss = pnl.unsigned_abs();
        let payout = if loss >= invested { 0 } else { invested - loss };
        Ok(Settlement { payout, fee: 0 })
    }
}
