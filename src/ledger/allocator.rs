//! Partial-sell allocation across a position book
//!
//! Builds a fully-resolved plan without touching the book: the scan walks
//! positions in insertion order, skips inactive or non-matching entries, and
//! consumes `min(remaining, invested)` from each match. Fulfillment is
//! all-or-nothing; a shortfall fails the whole plan with the remainder.

use crate::error::{Error, Result};
use crate::settlement::{self, Amount, Price, Settlement};

use super::position::Position;

/// One chunk consumed from a single position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellChunk {
    /// Index of the source position in the account's book
    pub index: usize,
    /// Principal consumed from that position
    pub amount: Amount,
    /// Proportional PnL share realized for this chunk
    pub pnl_share: i128,
    /// Net payout for this chunk
    pub payout: Amount,
    /// Fee taken from this chunk's profit
    pub fee: Amount,
}

/// Resolved plan for one partial sell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellPlan {
    pub chunks: Vec<SellChunk>,
    /// Sum of per-chunk PnL shares
    pub aggregate_pnl: i128,
    /// Sum of per-chunk payouts
    pub total_payout: Amount,
    /// Price at which every chunk settles
    pub exit_price: Price,
}

/// Allocate `target` across the matching active positions of `book`.
///
/// Each chunk's PnL share is `position_pnl * chunk / invested`, truncating
/// toward zero independently of the truncation already inside
/// `compute_pnl`, so the two losses compound.
pub fn build_plan(
    book: &[Position],
    asset: &str,
    target: Amount,
    price: Price,
    fee_bps: u32,
) -> Result<SellPlan> {
    let mut remaining = target;
    let mut chunks = Vec::new();
    let mut aggregate_pnl = 0i128;
    let mut total_payout: Amount = 0;

    for (index, position) in book.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        if !position.matches(asset) {
            continue;
        }

        let chunk = remaining.min(position.invested);
        let position_pnl = settlement::compute_pnl(position.entry_price, price, position.invested)?;

        let chunk_i = i128::try_from(chunk).map_err(|_| Error::Overflow)?;
        let invested_i = i128::try_from(position.invested).map_err(|_| Error::Overflow)?;
        let pnl_share = position_pnl.checked_mul(chunk_i).ok_or(Error::Overflow)? / invested_i;

        let Settlement { payout, fee } = settlement::compute_settlement(pnl_share, chunk, fee_bps)?;

        aggregate_pnl = aggregate_pnl.checked_add(pnl_share).ok_or(Error::Overflow)?;
        total_payout = total_payout.checked_add(payout).ok_or(Error::Overflow)?;
        chunks.push(SellChunk {
            index,
            amount: chunk,
            pnl_share,
            payout,
            fee,
        });
        remaining -= chunk;
    }

    if remaining > 0 {
        return Err(Error::UnfilledRemainder { remainder: remaining });
    }

    Ok(SellPlan {
        chunks,
        aggregate_pnl,
        total_payout,
        exit_price: price,
    })
}
