//! Position ledger
//!
//! Owns per-account position books, the asset registry, and the held-value
//! treasury. Every mutating operation either fully succeeds or leaves the
//! ledger exactly as it was: validation runs first, bookkeeping commits
//! next, and the transfer capability is invoked last, with an exact restore
//! if it reports failure.

mod allocator;
mod position;

pub use allocator::{build_plan, SellChunk, SellPlan};
pub use position::Position;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::breaker::CircuitBreaker;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::events::LedgerEvent;
use crate::registry::{AssetRegistry, PriceSource};
use crate::settlement::{self, Amount, MAX_FEE_BPS};
use crate::transfer::ValueTransfer;

/// The position accounting and settlement engine
pub struct Ledger {
    config: EngineConfig,
    registry: AssetRegistry,
    breaker: Arc<CircuitBreaker>,
    transfer: Arc<dyn ValueTransfer>,
    books: HashMap<String, Vec<Position>>,
    treasury: Amount,
    events: Vec<LedgerEvent>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new(
        config: EngineConfig,
        breaker: Arc<CircuitBreaker>,
        transfer: Arc<dyn ValueTransfer>,
    ) -> Self {
        Self {
            config,
            registry: AssetRegistry::new(),
            breaker,
            transfer,
            books: HashMap::new(),
            treasury: 0,
            events: Vec::new(),
        }
    }

    // --- administrative configuration ---

    /// Register or replace the price source for `asset`
    pub fn register_asset(&mut self, asset: &str, source: Arc<dyn PriceSource>) -> Result<()> {
        let source_id = source.id().to_string();
        self.registry.register(asset, source)?;
        self.events.push(LedgerEvent::PriceSourceChanged {
            asset: asset.to_string(),
            source: source_id,
        });
        Ok(())
    }

    /// Remove the price source for `asset`
    pub fn deregister_asset(&mut self, asset: &str) -> Result<()> {
        let removed = self.registry.deregister(asset)?;
        self.events.push(LedgerEvent::PriceSourceChanged {
            asset: asset.to_string(),
            source: removed.id().to_string(),
        });
        Ok(())
    }

    /// Set the profit fee rate, bounded at [`MAX_FEE_BPS`]
    pub fn set_fee_bps(&mut self, fee_bps: u32) -> Result<()> {
        if fee_bps > MAX_FEE_BPS {
            return Err(Error::FeeTooHigh(fee_bps));
        }
        self.config.fee_bps = fee_bps;
        Ok(())
    }

    /// Current profit fee rate in basis points
    pub fn fee_bps(&self) -> u32 {
        self.config.fee_bps
    }

    /// Credit held value entering the system
    pub fn fund(&mut self, amount: Amount) -> Result<()> {
        self.treasury = self.treasury.checked_add(amount).ok_or(Error::Overflow)?;
        Ok(())
    }

    /// Pay excess held value out to `recipient` (administrative)
    pub fn sweep(&mut self, recipient: &str, amount: Amount) -> Result<()> {
        self.pay_out(recipient, amount)
    }

    // --- read-only queries ---

    /// Value currently held by the engine
    pub fn treasury(&self) -> Amount {
        self.treasury
    }

    /// Registered asset symbols
    pub fn supported_assets(&self) -> Vec<String> {
        self.registry.supported_assets()
    }

    /// Whether `asset` has a registered price source
    pub fn is_asset_registered(&self, asset: &str) -> bool {
        self.registry.is_registered(asset)
    }

    /// The account's full position book, inactive records included
    pub fn positions(&self, account: &str) -> &[Position] {
        self.books.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total active principal the account has committed to `asset`
    pub fn active_investment(&self, account: &str, asset: &str) -> Amount {
        self.positions(account)
            .iter()
            .filter(|p| p.matches(asset))
            .map(|p| p.invested)
            .sum()
    }

    /// Unrealized PnL across all active positions, at fresh prices
    pub fn unrealized_pnl(&self, account: &str) -> Result<i128> {
        let mut total = 0i128;
        for position in self.positions(account).iter().filter(|p| p.active) {
            let price = self.registry.current_price(&position.asset)?;
            let pnl = settlement::compute_pnl(position.entry_price, price, position.invested)?;
            total = total.checked_add(pnl).ok_or(Error::Overflow)?;
        }
        Ok(total)
    }

    /// Drain buffered events
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    // --- mutating operations ---

    /// Open a new position and return its index in the account's book
    pub fn open(
        &mut self,
        account: &str,
        asset: &str,
        amount: Amount,
        timestamp: DateTime<Utc>,
    ) -> Result<usize> {
        self.breaker.guard()?;
        if !self.registry.is_registered(asset) {
            return Err(Error::UnknownAsset(asset.to_string()));
        }
        // An active position always holds nonzero principal, whatever the
        // configured minimum says.
        let min = self.config.min_open_amount.max(1);
        let max = self.config.max_open_amount;
        if amount < min || amount > max {
            return Err(Error::AmountOutOfBounds { amount, min, max });
        }

        let entry_price = self.registry.current_price(asset)?;
        let book = self.books.entry(account.to_string()).or_default();
        let index = book.len();
        book.push(Position::new(asset, amount, entry_price, timestamp));

        self.events.push(LedgerEvent::PositionOpened {
            account: account.to_string(),
            asset: asset.to_string(),
            amount,
            entry_price,
        });
        info!(account, asset, amount = %amount, index, "position opened");
        Ok(index)
    }

    /// Close the position at `index`, returning its realized PnL
    pub fn close_by_index(&mut self, account: &str, index: usize) -> Result<i128> {
        self.breaker.guard()?;
        let (asset, entry_price, invested) = {
            let position = self.position_at(account, index)?;
            if !position.active {
                return Err(Error::PositionInactive { index });
            }
            (position.asset.clone(), position.entry_price, position.invested)
        };

        let exit_price = self.registry.current_price(&asset)?;
        let pnl = settlement::compute_pnl(entry_price, exit_price, invested)?;
        let settled = settlement::compute_settlement(pnl, invested, self.config.fee_bps)?;
        if settled.payout > self.treasury {
            return Err(Error::InsufficientTreasury {
                available: self.treasury,
                required: settled.payout,
            });
        }

        // Bookkeeping commits before the transfer capability runs.
        self.book_entry(account, index).active = false;
        self.treasury -= settled.payout;

        if settled.payout > 0 && !self.transfer.send(account, settled.payout) {
            self.book_entry(account, index).active = true;
            self.treasury += settled.payout;
            return Err(Error::TransferRejected {
                recipient: account.to_string(),
                amount: settled.payout,
            });
        }

        self.events.push(LedgerEvent::PositionClosed {
            account: account.to_string(),
            asset: asset.clone(),
            exit_price,
            pnl,
            payout: settled.payout,
        });
        info!(account, asset = %asset, index, pnl = %pnl, payout = %settled.payout, "position closed");
        Ok(pnl)
    }

    /// Close the account's best-performing active position for `asset`.
    ///
    /// "Best" is the strictly greatest current PnL; on a tie the lowest
    /// index wins, since later candidates must beat the incumbent outright.
    pub fn close_best_by_asset(&mut self, account: &str, asset: &str) -> Result<i128> {
        self.breaker.guard()?;
        let price = self.registry.current_price(asset)?;

        let mut best: Option<(usize, i128)> = None;
        for (index, position) in self.positions(account).iter().enumerate() {
            if !position.matches(asset) {
                continue;
            }
            let pnl = settlement::compute_pnl(position.entry_price, price, position.invested)?;
            if best.map_or(true, |(_, best_pnl)| pnl > best_pnl) {
                best = Some((index, pnl));
            }
        }

        let (index, _) = best.ok_or_else(|| Error::NoOpenPosition(asset.to_string()))?;
        self.close_by_index(account, index)
    }

    /// Pay out current profit without touching principal.
    ///
    /// Requires strictly positive PnL. The position stays active with its
    /// invested amount unchanged, and its entry price is re-based to the
    /// current price so future PnL starts from this new baseline.
    pub fn withdraw_profit_only(&mut self, account: &str, index: usize) -> Result<Amount> {
        self.breaker.guard()?;
        let (asset, entry_price, invested) = {
            let position = self.position_at(account, index)?;
            if !position.active {
                return Err(Error::PositionInactive { index });
            }
            (position.asset.clone(), position.entry_price, position.invested)
        };

        let price = self.registry.current_price(&asset)?;
        let pnl = settlement::compute_pnl(entry_price, price, invested)?;
        if pnl <= 0 {
            return Err(Error::NoProfit { pnl });
        }

        // Settle against a zero principal: payout = pnl - fee.
        let settled = settlement::compute_settlement(pnl, 0, self.config.fee_bps)?;
        if settled.payout > self.treasury {
            return Err(Error::InsufficientTreasury {
                available: self.treasury,
                required: settled.payout,
            });
        }

        self.book_entry(account, index).rebase(price);
        self.treasury -= settled.payout;

        if settled.payout > 0 && !self.transfer.send(account, settled.payout) {
            self.book_entry(account, index).rebase(entry_price);
            self.treasury += settled.payout;
            return Err(Error::TransferRejected {
                recipient: account.to_string(),
                amount: settled.payout,
            });
        }

        self.events.push(LedgerEvent::ProfitWithdrawn {
            account: account.to_string(),
            amount: settled.payout,
        });
        info!(account, asset = %asset, index, amount = %settled.payout, "profit withdrawn");
        Ok(settled.payout)
    }

    /// Liquidate `target` of the account's exposure to `asset`, possibly
    /// spanning several positions, and return the aggregate realized PnL.
    ///
    /// Fulfillment is all-or-nothing: if the book cannot cover the full
    /// target no position is touched. Chunks settle individually (each with
    /// its own truncation), but their payouts are not sent chunk by chunk:
    /// the sum is delivered as a single transfer once every reduction has
    /// committed, and one aggregated close event is emitted for the whole
    /// operation.
    pub fn partial_sell(&mut self, account: &str, asset: &str, target: Amount) -> Result<i128> {
        self.breaker.guard()?;
        if target == 0 || target < self.config.min_sell_amount {
            return Err(Error::SellBelowMinimum {
                amount: target,
                min: self.config.min_sell_amount,
            });
        }
        if !self.registry.is_registered(asset) {
            return Err(Error::UnknownAsset(asset.to_string()));
        }

        let price = self.registry.current_price(asset)?;
        let plan = allocator::build_plan(
            self.positions(account),
            asset,
            target,
            price,
            self.config.fee_bps,
        )?;
        if plan.total_payout > self.treasury {
            return Err(Error::InsufficientTreasury {
                available: self.treasury,
                required: plan.total_payout,
            });
        }

        let Some(book) = self.books.get_mut(account) else {
            // A non-empty plan implies the book exists; an empty target is
            // rejected above, so a missing book cannot reach here.
            return Err(Error::UnfilledRemainder { remainder: target });
        };
        for chunk in &plan.chunks {
            book[chunk.index].reduce(chunk.amount);
        }
        self.treasury -= plan.total_payout;

        if plan.total_payout > 0 && !self.transfer.send(account, plan.total_payout) {
            let book = self.books.entry(account.to_string()).or_default();
            for chunk in &plan.chunks {
                let position = &mut book[chunk.index];
                position.invested += chunk.amount;
                position.active = true;
            }
            self.treasury += plan.total_payout;
            return Err(Error::TransferRejected {
                recipient: account.to_string(),
                amount: plan.total_payout,
            });
        }

        self.events.push(LedgerEvent::PositionClosed {
            account: account.to_string(),
            asset: asset.to_string(),
            exit_price: price,
            pnl: plan.aggregate_pnl,
            payout: plan.total_payout,
        });
        info!(
            account,
            asset,
            target = %target,
            chunks = plan.chunks.len(),
            pnl = %plan.aggregate_pnl,
            "partial sell settled"
        );
        Ok(plan.aggregate_pnl)
    }

    /// Debit the treasury and send `amount` to `recipient`
    pub(crate) fn pay_out(&mut self, recipient: &str, amount: Amount) -> Result<()> {
        if amount > self.treasury {
            return Err(Error::InsufficientTreasury {
                available: self.treasury,
                required: amount,
            });
        }
        self.treasury -= amount;
        if !self.transfer.send(recipient, amount) {
            self.treasury += amount;
            return Err(Error::TransferRejected {
                recipient: recipient.to_string(),
                amount,
            });
        }
        Ok(())
    }

    fn position_at(&self, account: &str, index: usize) -> Result<&Position> {
        self.books
            .get(account)
            .and_then(|book| book.get(index))
            .ok_or_else(|| Error::PositionNotFound {
                account: account.to_string(),
                index,
            })
    }

    /// Mutable access to a position already validated by `position_at`
    fn book_entry(&mut self, account: &str, index: usize) -> &mut Position {
        &mut self.books.entry(account.to_string()).or_default()[index]
    }
}
