//! Copy-trading delegate
//!
//! Lets a follower delegate a percentage of deposited value to mirror a
//! trader's position changes. The desk is a client of the ledger's public
//! operations: copy trades drive `open`, copy sells drive `partial_sell`,
//! and payouts flow straight from the ledger to the follower. The two
//! execute operations are reachable only through the automation role.

mod types;

pub use types::{AutomationRoles, Following};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::breaker::CircuitBreaker;
use crate::error::{Error, Result};
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use crate::settlement::Amount;

/// Following-relationship table, pooled balances, and per-asset vault
/// sub-ledger for delegated copy trading
pub struct CopyDesk {
    breaker: Arc<CircuitBreaker>,
    follows: HashMap<(String, String), Following>,
    pooled: HashMap<String, Amount>,
    vault: HashMap<(String, String), Amount>,
    roles: AutomationRoles,
    events: Vec<LedgerEvent>,
}

impl CopyDesk {
    /// Create an empty desk sharing the engine's circuit breaker
    pub fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            breaker,
            follows: HashMap::new(),
            pooled: HashMap::new(),
            vault: HashMap::new(),
            roles: AutomationRoles::new(),
            events: Vec::new(),
        }
    }

    /// Administrative access to the automation role set
    pub fn roles_mut(&mut self) -> &mut AutomationRoles {
        &mut self.roles
    }

    /// Whether `caller` may invoke the execute operations
    pub fn is_authorized(&self, caller: &str) -> bool {
        self.roles.is_authorized(caller)
    }

    // --- read-only queries ---

    /// Deposited-but-uncommitted value for `account`
    pub fn pooled_balance(&self, account: &str) -> Amount {
        self.pooled.get(account).copied().unwrap_or(0)
    }

    /// Value the desk has committed for `follower` in `asset`
    pub fn vault_position(&self, follower: &str, asset: &str) -> Amount {
        self.vault
            .get(&(follower.to_string(), asset.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Active following relationship, if any
    pub fn following(&self, follower: &str, trader: &str) -> Option<Following> {
        self.follows
            .get(&(follower.to_string(), trader.to_string()))
            .copied()
            .filter(|f| f.active)
    }

    /// Number of accounts actively following `trader`
    pub fn follower_count(&self, trader: &str) -> usize {
        self.follows
            .iter()
            .filter(|((_, t), following)| t == trader && following.active)
            .count()
    }

    /// Drain buffered events
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    // --- self-service operations ---

    /// Credit `amount` to the caller's pooled balance
    pub fn deposit(&mut self, ledger: &mut Ledger, account: &str, amount: Amount) -> Result<()> {
        self.breaker.guard()?;
        let balance = self.pooled_balance(account);
        let next = balance.checked_add(amount).ok_or(Error::Overflow)?;
        ledger.fund(amount)?;
        self.pooled.insert(account.to_string(), next);

        self.events.push(LedgerEvent::FundsDeposited {
            account: account.to_string(),
            amount,
        });
        info!(account, amount = %amount, "funds deposited");
        Ok(())
    }

    /// Withdraw uncommitted value back to the caller
    pub fn withdraw(&mut self, ledger: &mut Ledger, account: &str, amount: Amount) -> Result<()> {
        self.breaker.guard()?;
        let balance = self.pooled_balance(account);
        if amount > balance {
            return Err(Error::InsufficientBalance {
                available: balance,
                required: amount,
            });
        }

        // Debit before the transfer runs; restore if it is rejected.
        self.pooled.insert(account.to_string(), balance - amount);
        if let Err(err) = ledger.pay_out(account, amount) {
            self.pooled.insert(account.to_string(), balance);
            return Err(err);
        }

        self.events.push(LedgerEvent::FundsWithdrawn {
            account: account.to_string(),
            amount,
        });
        info!(account, amount = %amount, "funds withdrawn");
        Ok(())
    }

    /// Start mirroring `trader` at `percentage` of their amounts
    pub fn follow(&mut self, follower: &str, trader: &str, percentage: u8) -> Result<()> {
        self.breaker.guard()?;
        if !(1..=100).contains(&percentage) {
            return Err(Error::InvalidPercentage(percentage));
        }
        if follower == trader {
            return Err(Error::SelfFollow);
        }
        let pooled = self.pooled_balance(follower);
        if pooled == 0 {
            return Err(Error::InsufficientBalance {
                available: 0,
                required: 1,
            });
        }

        self.follows.insert(
            (follower.to_string(), trader.to_string()),
            Following {
                active: true,
                percentage,
            },
        );
        self.events.push(LedgerEvent::TraderFollowed {
            follower: follower.to_string(),
            trader: trader.to_string(),
            percentage,
        });
        info!(follower, trader, percentage, "trader followed");
        Ok(())
    }

    /// Clear the relationship with `trader`, whatever its current state.
    ///
    /// The event is emitted only when a relationship actually existed, so
    /// every `TraderUnfollowed` in a history pairs with a `TraderFollowed`.
    pub fn unfollow(&mut self, follower: &str, trader: &str) -> Result<()> {
        self.breaker.guard()?;
        let removed = self
            .follows
            .remove(&(follower.to_string(), trader.to_string()));
        if removed.is_some() {
            self.events.push(LedgerEvent::TraderUnfollowed {
                follower: follower.to_string(),
                trader: trader.to_string(),
            });
            info!(follower, trader, "trader unfollowed");
        }
        Ok(())
    }

    // --- automation-gated operations ---

    /// Mirror a trader's buy for one follower.
    ///
    /// `copy_amount = trader_amount * percentage / 100` (truncating) moves
    /// from the pooled balance into the vault entry, then opens a ledger
    /// position on the follower's behalf. Any failure restores both.
    #[allow(clippy::too_many_arguments)]
    pub fn execute_copy_trade(
        &mut self,
        ledger: &mut Ledger,
        caller: &str,
        follower: &str,
        trader: &str,
        asset: &str,
        trader_amount: Amount,
        timestamp: DateTime<Utc>,
    ) -> Result<usize> {
        if !self.roles.is_authorized(caller) {
            return Err(Error::Unauthorized(caller.to_string()));
        }
        self.breaker.guard()?;
        let following = self
            .following(follower, trader)
            .ok_or_else(|| Error::NotFollowing(trader.to_string()))?;

        let copy_amount = trader_amount
            .checked_mul(Amount::from(following.percentage))
            .ok_or(Error::Overflow)?
            / 100;
        let pooled = self.pooled_balance(follower);
        if copy_amount > pooled {
            return Err(Error::InsufficientBalance {
                available: pooled,
                required: copy_amount,
            });
        }

        let vault_key = (follower.to_string(), asset.to_string());
        let vault_before = self.vault.get(&vault_key).copied().unwrap_or(0);
        let vault_after = vault_before.checked_add(copy_amount).ok_or(Error::Overflow)?;

        self.pooled.insert(follower.to_string(), pooled - copy_amount);
        self.vault.insert(vault_key.clone(), vault_after);

        let index = match ledger.open(follower, asset, copy_amount, timestamp) {
            Ok(index) => index,
            Err(err) => {
                self.pooled.insert(follower.to_string(), pooled);
                self.vault.insert(vault_key, vault_before);
                return Err(err);
            }
        };

        self.events.push(LedgerEvent::TradeCopied {
            follower: follower.to_string(),
            trader: trader.to_string(),
            asset: asset.to_string(),
            amount: copy_amount,
        });
        info!(follower, trader, asset, amount = %copy_amount, "trade copied");
        Ok(index)
    }

    /// Mirror a trader's sell for one follower.
    ///
    /// `sell_amount = vault_position * sell_percentage / 100` (truncating).
    /// The vault entry is reduced before the ledger partial-sell runs; the
    /// payout flows straight from the ledger to the follower. A failed sell
    /// restores the vault entry.
    pub fn execute_copy_sell(
        &mut self,
        ledger: &mut Ledger,
        caller: &str,
        follower: &str,
        trader: &str,
        asset: &str,
        sell_percentage: u8,
    ) -> Result<i128> {
        if !self.roles.is_authorized(caller) {
            return Err(Error::Unauthorized(caller.to_string()));
        }
        self.breaker.guard()?;
        if !(1..=100).contains(&sell_percentage) {
            return Err(Error::InvalidPercentage(sell_percentage));
        }
        self.following(follower, trader)
            .ok_or_else(|| Error::NotFollowing(trader.to_string()))?;

        let vault_key = (follower.to_string(), asset.to_string());
        let vault_before = self.vault.get(&vault_key).copied().unwrap_or(0);
        if vault_before == 0 {
            return Err(Error::NoVaultPosition(asset.to_string()));
        }

        let sell_amount = vault_before
            .checked_mul(Amount::from(sell_percentage))
            .ok_or(Error::Overflow)?
            / 100;

        self.vault
            .insert(vault_key.clone(), vault_before - sell_amount);
        let pnl = match ledger.partial_sell(follower, asset, sell_amount) {
            Ok(pnl) => pnl,
            Err(err) => {
                self.vault.insert(vault_key, vault_before);
                return Err(err);
            }
        };

        info!(follower, trader, asset, amount = %sell_amount, pnl = %pnl, "copy position sold");
        Ok(pnl)
    }
}
