//! Error taxonomy for the ledger engine
//!
//! Every error is terminal for the invoking operation: effects are fully
//! rolled back and the caller decides whether to retry.

use thiserror::Error;

/// Broad classification of engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input failed validation
    Validation,
    /// Ledger or delegate state does not permit the operation
    State,
    /// Price source missing or reading out of bounds
    Price,
    /// Value transfer failed or held value is insufficient
    Transfer,
    /// Caller lacks a required role
    Authorization,
}

/// Engine errors, each carrying the offending value
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Asset has no registry entry
    #[error("asset not registered: {0}")]
    UnknownAsset(String),
    /// Open amount outside the configured per-operation bounds
    #[error("amount {amount} outside allowed range [{min}, {max}]")]
    AmountOutOfBounds { amount: u128, min: u128, max: u128 },
    /// Sell amount below the minimum sell unit
    #[error("sell amount {amount} below minimum unit {min}")]
    SellBelowMinimum { amount: u128, min: u128 },
    /// Copy percentage outside 1..=100
    #[error("percentage must be within 1..=100, got {0}")]
    InvalidPercentage(u8),
    /// Follower and trader are the same account
    #[error("cannot follow self")]
    SelfFollow,
    /// Fee rate above the protocol maximum
    #[error("fee rate {0} bps exceeds maximum")]
    FeeTooHigh(u32),
    /// Arithmetic overflow in settlement math
    #[error("arithmetic overflow in settlement math")]
    Overflow,

    /// Circuit breaker is engaged
    #[error("engine halted: circuit breaker engaged")]
    Halted,
    /// No position at the given index
    #[error("no position {index} for account {account}")]
    PositionNotFound { account: String, index: usize },
    /// Position exists but is no longer active
    #[error("position {index} is not active")]
    PositionInactive { index: usize },
    /// Account holds no active position for the asset
    #[error("no open position for asset {0}")]
    NoOpenPosition(String),
    /// Profit-only withdrawal requires strictly positive PnL
    #[error("no profit to withdraw (pnl = {pnl})")]
    NoProfit { pnl: i128 },
    /// Pooled balance too small for the requested amount
    #[error("insufficient pooled balance: have {available}, need {required}")]
    InsufficientBalance { available: u128, required: u128 },
    /// No vault exposure recorded for the asset
    #[error("no vault position for asset {0}")]
    NoVaultPosition(String),
    /// Follower has no active relationship with the trader
    #[error("not following trader {0}")]
    NotFollowing(String),
    /// Partial sell exhausted the book before the target was met
    #[error("requested sell amount could not be fully satisfied, remainder = {remainder}")]
    UnfilledRemainder { remainder: u128 },

    /// No price source registered for the asset
    #[error("no price source for asset {0}")]
    MissingPriceSource(String),
    /// Price reading is zero or above the sanity ceiling
    #[error("price {0} outside valid bounds")]
    PriceOutOfBounds(u128),
    /// Position was recorded with a zero entry price
    #[error("entry price is zero")]
    ZeroEntryPrice,

    /// Transfer capability reported failure
    #[error("transfer of {amount} to {recipient} rejected")]
    TransferRejected { recipient: String, amount: u128 },
    /// Held value is less than the computed payout
    #[error("held value {available} is less than required payout {required}")]
    InsufficientTreasury { available: u128, required: u128 },

    /// Caller lacks the automation role
    #[error("caller {0} lacks the automation role")]
    Unauthorized(String),
}

impl Error {
    /// Classify this error into one of the five engine kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownAsset(_)
            | Self::AmountOutOfBounds { .. }
            | Self::SellBelowMinimum { .. }
            | Self::InvalidPercentage(_)
            | Self::SelfFollow
            | Self::FeeTooHigh(_)
            | Self::Overflow => ErrorKind::Validation,
            Self::Halted
            | Self::PositionNotFound { .. }
            | Self::PositionInactive { .. }
            | Self::NoOpenPosition(_)
            | Self::NoProfit { .. }
            | Self::InsufficientBalance { .. }
            | Self::NoVaultPosition(_)
            | Self::NotFollowing(_)
            | Self::UnfilledRemainder { .. } => ErrorKind::State,
            Self::MissingPriceSource(_) | Self::PriceOutOfBounds(_) | Self::ZeroEntryPrice => {
                ErrorKind::Price
            }
            Self::TransferRejected { .. } | Self::InsufficientTreasury { .. } => {
                ErrorKind::Transfer
            }
            Self::Unauthorized(_) => ErrorKind::Authorization,
        }
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
