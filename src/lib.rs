//! copy-ledger: self-custodial position ledger with copy-trading delegation
//!
//! This library provides the core components for:
//! - Asset registry with bounds-checked price sources
//! - Pure PnL and fee-bearing settlement arithmetic on 18-decimal fixed point
//! - Per-account position books with open/close/partial-sell lifecycle
//! - Multi-position partial-sell allocation with all-or-nothing fulfillment
//! - Copy-trading delegation driven by a trusted automation role
//! - A global circuit breaker over all mutating operations
//! - Typed events for observers and indexers

pub mod breaker;
pub mod config;
pub mod copy;
pub mod error;
pub mod events;
pub mod ledger;
pub mod registry;
pub mod settlement;
pub mod telemetry;
pub mod transfer;
