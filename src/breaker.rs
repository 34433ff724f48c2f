//! Circuit breaker
//!
//! A single boolean gate consulted by every mutating ledger and copy-desk
//! operation. Read-only queries are never gated.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Global gate over mutating operations
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    engaged: AtomicBool,
}

impl CircuitBreaker {
    /// Create a disengaged breaker
    pub fn new() -> Self {
        Self::default()
    }

    /// Engage the breaker, halting all mutating operations
    pub fn engage(&self) {
        if !self.engaged.swap(true, Ordering::SeqCst) {
            warn!("circuit breaker engaged");
        }
    }

    /// Disengage the breaker, resuming normal operation
    pub fn disengage(&self) {
        if self.engaged.swap(false, Ordering::SeqCst) {
            info!("circuit breaker disengaged");
        }
    }

    /// Whether the breaker is currently engaged
    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }

    /// Fail with `Error::Halted` while engaged
    pub fn guard(&self) -> Result<()> {
        if self.is_engaged() {
            return Err(Error::Halted);
        }
        Ok(())
    }
}
