//! Value-transfer capability
//!
//! The engine never moves value itself; it invokes this capability after all
//! internal bookkeeping has committed. A `false` result aborts the invoking
//! operation and its bookkeeping is restored.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::settlement::Amount;

/// Capability for sending value out of the engine
pub trait ValueTransfer: Send + Sync {
    /// Send `amount` to `recipient`; `false` reports failure
    fn send(&self, recipient: &str, amount: Amount) -> bool;
}

/// A single recorded outbound transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTransfer {
    pub recipient: String,
    pub amount: Amount,
}

/// In-memory transfer capability that records every send.
///
/// Can be switched into a rejecting mode to exercise rollback paths.
#[derive(Default)]
pub struct RecordingTransfer {
    sent: RwLock<Vec<SentTransfer>>,
    reject: AtomicBool,
}

impl RecordingTransfer {
    /// Create a capability that accepts every send
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle rejection of all subsequent sends
    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// All recorded sends, in order
    pub fn sent(&self) -> Vec<SentTransfer> {
        self.sent.read().clone()
    }

    /// Total value sent to `recipient`
    pub fn total_sent_to(&self, recipient: &str) -> Amount {
        self.sent
            .read()
            .iter()
            .filter(|t| t.recipient == recipient)
            .map(|t| t.amount)
            .sum()
    }
}

impl ValueTransfer for RecordingTransfer {
    fn send(&self, recipient: &str, amount: Amount) -> bool {
        if self.reject.load(Ordering::SeqCst) {
            warn!(recipient, amount = %amount, "transfer rejected");
            return false;
        }
        self.sent.write().push(SentTransfer {
            recipient: recipient.to_string(),
            amount,
        });
        info!(recipient, amount = %amount, "value transferred");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_sends() {
        let transfer = RecordingTransfer::new();
        assert!(transfer.send("alice", 100));
        assert!(transfer.send("bob", 50));
        assert!(transfer.send("alice", 25));

        assert_eq!(transfer.sent().len(), 3);
        assert_eq!(transfer.total_sent_to("alice"), 125);
        assert_eq!(transfer.total_sent_to("bob"), 50);
    }

    #[test]
    fn test_rejecting_mode() {
        let transfer = RecordingTransfer::new();
        transfer.set_reject(true);
        assert!(!transfer.send("alice", 100));
        assert!(transfer.sent().is_empty());

        transfer.set_reject(false);
        assert!(transfer.send("alice", 100));
        assert_eq!(transfer.sent().len(), 1);
    }
}
