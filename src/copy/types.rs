//! Copy-trading records

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A follower's standing instruction to mirror one trader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Following {
    /// False once the follower unfollows
    pub active: bool,
    /// Share of the trader's amounts to mirror, 1..=100
    pub percentage: u8,
}

/// Accounts granted the trusted automation role
#[derive(Debug, Clone, Default)]
pub struct AutomationRoles {
    members: HashSet<String>,
}

impl AutomationRoles {
    /// Create an empty role set
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant the automation role to `account`
    pub fn grant(&mut self, account: impl Into<String>) {
        self.members.insert(account.into());
    }

    /// Revoke the automation role from `account`
    pub fn revoke(&mut self, account: &str) {
        self.members.remove(account);
    }

    /// Whether `caller` holds the automation role
    pub fn is_authorized(&self, caller: &str) -> bool {
        self.members.contains(caller)
    }
}
