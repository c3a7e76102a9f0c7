//! Transfer lock gate.
//!
//! Balance movement starts disabled. The administrator can open it for
//! everyone or for individual senders; neither switch can ever be turned
//! back.

use revshare_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One-way transfer switches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockGate {
    global_unlocked: bool,
    unlocked_accounts: HashSet<Address>,
}

impl LockGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `from` may send tokens.
    pub fn is_transfer_allowed(&self, from: &Address) -> bool {
        self.global_unlocked || self.unlocked_accounts.contains(from)
    }

    pub fn is_globally_unlocked(&self) -> bool {
        self.global_unlocked
    }

    pub fn is_account_unlocked(&self, account: &Address) -> bool {
        self.unlocked_accounts.contains(account)
    }

    pub fn unlocked_accounts(&self) -> impl Iterator<Item = &Address> {
        self.unlocked_accounts.iter()
    }

    /// Open transfers for everyone. Returns whether anything changed.
    pub fn enable_global(&mut self) -> bool {
        let changed = !self.global_unlocked;
        self.global_unlocked = true;
        changed
    }

    /// Open transfers for one sender. Returns whether anything changed.
    pub fn enable_account(&mut self, account: Address) -> bool {
        self.unlocked_accounts.insert(account)
    }
}
