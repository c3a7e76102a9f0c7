//! Nullable value transfer: records payouts, fails on demand.

use revshare_types::{Address, ValueTransfer};
use std::collections::HashSet;
use std::sync::Mutex;

/// A [`ValueTransfer`] that never moves real value.
///
/// Successful sends are recorded in order. Failures can be forced globally
/// ([`set_failing`](Self::set_failing)) or per recipient
/// ([`reject`](Self::reject)).
#[derive(Debug, Default)]
pub struct NullValueTransfer {
    sent: Mutex<Vec<(Address, u128)>>,
    failing: Mutex<bool>,
    rejected: Mutex<HashSet<Address>>,
    attempts: Mutex<u64>,
}

impl NullValueTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Make every send to `recipient` fail.
    pub fn reject(&self, recipient: Address) {
        self.rejected.lock().unwrap().insert(recipient);
    }

    /// Successful sends, oldest first.
    pub fn sent(&self) -> Vec<(Address, u128)> {
        self.sent.lock().unwrap().clone()
    }

    /// Total value successfully sent to `recipient`.
    pub fn total_sent_to(&self, recipient: &Address) -> u128 {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, amount)| amount)
            .sum()
    }

    /// Number of send calls, successful or not.
    pub fn attempts(&self) -> u64 {
        *self.attempts.lock().unwrap()
    }
}

impl ValueTransfer for NullValueTransfer {
    fn send(&self, to: &Address, amount: u128) -> bool {
        *self.attempts.lock().unwrap() += 1;
        if *self.failing.lock().unwrap() || self.rejected.lock().unwrap().contains(to) {
            return false;
        }
        self.sent.lock().unwrap().push((*to, amount));
        true
    }
}
