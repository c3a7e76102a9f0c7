//! Events emitted by ledger operations for subscribers.

use revshare_types::Address;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};

/// Observable outcome of a committed ledger operation.
///
/// Events are only published for operations that succeed; a rejected
/// operation emits nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenEvent {
    /// Balance moved. `from` is the zero address for mints, `to` for burns.
    Transfer {
        from: Address,
        to: Address,
        amount: u128,
    },
    Approval {
        owner: Address,
        spender: Address,
        amount: u128,
    },
    RevenueDeposited {
        depositor: Address,
        amount: u128,
    },
    /// Revenue paid out to a claimant.
    RevenueDistributed {
        account: Address,
        amount: u128,
    },
    GlobalTransfersEnabled,
    AccountTransfersEnabled {
        account: Address,
    },
    DelegateChanged {
        delegator: Address,
        from: Option<Address>,
        to: Address,
    },
    DelegateVotesChanged {
        delegate: Address,
        previous: u128,
        current: u128,
    },
    /// Value received outside of a revenue deposit.
    ValueReceived {
        from: Address,
        amount: u128,
    },
    ExcessWithdrawn {
        to: Address,
        amount: u128,
    },
}

/// Synchronous fan-out event bus.
///
/// Listeners run inline while the ledger lock is held, so events arrive in
/// commit order. Keep handlers fast, and never call back into the ledger
/// from one: such calls are rejected with `TokenError::Reentrant`. A
/// panicking listener is logged and skipped; later listeners still run.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&TokenEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&TokenEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &TokenEvent) {
        for (index, listener) in self.listeners.iter().enumerate() {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::error!(listener = index, event = ?event, "event listener panicked");
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
