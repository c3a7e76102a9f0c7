//! Capabilities the ledger consumes from its environment.
//!
//! The ledger never reads the system clock, moves external value or decides
//! who is privileged on its own; it calls these traits. Production
//! implementations live here, deterministic ones in `revshare-nullables`.

use crate::{Address, Timestamp};

/// Monotonic timestamp source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Pushes value out of the ledger's custody.
///
/// `send` is synchronous and reports failure by returning `false` rather
/// than panicking; callers must check it. Implementations must not call back
/// into the ledger.
pub trait ValueTransfer: Send + Sync {
    fn send(&self, to: &Address, amount: u128) -> bool;
}

/// Decides which callers may run administrator-only operations.
pub trait AccessControl: Send + Sync {
    fn is_administrator(&self, caller: &Address) -> bool;
}

/// Wall-clock time via [`Timestamp::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Exactly one administrator address.
#[derive(Clone, Copy, Debug)]
pub struct SingleAdministrator(pub Address);

impl AccessControl for SingleAdministrator {
    fn is_administrator(&self, caller: &Address) -> bool {
        !caller.is_zero() && *caller == self.0
    }
}
