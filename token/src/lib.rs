//! Revenue-sharing token ledger.
//!
//! [`RevenueToken`] composes the balance store, the revenue accrual engine,
//! the transfer lock gate and the delegated voting ledger. Every balance
//! mutation settles accrual first, then checks the lock gate, then moves the
//! balance, then propagates the change to voting power.
//!
//! Host capabilities (clock, outbound value transfer, access control) are
//! injected through [`Environment`]; see `revshare-nullables` for test
//! doubles.

pub mod config;
pub mod error;
pub mod events;
pub mod lock;
mod state;
pub mod token;

pub use config::{GenesisAllocation, LedgerConfig};
pub use error::TokenError;
pub use events::{EventBus, TokenEvent};
pub use lock::LockGate;
pub use token::{Environment, RevenueToken};
