//! Balance storage for the revshare ledger.
//!
//! The ledger core depends only on the [`BalanceStore`] trait: balances,
//! total supply, allowances and the atomic `move`/`mint`/`burn` primitives.
//! [`MemoryBalanceStore`] is the in-process implementation used by default.

pub mod balance;
pub mod error;
pub mod memory;

pub use balance::BalanceStore;
pub use error::StoreError;
pub use memory::MemoryBalanceStore;
