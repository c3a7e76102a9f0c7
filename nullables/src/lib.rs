//! Nullable infrastructure for deterministic testing.
//!
//! The ledger's environment (clock, outbound value transfer) is abstracted
//! behind the capability traits in `revshare-types`. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Record what was asked of them
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod value;

pub use clock::NullClock;
pub use value::NullValueTransfer;
