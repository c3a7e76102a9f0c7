//! Delegated voting power.
//!
//! Voting weight follows delegate targets, not holders: an account's whole
//! balance counts toward its delegate's voting power, and every balance
//! change moves the same amount of weight in or out of that delegate.
//!
//! Balance-weighted, single-hop delegation. Accounts that never delegated
//! either count toward themselves or toward nobody, depending on the
//! [`DelegationDefault`] policy.

pub mod error;
pub mod ledger;

pub use error::DelegationError;
pub use ledger::{DelegationChange, DelegationDefault, VotesChanged, VotingLedger};
