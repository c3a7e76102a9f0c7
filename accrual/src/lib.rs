//! Revenue accrual: the reward-per-token accounting engine.
//!
//! Externally deposited revenue is distributed to holders in proportion to
//! their balance without iterating over holders. A global accumulator tracks
//! revenue per unit of balance (scaled by 1e18); each account keeps the
//! accumulator value it was last settled at plus its settled-but-unclaimed
//! revenue:
//!
//! `earned(a) = balance(a) × (rpt − paid(a)) / 1e18 + accrued(a)`
//!
//! Settlement must run before any change to an account's balance or to the
//! deposit total, otherwise later settlements see the wrong principal.

pub mod engine;
pub mod error;
pub mod state;

pub use engine::{AccrualCheckpoint, AccrualEngine};
pub use error::AccrualError;
pub use state::{AccountAccrualState, AccrualFormula, GlobalAccrualState};
