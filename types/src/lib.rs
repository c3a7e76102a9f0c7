//! Fundamental types for the revshare ledger.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: account addresses, timestamps, the capabilities the ledger
//! consumes from its environment, and 1e18 fixed-point helpers.

pub mod address;
pub mod capability;
pub mod error;
pub mod fixed;
pub mod time;

pub use address::Address;
pub use capability::{AccessControl, Clock, SingleAdministrator, SystemClock, ValueTransfer};
pub use error::TypesError;
pub use fixed::{mul_div, SCALE};
pub use time::Timestamp;
