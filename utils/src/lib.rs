//! Shared utilities for the revshare ledger.

pub mod logging;

pub use logging::{init_logging, LogFormat};
