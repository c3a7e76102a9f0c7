//! Accrual-specific errors.

use revshare_types::TypesError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccrualError {
    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("arithmetic overflow in accrual computation")]
    Overflow,

    #[error("literal accrual formula underflow: deposited {deposited} < last update time {last_update}")]
    LiteralUnderflow { deposited: u128, last_update: u64 },
}

impl From<TypesError> for AccrualError {
    fn from(_: TypesError) -> Self {
        AccrualError::Overflow
    }
}
