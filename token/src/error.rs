use revshare_accrual::AccrualError;
use revshare_delegation::DelegationError;
use revshare_store::StoreError;
use revshare_types::Address;
use thiserror::Error;

/// Rejection of a single ledger operation.
///
/// Every variant means the operation left no trace: state is exactly as it
/// was before the call. Nothing is retried internally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("transfers are locked for {0}")]
    TransfersLocked(Address),

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: u128, available: u128 },

    #[error("{0} is not the administrator")]
    Unauthorized(Address),

    #[error("value transfer of {amount} to {to} failed")]
    TransferFailed { to: Address, amount: u128 },

    #[error("no excess value to withdraw")]
    NothingToWithdraw,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("re-entrant call into the ledger")]
    Reentrant,

    #[error("ledger state lock poisoned")]
    Poisoned,

    #[error("accrual error: {0}")]
    Accrual(AccrualError),

    #[error("delegation error: {0}")]
    Delegation(#[from] DelegationError),

    #[error("config error: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl From<AccrualError> for TokenError {
    fn from(e: AccrualError) -> Self {
        match e {
            AccrualError::InvalidAmount => TokenError::InvalidAmount,
            AccrualError::Overflow => TokenError::Overflow,
            other => TokenError::Accrual(other),
        }
    }
}

impl From<StoreError> for TokenError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InsufficientBalance { needed, available } => {
                TokenError::InsufficientBalance { needed, available }
            }
            StoreError::InsufficientAllowance { needed, available } => {
                TokenError::InsufficientAllowance { needed, available }
            }
            StoreError::ZeroAddress(action) => {
                TokenError::InvalidAddress(format!("the zero address cannot {action}"))
            }
            StoreError::SupplyOverflow => TokenError::Overflow,
        }
    }
}
