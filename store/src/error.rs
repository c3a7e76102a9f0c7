use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: u128, available: u128 },

    #[error("the zero address cannot {0}")]
    ZeroAddress(&'static str),

    #[error("total supply overflow")]
    SupplyOverflow,
}
