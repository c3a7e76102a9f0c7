use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DelegationError {
    #[error("cannot delegate to the zero address")]
    ZeroTarget,

    #[error("the zero address cannot delegate")]
    ZeroDelegator,
}
