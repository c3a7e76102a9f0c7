//! Errors raised while parsing or computing core types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}
