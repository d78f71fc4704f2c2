//! Ledger error types.

use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A deduction would drive the balance below zero
    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    /// A credit would overflow the balance
    #[error("balance overflow")]
    BalanceOverflow,
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
