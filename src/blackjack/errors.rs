use thiserror::Error;

use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("stake must be positive, got {0}")]
    InvalidStake(i64),
    #[error("a round is already in progress")]
    GameInProgress,
    #[error("no round in progress")]
    NoSession,
    #[error("doubling is only allowed on a two-card hand")]
    DoubleUnavailable,
    #[error("splitting requires a two-card pair of equal value")]
    SplitUnavailable,
    #[error("the session has already ended")]
    SessionClosed,
    #[error("insufficient funds: {available} available, {required} required")]
    InsufficientFunds { available: i64, required: i64 },
    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for SessionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                available,
                required,
            } => Self::InsufficientFunds {
                available,
                required,
            },
            other => Self::Ledger(other),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
