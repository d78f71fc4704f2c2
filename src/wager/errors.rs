//! Wager error types.

use super::models::{Participant, WagerId, WagerStatus};
use crate::ledger::LedgerError;
use thiserror::Error;

/// Wager errors
#[derive(Debug, Error)]
pub enum WagerError {
    /// Stake must be a positive integer
    #[error("invalid stake: {0}")]
    InvalidStake(i64),

    /// Both sides of the wager are the same participant
    #[error("can't wager against yourself")]
    SelfWager,

    /// A wager with this id already exists
    #[error("wager {0} already exists")]
    DuplicateWager(WagerId),

    /// No wager with this id (also the idempotency guard: settled wagers
    /// are removed, so a repeated resolve lands here)
    #[error("wager {0} not found")]
    NotFound(WagerId),

    /// A participant lacks the stake
    #[error("{participant} has insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        participant: Participant,
        available: i64,
        required: i64,
    },

    /// The caller may not perform this operation on this wager
    #[error("not authorized")]
    NotAuthorized,

    /// Resolution requires an Active wager
    #[error("wager is not active (status: {0})")]
    NotActive(WagerStatus),

    /// The operation is not valid in the wager's current state
    #[error("invalid state for this operation (status: {0})")]
    InvalidState(WagerStatus),

    /// The supplied outcome does not fit the wager's kind
    #[error("outcome does not fit this wager kind")]
    InvalidOutcome,

    /// The external lookup could not determine a result; supply the
    /// outcome manually
    #[error("outcome unavailable; resolve manually")]
    OutcomeUnavailable,

    /// Ledger error
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result type for wager operations
pub type WagerResult<T> = Result<T, WagerError>;
