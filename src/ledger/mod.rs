//! Ledger module providing the point balance store.
//!
//! Balances are keyed by (user, scope) and created lazily with a default
//! starting value on first reference. All mutation goes through [`adjust`],
//! which is atomic per key: two simultaneous deductions can never race to
//! read-modify-write the same stale balance.
//!
//! Multi-key transfers (stake moved from one member to another) are two
//! sequential `adjust` calls and are not atomic as a pair; a crash between
//! them leaves funds debited but unpaid. That gap is accepted and documented
//! rather than papered over — the Postgres backend's entry rows are the
//! reconciliation trail.
//!
//! [`adjust`]: LedgerStore::adjust

pub mod errors;
pub mod memory;
pub mod models;
pub mod postgres;

pub use errors::{LedgerError, LedgerResult};
pub use memory::MemoryLedger;
pub use models::{EntryDirection, LedgerEntry, ScopeId, UserId};
pub use postgres::PgLedger;

use async_trait::async_trait;

/// Storage backend for point balances.
///
/// Implementations must guarantee per-(user, scope) atomicity of `adjust`
/// independent of any wager or session lock, since one user can be a
/// participant in many concurrent wagers and games.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Current balance for a user in a scope, creating the record with the
    /// configured default on first reference.
    async fn balance(&self, user: UserId, scope: ScopeId) -> LedgerResult<i64>;

    /// Atomically add `delta` (may be negative) to a balance and return the
    /// new value.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InsufficientFunds` - a negative delta would drive the
    ///   balance below zero; nothing is applied
    /// * `LedgerError::BalanceOverflow` - the adjustment would overflow
    async fn adjust(&self, user: UserId, scope: ScopeId, delta: i64) -> LedgerResult<i64>;
}
