//! In-memory ledger backend.
//!
//! Suitable for embedded single-process deployments and tests. A single
//! mutex serializes every read-modify-write, which trivially satisfies the
//! per-key atomicity contract at this scale.

use super::{
    LedgerStore,
    errors::{LedgerError, LedgerResult},
    models::{ScopeId, UserId},
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory ledger
pub struct MemoryLedger {
    default_balance: i64,
    accounts: Mutex<HashMap<(UserId, ScopeId), i64>>,
}

impl MemoryLedger {
    /// Create an empty ledger; accounts materialize at `default_balance`
    /// on first reference.
    pub fn new(default_balance: i64) -> Self {
        Self {
            default_balance,
            accounts: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn balance(&self, user: UserId, scope: ScopeId) -> LedgerResult<i64> {
        let mut accounts = self.accounts.lock().await;
        Ok(*accounts.entry((user, scope)).or_insert(self.default_balance))
    }

    async fn adjust(&self, user: UserId, scope: ScopeId, delta: i64) -> LedgerResult<i64> {
        let mut accounts = self.accounts.lock().await;
        let balance = accounts.entry((user, scope)).or_insert(self.default_balance);
        let updated = balance
            .checked_add(delta)
            .ok_or(LedgerError::BalanceOverflow)?;
        if updated < 0 {
            return Err(LedgerError::InsufficientFunds {
                available: *balance,
                required: -delta,
            });
        }
        *balance = updated;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_read_creates_at_default() {
        let ledger = MemoryLedger::new(1000);
        assert_eq!(ledger.balance(1, 1).await.unwrap(), 1000);
        // Subsequent adjusts see the created record, not a fresh default.
        assert_eq!(ledger.adjust(1, 1, -250).await.unwrap(), 750);
        assert_eq!(ledger.balance(1, 1).await.unwrap(), 750);
    }

    #[tokio::test]
    async fn test_scopes_are_independent() {
        let ledger = MemoryLedger::new(1000);
        ledger.adjust(1, 1, -400).await.unwrap();
        assert_eq!(ledger.balance(1, 2).await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn test_overdraft_rejected_without_change() {
        let ledger = MemoryLedger::new(100);
        let err = ledger.adjust(7, 1, -150).await.unwrap_err();
        match err {
            LedgerError::InsufficientFunds {
                available,
                required,
            } => {
                assert_eq!(available, 100);
                assert_eq!(required, 150);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ledger.balance(7, 1).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_overflow_rejected() {
        let ledger = MemoryLedger::new(i64::MAX);
        assert!(matches!(
            ledger.adjust(1, 1, 1).await,
            Err(LedgerError::BalanceOverflow)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_deductions_never_overdraw() {
        let ledger = Arc::new(MemoryLedger::new(1000));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(
                async move { ledger.adjust(1, 1, -100).await },
            ));
        }
        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }
        // Exactly ten 100-point deductions fit into 1000.
        assert_eq!(succeeded, 10);
        assert_eq!(ledger.balance(1, 1).await.unwrap(), 0);
    }
}
