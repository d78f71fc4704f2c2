//! Postgres ledger backend.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE balances (
//!     user_id    BIGINT NOT NULL,
//!     scope_id   BIGINT NOT NULL,
//!     points     BIGINT NOT NULL,
//!     updated_at TIMESTAMP NOT NULL DEFAULT NOW(),
//!     PRIMARY KEY (user_id, scope_id)
//! );
//!
//! CREATE TABLE ledger_entries (
//!     id              BIGSERIAL PRIMARY KEY,
//!     user_id         BIGINT NOT NULL,
//!     scope_id        BIGINT NOT NULL,
//!     amount          BIGINT NOT NULL,
//!     balance_after   BIGINT NOT NULL,
//!     direction       TEXT NOT NULL,
//!     idempotency_key TEXT NOT NULL UNIQUE,
//!     created_at      TIMESTAMP NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! Adjustments are a single conditional UPDATE so the balance check and the
//! write happen atomically; the entry row is the audit trail used for
//! manual reconciliation of interrupted two-step transfers.

use super::{
    LedgerStore,
    errors::{LedgerError, LedgerResult},
    models::{EntryDirection, ScopeId, UserId},
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;

/// Postgres-backed ledger
#[derive(Clone)]
pub struct PgLedger {
    pool: Arc<PgPool>,
    default_balance: i64,
}

impl PgLedger {
    /// Create a new Postgres ledger
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `default_balance` - Balance granted on first reference
    pub fn new(pool: Arc<PgPool>, default_balance: i64) -> Self {
        Self {
            pool,
            default_balance,
        }
    }

    /// Create the balance row if it does not exist yet.
    async fn ensure_account(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user: UserId,
        scope: ScopeId,
    ) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO balances (user_id, scope_id, points)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, scope_id) DO NOTHING",
        )
        .bind(user)
        .bind(scope)
        .bind(self.default_balance)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn balance(&self, user: UserId, scope: ScopeId) -> LedgerResult<i64> {
        let mut tx = self.pool.begin().await?;
        self.ensure_account(&mut tx, user, scope).await?;
        let row = sqlx::query("SELECT points FROM balances WHERE user_id = $1 AND scope_id = $2")
            .bind(user)
            .bind(scope)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row.get("points"))
    }

    async fn adjust(&self, user: UserId, scope: ScopeId, delta: i64) -> LedgerResult<i64> {
        let mut tx = self.pool.begin().await?;
        self.ensure_account(&mut tx, user, scope).await?;

        // Atomic check-and-update; no row comes back when the deduction
        // would overdraw.
        let updated = sqlx::query(
            "UPDATE balances
             SET points = points + $1, updated_at = NOW()
             WHERE user_id = $2 AND scope_id = $3 AND points + $1 >= 0
             RETURNING points",
        )
        .bind(delta)
        .bind(user)
        .bind(scope)
        .fetch_optional(&mut *tx)
        .await?;

        let new_balance: i64 = match updated {
            Some(row) => row.get("points"),
            None => {
                let row = sqlx::query(
                    "SELECT points FROM balances WHERE user_id = $1 AND scope_id = $2",
                )
                .bind(user)
                .bind(scope)
                .fetch_one(&mut *tx)
                .await?;
                let available: i64 = row.get("points");
                return Err(LedgerError::InsufficientFunds {
                    available,
                    required: -delta,
                });
            }
        };

        let direction = if delta < 0 {
            EntryDirection::Debit
        } else {
            EntryDirection::Credit
        };
        sqlx::query(
            "INSERT INTO ledger_entries
                 (user_id, scope_id, amount, balance_after, direction, idempotency_key)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user)
        .bind(scope)
        .bind(delta)
        .bind(new_balance)
        .bind(direction.to_string())
        .bind(Uuid::new_v4().to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(new_balance)
    }
}
