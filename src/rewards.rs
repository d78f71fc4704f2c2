//! Point-funded reward redemption.
//!
//! Rewards buy a real-world effect against another user (a forced
//! disconnect, a temporary mute) through an [`EffectExecutor`] supplied
//! by the embedding application. The cost is debited before the effect
//! runs and refunded if the effect fails, so points only stay spent when
//! the target actually felt it. A mute schedules its own lift after the
//! configured window.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::Duration;

use crate::config::Config;
use crate::events::RewardEvent;
use crate::ledger::{LedgerError, LedgerStore, ScopeId, UserId};

const EVENT_CAPACITY: usize = 64;

/// Purchasable effects
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reward {
    /// Kick the target's active voice connection.
    Disconnect,
    /// Silence the target until the scheduled lift.
    Mute,
}

impl std::fmt::Display for Reward {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnect => write!(f, "disconnect"),
            Self::Mute => write!(f, "mute"),
        }
    }
}

/// Failure applying an effect to its target
#[derive(Clone, Debug, Error)]
#[error("{0}")]
pub struct EffectError(pub String);

/// Applies reward effects in the embedding application.
///
/// Implementations talk to whatever platform the engine is wired into;
/// they should return an error when the target is unreachable so the
/// redemption can be refunded.
#[async_trait::async_trait]
pub trait EffectExecutor: Send + Sync {
    async fn disconnect(&self, target: UserId) -> Result<(), EffectError>;
    async fn set_muted(&self, target: UserId, muted: bool) -> Result<(), EffectError>;
}

#[derive(Debug, Error)]
pub enum RewardError {
    #[error("rewards cannot target their buyer")]
    SelfTarget,
    #[error("insufficient funds: {available} available, {required} required")]
    InsufficientFunds { available: i64, required: i64 },
    #[error("effect failed: {0}")]
    Effect(#[from] EffectError),
    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for RewardError {
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

pub type RewardResult<T> = Result<T, RewardError>;

/// Price list and redemption pipeline for rewards
pub struct RewardBook {
    ledger: Arc<dyn LedgerStore>,
    executor: Arc<dyn EffectExecutor>,
    events: broadcast::Sender<RewardEvent>,
    disconnect_cost: i64,
    mute_cost: i64,
    mute_window: Duration,
}

impl RewardBook {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        executor: Arc<dyn EffectExecutor>,
        config: &Config,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            ledger,
            executor,
            events,
            disconnect_cost: config.disconnect_cost,
            mute_cost: config.mute_cost,
            mute_window: config.mute_window,
        }
    }

    /// Subscribe to reward events.
    pub fn subscribe(&self) -> broadcast::Receiver<RewardEvent> {
        self.events.subscribe()
    }

    /// Price of a reward.
    pub fn cost(&self, reward: Reward) -> i64 {
        match reward {
            Reward::Disconnect => self.disconnect_cost,
            Reward::Mute => self.mute_cost,
        }
    }

    /// Redeem `reward` against `target`, paying from `actor`'s balance in
    /// `scope`.
    ///
    /// # Errors
    ///
    /// `SelfTarget` when actor and target are the same user,
    /// `InsufficientFunds` when the actor cannot cover the cost, and
    /// `Effect` when the executor could not apply the effect — in which
    /// case the cost has already been refunded.
    pub async fn redeem(
        &self,
        actor: UserId,
        scope: ScopeId,
        target: UserId,
        reward: Reward,
    ) -> RewardResult<()> {
        if actor == target {
            return Err(RewardError::SelfTarget);
        }
        let cost = self.cost(reward);
        self.ledger.adjust(actor, scope, -cost).await?;

        let applied = match reward {
            Reward::Disconnect => self.executor.disconnect(target).await,
            Reward::Mute => self.executor.set_muted(target, true).await,
        };

        if let Err(err) = applied {
            log::warn!(
                "refunding {} to user {}: {} on user {} failed: {}",
                cost,
                actor,
                reward,
                target,
                err
            );
            self.refund(actor, scope, cost).await;
            let _ = self.events.send(RewardEvent::Refunded {
                actor,
                reward,
                cost,
            });
            return Err(err.into());
        }

        if reward == Reward::Mute {
            self.schedule_unmute(target);
        }

        let _ = self.events.send(RewardEvent::Redeemed {
            actor,
            target,
            reward,
            cost,
        });
        Ok(())
    }

    fn schedule_unmute(&self, target: UserId) {
        let executor = Arc::clone(&self.executor);
        let events = self.events.clone();
        let window = self.mute_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            match executor.set_muted(target, false).await {
                Ok(()) => {
                    let _ = events.send(RewardEvent::MuteLifted { target });
                }
                Err(err) => {
                    log::error!("failed to lift mute on user {}: {}", target, err);
                }
            }
        });
    }

    async fn refund(&self, actor: UserId, scope: ScopeId, cost: i64) {
        if let Err(err) = self.ledger.adjust(actor, scope, cost).await {
            log::error!("failed to refund reward cost {} to user {}: {}", cost, actor, err);
        }
    }
}
