//! Engine facade.
//!
//! Ties the ledger, wager registry, blackjack sessions, and reward book
//! together behind a single [`dispatch`] entry point so a presentation
//! layer only ever hands over a [`Command`] and renders the [`Reply`]
//! plus whatever arrives on the event streams.
//!
//! [`dispatch`]: Engine::dispatch

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::blackjack::{DecisionReply, GameManager, SessionError, StartOutcome};
use crate::config::Config;
use crate::events::{Command, RewardEvent, SessionEvent, SlotEvent, WagerEvent};
use crate::ledger::{LedgerResult, LedgerStore, ScopeId, UserId};
use crate::rewards::{EffectExecutor, RewardBook, RewardError};
use crate::slots::{SlotError, SlotMachine, SpinResult};
use crate::wager::{Settlement, WagerError, WagerRegistry, WagerStatus};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Wager(#[from] WagerError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Reward(#[from] RewardError),
    #[error(transparent)]
    Slot(#[from] SlotError),
}

/// Result of a dispatched command
#[derive(Debug)]
pub enum Reply {
    /// The command took effect and carries no further payload.
    Ack,
    /// Wager created or consent recorded; carries the current status.
    WagerStatus(WagerStatus),
    /// A wager settled.
    Settled(Settlement),
    /// A blackjack round started.
    RoundStarted(StartOutcome),
    /// A blackjack decision was applied.
    Decision(DecisionReply),
    /// A slot spin settled.
    Spun(SpinResult),
}

/// The assembled engine
pub struct Engine {
    ledger: Arc<dyn LedgerStore>,
    wagers: Arc<WagerRegistry>,
    games: GameManager,
    rewards: RewardBook,
    slots: SlotMachine,
    sweeper: JoinHandle<()>,
}

impl Engine {
    /// Assemble an engine over the given ledger and effect executor.
    /// Spawns the background sweep that expires stale pending wagers.
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        executor: Arc<dyn EffectExecutor>,
        config: &Config,
    ) -> Self {
        let wagers = Arc::new(WagerRegistry::new(config, Arc::clone(&ledger)));
        let sweeper = wagers.spawn_expiry_sweep();
        let games = GameManager::new(Arc::clone(&ledger), config);
        let rewards = RewardBook::new(Arc::clone(&ledger), executor, config);
        let slots = SlotMachine::new(Arc::clone(&ledger));
        Self {
            ledger,
            wagers,
            games,
            rewards,
            slots,
            sweeper,
        }
    }

    /// Apply one command.
    pub async fn dispatch(&self, command: Command) -> Result<Reply, EngineError> {
        match command {
            Command::CreateWager {
                id,
                kind,
                actor,
                opponent,
                scope,
                stake,
                description,
            } => {
                let status = self
                    .wagers
                    .create(
                        id,
                        kind,
                        crate::wager::Participant::User(actor),
                        opponent,
                        scope,
                        stake,
                        description,
                    )
                    .await?;
                Ok(Reply::WagerStatus(status))
            }
            Command::Consent { id, actor } => {
                let status = self.wagers.record_consent(id, actor).await?;
                Ok(Reply::WagerStatus(status))
            }
            Command::CancelWager { id, actor } => {
                self.wagers.cancel(id, actor).await?;
                Ok(Reply::Ack)
            }
            Command::Resolve { id, actor, outcome } => {
                let settlement = self.wagers.resolve(id, actor, outcome).await?;
                Ok(Reply::Settled(settlement))
            }
            Command::StartBlackjack {
                actor,
                scope,
                stake,
            } => {
                let outcome = self.games.start(actor, scope, stake).await?;
                Ok(Reply::RoundStarted(outcome))
            }
            Command::Hit { actor } => Ok(Reply::Decision(self.games.hit(actor).await?)),
            Command::Stand { actor } => Ok(Reply::Decision(self.games.stand(actor).await?)),
            Command::Double { actor } => Ok(Reply::Decision(self.games.double(actor).await?)),
            Command::Split { actor } => Ok(Reply::Decision(self.games.split(actor).await?)),
            Command::Redeem {
                actor,
                scope,
                reward,
                target,
            } => {
                self.rewards.redeem(actor, scope, target, reward).await?;
                Ok(Reply::Ack)
            }
            Command::Spin { actor, scope, bet } => {
                Ok(Reply::Spun(self.slots.spin(actor, scope, bet).await?))
            }
        }
    }

    /// Current balance for a user in a scope, creating the account at the
    /// default balance on first reference.
    pub async fn balance(&self, user: UserId, scope: ScopeId) -> LedgerResult<i64> {
        self.ledger.balance(user, scope).await
    }

    pub fn wagers(&self) -> &Arc<WagerRegistry> {
        &self.wagers
    }

    pub fn games(&self) -> &GameManager {
        &self.games
    }

    pub fn rewards(&self) -> &RewardBook {
        &self.rewards
    }

    pub fn slots(&self) -> &SlotMachine {
        &self.slots
    }

    pub fn subscribe_wagers(&self) -> broadcast::Receiver<WagerEvent> {
        self.wagers.subscribe()
    }

    pub fn subscribe_sessions(&self) -> broadcast::Receiver<SessionEvent> {
        self.games.subscribe()
    }

    pub fn subscribe_rewards(&self) -> broadcast::Receiver<RewardEvent> {
        self.rewards.subscribe()
    }

    pub fn subscribe_slots(&self) -> broadcast::Receiver<SlotEvent> {
        self.slots.subscribe()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

/// Executor for deployments that have no effect surface to drive; every
/// redemption is refused (and therefore refunded).
pub struct NoopExecutor;

#[async_trait::async_trait]
impl EffectExecutor for NoopExecutor {
    async fn disconnect(&self, _target: UserId) -> Result<(), crate::rewards::EffectError> {
        Err(crate::rewards::EffectError("no effect surface".into()))
    }

    async fn set_muted(
        &self,
        _target: UserId,
        _muted: bool,
    ) -> Result<(), crate::rewards::EffectError> {
        Err(crate::rewards::EffectError("no effect surface".into()))
    }
}
