//! Session actor: one task per active blackjack round.
//!
//! The actor serializes all decisions for its player through an mpsc
//! inbox and enforces the decision deadline with a `select!` timer. When
//! the round completes (by play or by timeout) the actor settles against
//! the ledger, removes itself from the session map, and exits.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc, oneshot};
use tokio::time::{Duration, Instant, sleep_until};

use crate::events::SessionEvent;
use crate::ledger::{LedgerStore, ScopeId, UserId};

use super::errors::{SessionError, SessionResult};
use super::messages::{DecisionReply, SessionMessage};
use super::round::{HandOutcome, Progress, Round, RoundView};

/// Shared map of live sessions, keyed by player.
pub(super) type SessionMap = Arc<RwLock<HashMap<UserId, SessionHandle>>>;

/// What handling an inbox message did to the round. Only an accepted
/// decision moves the idle deadline; a view or a refused decision cannot
/// keep an abandoned round alive.
enum Disposition {
    Acted,
    Settled,
    Ignored,
}

/// Handle for sending decisions to a session actor
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
}

impl SessionHandle {
    pub async fn hit(&self) -> SessionResult<DecisionReply> {
        self.decide(|respond| SessionMessage::Hit { respond }).await
    }

    pub async fn stand(&self) -> SessionResult<DecisionReply> {
        self.decide(|respond| SessionMessage::Stand { respond })
            .await
    }

    pub async fn double(&self) -> SessionResult<DecisionReply> {
        self.decide(|respond| SessionMessage::Double { respond })
            .await
    }

    pub async fn split(&self) -> SessionResult<DecisionReply> {
        self.decide(|respond| SessionMessage::Split { respond })
            .await
    }

    pub async fn view(&self) -> SessionResult<RoundView> {
        let (respond, reply) = oneshot::channel();
        self.sender
            .send(SessionMessage::View { respond })
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        reply.await.map_err(|_| SessionError::SessionClosed)
    }

    async fn decide(
        &self,
        message: impl FnOnce(oneshot::Sender<SessionResult<DecisionReply>>) -> SessionMessage,
    ) -> SessionResult<DecisionReply> {
        let (respond, reply) = oneshot::channel();
        self.sender
            .send(message(respond))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        reply.await.map_err(|_| SessionError::SessionClosed)?
    }
}

/// Actor driving one round for one player
pub(super) struct SessionActor {
    player: UserId,
    scope: ScopeId,
    round: Round,
    inbox: mpsc::Receiver<SessionMessage>,
    ledger: Arc<dyn LedgerStore>,
    sessions: SessionMap,
    events: broadcast::Sender<SessionEvent>,
    decision_timeout: Duration,
}

impl SessionActor {
    pub(super) fn new(
        player: UserId,
        scope: ScopeId,
        round: Round,
        ledger: Arc<dyn LedgerStore>,
        sessions: SessionMap,
        events: broadcast::Sender<SessionEvent>,
        decision_timeout: Duration,
    ) -> (Self, SessionHandle) {
        let (sender, inbox) = mpsc::channel(16);
        let actor = Self {
            player,
            scope,
            round,
            inbox,
            ledger,
            sessions,
            events,
            decision_timeout,
        };
        (actor, SessionHandle { sender })
    }

    pub(super) fn round_view(&self) -> RoundView {
        self.round.view()
    }

    /// Event loop: an accepted decision resets the deadline; a lapsed
    /// deadline stands the current sub-hand on the player's behalf, and a
    /// remaining split hand gets a fresh window of its own.
    pub(super) async fn run(mut self) {
        let mut deadline = Instant::now() + self.decision_timeout;

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    let Some(message) = message else { break };
                    match self.handle_message(message).await {
                        Disposition::Acted => {
                            deadline = Instant::now() + self.decision_timeout;
                        }
                        Disposition::Settled => break,
                        Disposition::Ignored => {}
                    }
                }
                _ = sleep_until(deadline) => {
                    log::info!(
                        "blackjack session for player {} timed out; standing",
                        self.player
                    );
                    let _ = self.events.send(SessionEvent::TimedOut { player: self.player });
                    match self.round.stand() {
                        Progress::Continue => {
                            deadline = Instant::now() + self.decision_timeout;
                            let _ = self.events.send(SessionEvent::StateChanged {
                                player: self.player,
                                view: self.round.view(),
                            });
                        }
                        Progress::Complete(outcomes) => {
                            self.settle(&outcomes).await;
                            break;
                        }
                    }
                }
            }
        }

        self.sessions.write().await.remove(&self.player);
    }

    async fn handle_message(&mut self, message: SessionMessage) -> Disposition {
        match message {
            SessionMessage::Hit { respond } => {
                let progress = self.round.hit();
                self.reply(respond, Ok(progress)).await
            }
            SessionMessage::Stand { respond } => {
                let progress = self.round.stand();
                self.reply(respond, Ok(progress)).await
            }
            SessionMessage::Double { respond } => {
                let progress = self.double().await;
                self.reply(respond, progress).await
            }
            SessionMessage::Split { respond } => {
                let progress = self.split().await;
                self.reply(respond, progress).await
            }
            SessionMessage::View { respond } => {
                let _ = respond.send(self.round.view());
                Disposition::Ignored
            }
        }
    }

    /// The extra stake is debited before the round mutates; the capability
    /// check comes first so a refused double never touches the ledger.
    async fn double(&mut self) -> SessionResult<Progress> {
        if !self.round.can_double() {
            return Err(SessionError::DoubleUnavailable);
        }
        let extra = self.round.current_stake();
        self.ledger.adjust(self.player, self.scope, -extra).await?;
        self.round.double()
    }

    async fn split(&mut self) -> SessionResult<Progress> {
        if !self.round.can_split() {
            return Err(SessionError::SplitUnavailable);
        }
        let extra = self.round.current_stake();
        self.ledger.adjust(self.player, self.scope, -extra).await?;
        self.round.split()
    }

    async fn reply(
        &mut self,
        respond: oneshot::Sender<SessionResult<DecisionReply>>,
        progress: SessionResult<Progress>,
    ) -> Disposition {
        match progress {
            Ok(Progress::Continue) => {
                let view = self.round.view();
                let _ = self.events.send(SessionEvent::StateChanged {
                    player: self.player,
                    view: view.clone(),
                });
                let _ = respond.send(Ok(DecisionReply {
                    view,
                    outcomes: None,
                }));
                Disposition::Acted
            }
            Ok(Progress::Complete(outcomes)) => {
                self.settle(&outcomes).await;
                let _ = respond.send(Ok(DecisionReply {
                    view: self.round.view(),
                    outcomes: Some(outcomes),
                }));
                Disposition::Settled
            }
            Err(err) => {
                let _ = respond.send(Err(err));
                Disposition::Ignored
            }
        }
    }

    /// Credit the total payout in one adjustment. Stakes were debited up
    /// front, so a zero payout needs no ledger touch at all.
    async fn settle(&mut self, outcomes: &[HandOutcome]) {
        let payout: i64 = outcomes.iter().map(|outcome| outcome.payout).sum();
        if payout > 0
            && let Err(err) = self.ledger.adjust(self.player, self.scope, payout).await
        {
            log::error!(
                "failed to credit blackjack payout of {} to player {}: {}",
                payout,
                self.player,
                err
            );
        }
        let _ = self.events.send(SessionEvent::Completed {
            player: self.player,
            outcomes: outcomes.to_vec(),
        });
    }
}
