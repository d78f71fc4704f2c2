//! Session lifecycle management.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tokio::time::Duration;

use crate::cards::Shoe;
use crate::config::Config;
use crate::events::SessionEvent;
use crate::ledger::{LedgerStore, ScopeId, UserId};

use super::actor::{SessionActor, SessionMap};
use super::errors::{SessionError, SessionResult};
use super::messages::DecisionReply;
use super::round::{Deal, HandOutcome, HandResult, Natural, Round, RoundView};

const EVENT_CAPACITY: usize = 256;

/// What starting a round produced
#[derive(Clone, Debug)]
pub enum StartOutcome {
    /// A session is live; decisions follow through `hit`/`stand`/etc.
    InPlay(RoundView),
    /// The player was dealt a natural and the round settled on the spot.
    Natural {
        view: RoundView,
        /// Dealer also held 21, so the stake came straight back.
        push: bool,
        payout: i64,
    },
}

/// Manages blackjack sessions, one live round per player.
///
/// Stakes are debited when placed (at start, and again on double/split)
/// and payouts credited once the round completes, so a player's balance
/// only ever reflects money not currently riding on a hand.
pub struct GameManager {
    ledger: Arc<dyn LedgerStore>,
    sessions: SessionMap,
    events: broadcast::Sender<SessionEvent>,
    decision_timeout: Duration,
    dealer_stand: u32,
    natural_payout_num: i64,
    natural_payout_den: i64,
}

impl GameManager {
    pub fn new(ledger: Arc<dyn LedgerStore>, config: &Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            ledger,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            events,
            decision_timeout: config.decision_timeout,
            dealer_stand: config.dealer_stand,
            natural_payout_num: config.natural_payout_num,
            natural_payout_den: config.natural_payout_den,
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Start a round for `player` with a freshly shuffled shoe.
    pub async fn start(
        &self,
        player: UserId,
        scope: ScopeId,
        stake: i64,
    ) -> SessionResult<StartOutcome> {
        self.start_with_shoe(player, scope, stake, Shoe::new()).await
    }

    /// Start a round drawing from the given shoe.
    ///
    /// The stake is debited before the deal; a player already in a round,
    /// or one who cannot cover the stake, is refused before any cards
    /// move. A dealt natural settles immediately and leaves no session
    /// behind.
    pub async fn start_with_shoe(
        &self,
        player: UserId,
        scope: ScopeId,
        stake: i64,
        shoe: Shoe,
    ) -> SessionResult<StartOutcome> {
        if stake <= 0 {
            return Err(SessionError::InvalidStake(stake));
        }
        if self.sessions.read().await.contains_key(&player) {
            return Err(SessionError::GameInProgress);
        }

        self.ledger.adjust(player, scope, -stake).await?;

        let (round, deal) = Round::deal(shoe, stake, self.dealer_stand);

        if let Deal::Natural(natural) = deal {
            return self.settle_natural(player, scope, stake, &round, natural).await;
        }

        let (actor, handle) = SessionActor::new(
            player,
            scope,
            round,
            Arc::clone(&self.ledger),
            Arc::clone(&self.sessions),
            self.events.clone(),
            self.decision_timeout,
        );

        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&player) {
                // Lost the insertion race to a concurrent start; give the
                // stake back and let the other round stand.
                drop(sessions);
                self.refund(player, scope, stake).await;
                return Err(SessionError::GameInProgress);
            }
            sessions.insert(player, handle);
        }

        let view = actor_view_and_spawn(actor);
        let _ = self.events.send(SessionEvent::Started {
            player,
            stake,
            view: view.clone(),
        });
        Ok(StartOutcome::InPlay(view))
    }

    pub async fn hit(&self, player: UserId) -> SessionResult<DecisionReply> {
        self.handle(player).await?.hit().await
    }

    pub async fn stand(&self, player: UserId) -> SessionResult<DecisionReply> {
        self.handle(player).await?.stand().await
    }

    pub async fn double(&self, player: UserId) -> SessionResult<DecisionReply> {
        self.handle(player).await?.double().await
    }

    pub async fn split(&self, player: UserId) -> SessionResult<DecisionReply> {
        self.handle(player).await?.split().await
    }

    /// Snapshot of the player's live round.
    pub async fn view(&self, player: UserId) -> SessionResult<RoundView> {
        self.handle(player).await?.view().await
    }

    /// Whether the player has a round in progress.
    pub async fn in_progress(&self, player: UserId) -> bool {
        self.sessions.read().await.contains_key(&player)
    }

    async fn handle(&self, player: UserId) -> SessionResult<super::actor::SessionHandle> {
        self.sessions
            .read()
            .await
            .get(&player)
            .cloned()
            .ok_or(SessionError::NoSession)
    }

    /// A natural pays the premium (or pushes against a dealer 21)
    /// without ever spawning a session.
    async fn settle_natural(
        &self,
        player: UserId,
        scope: ScopeId,
        stake: i64,
        round: &Round,
        natural: Natural,
    ) -> SessionResult<StartOutcome> {
        let (push, result, payout) = match natural {
            Natural::Push => (true, HandResult::Push, stake),
            Natural::Blackjack => (
                false,
                HandResult::Win,
                stake * self.natural_payout_num / self.natural_payout_den,
            ),
        };
        self.ledger.adjust(player, scope, payout).await?;

        let view = round.view();
        let outcome = HandOutcome {
            cards: view.hands[0].cards.clone(),
            value: view.hands[0].value,
            stake,
            result,
            payout,
        };
        let _ = self.events.send(SessionEvent::Started {
            player,
            stake,
            view: view.clone(),
        });
        let _ = self.events.send(SessionEvent::Completed {
            player,
            outcomes: vec![outcome],
        });
        Ok(StartOutcome::Natural {
            view,
            push,
            payout,
        })
    }

    async fn refund(&self, player: UserId, scope: ScopeId, stake: i64) {
        if let Err(err) = self.ledger.adjust(player, scope, stake).await {
            log::error!(
                "failed to refund blackjack stake of {} to player {}: {}",
                stake,
                player,
                err
            );
        }
    }
}

/// Grab the opening view, then hand the actor to the runtime.
fn actor_view_and_spawn(actor: SessionActor) -> RoundView {
    let view = actor.round_view();
    tokio::spawn(actor.run());
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, Suit};
    use crate::ledger::MemoryLedger;

    fn manager(default_balance: i64) -> GameManager {
        let config = Config {
            default_balance,
            ..Config::default()
        };
        let ledger = Arc::new(MemoryLedger::new(config.default_balance));
        GameManager::new(ledger as Arc<dyn LedgerStore>, &config)
    }

    fn stacked(values: &[u8]) -> Shoe {
        Shoe::stacked(values.iter().map(|v| Card(*v, Suit::Heart)).collect())
    }

    #[tokio::test]
    async fn test_rejects_non_positive_stake() {
        let games = manager(1000);
        assert!(matches!(
            games.start(1, 1, 0).await,
            Err(SessionError::InvalidStake(0))
        ));
        assert!(matches!(
            games.start(1, 1, -5).await,
            Err(SessionError::InvalidStake(-5))
        ));
    }

    #[tokio::test]
    async fn test_rejects_stake_beyond_balance() {
        let games = manager(100);
        assert!(matches!(
            games.start(1, 1, 500).await,
            Err(SessionError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn test_natural_pays_premium_and_leaves_no_session() {
        let games = manager(1000);
        // Player A,K against dealer 9,6.
        let outcome = games
            .start_with_shoe(1, 1, 100, stacked(&[14, 13, 9, 6]))
            .await
            .unwrap();
        match outcome {
            StartOutcome::Natural { push, payout, .. } => {
                assert!(!push);
                assert_eq!(payout, 250);
            }
            StartOutcome::InPlay(_) => panic!("expected a natural"),
        }
        assert!(!games.in_progress(1).await);
    }

    #[tokio::test]
    async fn test_second_start_refused_while_round_live() {
        let games = manager(1000);
        let outcome = games
            .start_with_shoe(1, 1, 100, stacked(&[10, 7, 9, 6, 2]))
            .await
            .unwrap();
        assert!(matches!(outcome, StartOutcome::InPlay(_)));
        assert!(matches!(
            games.start(1, 1, 100).await,
            Err(SessionError::GameInProgress)
        ));
    }

    #[tokio::test]
    async fn test_decision_without_session() {
        let games = manager(1000);
        assert!(matches!(games.hit(42).await, Err(SessionError::NoSession)));
    }
}
