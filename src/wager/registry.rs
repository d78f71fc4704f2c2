//! Wager registry, consent protocol, and settlement engine.
//!
//! The registry owns the lifecycle of every in-flight wager. Each wager is
//! wrapped in its own `Mutex`, making the wager the unit of mutual
//! exclusion: consent, cancellation, expiry and settlement on one id are
//! serialized, while unrelated ids proceed in parallel. Map guards are
//! never held across a per-wager lock, so the two levels cannot deadlock.
//!
//! A cancel racing a consent is decided by whichever acquires the wager's
//! lock first; the loser observes the terminal status and no-ops. Settled
//! wagers are removed under their own lock, so a repeated resolve observes
//! `NotFound` instead of paying twice.

use super::{
    errors::{WagerError, WagerResult},
    lookup::OutcomeLookup,
    models::{
        Outcome, Participant, Settlement, Wager, WagerId, WagerKind, WagerOutcome, WagerStatus,
    },
};
use crate::config::Config;
use crate::events::WagerEvent;
use crate::ledger::{LedgerError, LedgerStore, ScopeId, UserId};
use chrono::Utc;
use rand::Rng;
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{
    sync::{Mutex, RwLock, broadcast},
    task::JoinHandle,
    time::interval,
};

/// How often the expiry sweep scans for stale pending wagers
const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Capacity of the event broadcast channel
const EVENT_CAPACITY: usize = 256;

/// Concurrent-safe store of in-flight wagers
pub struct WagerRegistry {
    ledger: Arc<dyn LedgerStore>,
    wagers: RwLock<HashMap<WagerId, Arc<Mutex<Wager>>>>,
    events: broadcast::Sender<WagerEvent>,
    consent_ttl: chrono::Duration,
    flip_suspense: Duration,
}

impl WagerRegistry {
    /// Create a new registry
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration (consent TTL, flip suspense)
    /// * `ledger` - Shared balance store
    pub fn new(config: &Config, ledger: Arc<dyn LedgerStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            ledger,
            wagers: RwLock::new(HashMap::new()),
            events,
            consent_ttl: chrono::Duration::from_std(config.consent_ttl)
                .unwrap_or(chrono::Duration::MAX),
            flip_suspense: config.flip_suspense,
        }
    }

    /// Subscribe to wager lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<WagerEvent> {
        self.events.subscribe()
    }

    /// Create a wager in PendingConsent
    ///
    /// Balances are soft-checked here and re-validated at activation.
    ///
    /// # Errors
    ///
    /// * `WagerError::InvalidStake` - stake is not positive
    /// * `WagerError::SelfWager` - both sides are the same participant
    /// * `WagerError::DuplicateWager` - the id is already in flight
    /// * `WagerError::InsufficientFunds` - a participant lacks the stake
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        id: WagerId,
        kind: WagerKind,
        initiator: Participant,
        counterparty: Participant,
        scope: ScopeId,
        stake: i64,
        description: String,
    ) -> WagerResult<WagerStatus> {
        if stake <= 0 {
            return Err(WagerError::InvalidStake(stake));
        }
        if initiator == counterparty {
            return Err(WagerError::SelfWager);
        }

        for participant in [initiator, counterparty] {
            if let Some(user) = participant.user_id() {
                let available = self.ledger.balance(user, scope).await?;
                if available < stake {
                    return Err(WagerError::InsufficientFunds {
                        participant,
                        available,
                        required: stake,
                    });
                }
            }
        }

        let wager = Wager {
            id,
            kind: kind.clone(),
            initiator,
            counterparty,
            scope,
            stake,
            description: description.clone(),
            status: WagerStatus::PendingConsent,
            consented: HashSet::new(),
            created_at: Utc::now(),
        };

        {
            let mut wagers = self.wagers.write().await;
            if wagers.contains_key(&id) {
                return Err(WagerError::DuplicateWager(id));
            }
            wagers.insert(id, Arc::new(Mutex::new(wager)));
        }

        log::info!("wager {id} created ({kind}, stake {stake}, scope {scope})");
        self.emit(WagerEvent::Created {
            id,
            kind,
            initiator,
            counterparty,
            scope,
            stake,
            description,
        });
        Ok(WagerStatus::PendingConsent)
    }

    /// Record a participant's consent, activating the wager once every
    /// distinct user participant has consented.
    ///
    /// A consent from a non-participant, or on a wager no longer pending,
    /// is a no-op that returns the current status. On quorum, both
    /// balances are re-validated at that instant: a shortfall cancels the
    /// wager without charging anyone; otherwise the stake is debited from
    /// each user side and the wager goes Active. Coin flips then schedule
    /// their own resolution after the suspense delay.
    pub async fn record_consent(
        self: &Arc<Self>,
        id: WagerId,
        actor: UserId,
    ) -> WagerResult<WagerStatus> {
        let entry = self.entry(id).await.ok_or(WagerError::NotFound(id))?;
        let mut wager = entry.lock().await;

        if wager.status != WagerStatus::PendingConsent || !wager.is_participant(actor) {
            return Ok(wager.status);
        }

        wager.consented.insert(actor);
        self.emit(WagerEvent::ConsentRecorded {
            id,
            actor,
            status: wager.status,
        });

        if wager.consented.len() < wager.quorum() {
            return Ok(WagerStatus::PendingConsent);
        }

        // Quorum met. Re-validate funds at this instant before any debit.
        for participant in wager.participants() {
            if let Some(user) = participant.user_id() {
                let available = self.ledger.balance(user, wager.scope).await?;
                if available < wager.stake {
                    return self.fail_activation(&mut wager, participant).await;
                }
            }
        }

        // Symmetric deduction: both user sides pay at activation. If the
        // second debit loses a race with another wager, the first is
        // refunded and the wager cancels instead.
        let mut debited: Vec<UserId> = Vec::new();
        for participant in wager.participants() {
            let Some(user) = participant.user_id() else {
                continue;
            };
            match self.ledger.adjust(user, wager.scope, -wager.stake).await {
                Ok(_) => debited.push(user),
                Err(LedgerError::InsufficientFunds { .. }) => {
                    self.refund(&debited, wager.scope, wager.stake).await;
                    return self.fail_activation(&mut wager, participant).await;
                }
                Err(err) => {
                    self.refund(&debited, wager.scope, wager.stake).await;
                    return Err(err.into());
                }
            }
        }

        wager.status = WagerStatus::Active;
        log::info!("wager {id} activated (stake {})", wager.stake);
        self.emit(WagerEvent::Activated {
            id,
            stake: wager.stake,
        });

        if wager.kind.auto_resolves() {
            self.schedule_flip(id);
        }
        Ok(WagerStatus::Active)
    }

    /// Cancel a pending wager. Only the initiator may cancel, and only
    /// while consent is still being collected; no funds move.
    ///
    /// # Errors
    ///
    /// * `WagerError::NotFound` - unknown id
    /// * `WagerError::NotAuthorized` - requester is not the initiator
    /// * `WagerError::InvalidState` - the wager already left PendingConsent
    pub async fn cancel(&self, id: WagerId, requester: UserId) -> WagerResult<()> {
        let entry = self.entry(id).await.ok_or(WagerError::NotFound(id))?;
        let mut wager = entry.lock().await;

        if wager.initiator.user_id() != Some(requester) {
            return Err(WagerError::NotAuthorized);
        }
        if wager.status != WagerStatus::PendingConsent {
            return Err(WagerError::InvalidState(wager.status));
        }

        wager.status = WagerStatus::Cancelled;
        log::info!("wager {id} cancelled by user {requester}");
        self.emit(WagerEvent::Cancelled { id });
        self.remove(id).await;
        Ok(())
    }

    /// Expire every wager still pending past the consent TTL. Returns how
    /// many were expired. No funds move.
    pub async fn expire_pending(&self) -> usize {
        let entries: Vec<(WagerId, Arc<Mutex<Wager>>)> = {
            let wagers = self.wagers.read().await;
            wagers.iter().map(|(id, w)| (*id, Arc::clone(w))).collect()
        };

        let now = Utc::now();
        let mut expired = 0;
        for (id, entry) in entries {
            let mut wager = entry.lock().await;
            if wager.status == WagerStatus::PendingConsent
                && now - wager.created_at >= self.consent_ttl
            {
                wager.status = WagerStatus::Expired;
                log::info!("wager {id} expired");
                self.emit(WagerEvent::Expired { id });
                drop(wager);
                self.remove(id).await;
                expired += 1;
            }
        }
        expired
    }

    /// Spawn the periodic expiry sweep. The task exits when the registry
    /// is dropped.
    pub fn spawn_expiry_sweep(self: &Arc<Self>) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let expired = registry.expire_pending().await;
                if expired > 0 {
                    log::debug!("expiry sweep retired {expired} wager(s)");
                }
            }
        })
    }

    /// Settle an Active wager and pay the winner exactly once.
    ///
    /// Direct stakes require `WagerOutcome::Winner` naming one of the two
    /// participants; outcome predictions require `WagerOutcome::Observed`
    /// and compare it against the stored prediction. Both may only be
    /// resolved by the initiator. Coin flips resolve themselves and reject
    /// outside resolution.
    ///
    /// # Errors
    ///
    /// * `WagerError::NotFound` - unknown (or already settled) id
    /// * `WagerError::NotActive` - the wager has not activated yet
    /// * `WagerError::NotAuthorized` - wrong resolver
    /// * `WagerError::InvalidOutcome` - payload does not fit the kind
    /// * `WagerError::OutcomeUnavailable` - observed outcome was Unknown
    pub async fn resolve(
        &self,
        id: WagerId,
        caller: UserId,
        outcome: WagerOutcome,
    ) -> WagerResult<Settlement> {
        let entry = self.entry(id).await.ok_or(WagerError::NotFound(id))?;
        let mut wager = entry.lock().await;

        if wager.status != WagerStatus::Active {
            return Err(WagerError::NotActive(wager.status));
        }

        let winner = match (&wager.kind, outcome) {
            (WagerKind::CoinFlip, _) => return Err(WagerError::NotAuthorized),
            (WagerKind::DirectStake, WagerOutcome::Winner(declared)) => {
                if wager.initiator.user_id() != Some(caller) {
                    return Err(WagerError::NotAuthorized);
                }
                if !wager.participants().contains(&declared) {
                    return Err(WagerError::InvalidOutcome);
                }
                declared
            }
            (WagerKind::OutcomePrediction { predicted, .. }, WagerOutcome::Observed(observed)) => {
                if wager.initiator.user_id() != Some(caller) {
                    return Err(WagerError::NotAuthorized);
                }
                if observed == Outcome::Unknown {
                    return Err(WagerError::OutcomeUnavailable);
                }
                if observed == *predicted {
                    wager.initiator
                } else {
                    wager.counterparty
                }
            }
            _ => return Err(WagerError::InvalidOutcome),
        };

        self.settle_locked(&mut wager, winner).await
    }

    /// Resolve an outcome prediction against the external lookup. An
    /// `Unknown` answer degrades to requiring a manual outcome.
    pub async fn resolve_with_lookup(
        &self,
        id: WagerId,
        caller: UserId,
        lookup: &dyn OutcomeLookup,
    ) -> WagerResult<Settlement> {
        let subject = {
            let entry = self.entry(id).await.ok_or(WagerError::NotFound(id))?;
            let wager = entry.lock().await;
            match &wager.kind {
                WagerKind::OutcomePrediction { subject, .. } => subject.clone(),
                _ => return Err(WagerError::InvalidOutcome),
            }
        };

        let observed = lookup.lookup(&subject).await;
        if observed == Outcome::Unknown {
            return Err(WagerError::OutcomeUnavailable);
        }
        self.resolve(id, caller, WagerOutcome::Observed(observed)).await
    }

    /// Current status of a wager, if it is still in flight.
    pub async fn status(&self, id: WagerId) -> Option<WagerStatus> {
        let entry = self.entry(id).await?;
        let wager = entry.lock().await;
        Some(wager.status)
    }

    /// Snapshot of a wager, if it is still in flight.
    pub async fn snapshot(&self, id: WagerId) -> Option<Wager> {
        let entry = self.entry(id).await?;
        let wager = entry.lock().await;
        Some(wager.clone())
    }

    /// Number of wagers currently in flight.
    pub async fn len(&self) -> usize {
        self.wagers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.wagers.read().await.is_empty()
    }

    async fn entry(&self, id: WagerId) -> Option<Arc<Mutex<Wager>>> {
        self.wagers.read().await.get(&id).cloned()
    }

    async fn remove(&self, id: WagerId) {
        self.wagers.write().await.remove(&id);
    }

    fn emit(&self, event: WagerEvent) {
        // Best-effort: nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Quorum was met but a participant cannot cover the stake. Cancels
    /// without charging anyone and reports who fell short.
    async fn fail_activation(
        &self,
        wager: &mut Wager,
        broke: Participant,
    ) -> WagerResult<WagerStatus> {
        wager.status = WagerStatus::Cancelled;
        log::info!(
            "wager {} cancelled at activation: {broke} cannot cover stake {}",
            wager.id,
            wager.stake
        );
        self.emit(WagerEvent::ActivationFailed {
            id: wager.id,
            broke,
        });
        self.remove(wager.id).await;
        Ok(WagerStatus::Cancelled)
    }

    /// Return already-taken stakes after a failed activation.
    async fn refund(&self, debited: &[UserId], scope: ScopeId, stake: i64) {
        for user in debited {
            if let Err(err) = self.ledger.adjust(*user, scope, stake).await {
                log::error!("failed to refund {stake} to user {user} in scope {scope}: {err}");
            }
        }
    }

    /// Pay the winner and retire the wager. Called with the per-wager lock
    /// held; removal happens under that same lock, so this runs at most
    /// once per wager.
    async fn settle_locked(
        &self,
        wager: &mut Wager,
        winner: Participant,
    ) -> WagerResult<Settlement> {
        let loser = wager.opponent_of(winner);
        let payout = wager.stake * 2;

        // Credit before marking Resolved: if the credit fails the wager
        // stays Active and resolution can be retried without double-paying.
        if let Some(user) = winner.user_id() {
            self.ledger.adjust(user, wager.scope, payout).await?;
        }

        wager.status = WagerStatus::Resolved;
        log::info!(
            "wager {} resolved: {winner} wins {payout}, {loser} loses {}",
            wager.id,
            wager.stake
        );
        self.emit(WagerEvent::Resolved {
            id: wager.id,
            winner,
            loser,
            payout,
        });
        self.remove(wager.id).await;

        Ok(Settlement {
            id: wager.id,
            winner,
            loser,
            payout,
        })
    }

    /// Schedule the engine-rolled coin flip after the suspense delay. The
    /// per-wager lock is not held across the wait.
    fn schedule_flip(self: &Arc<Self>, id: WagerId) {
        let registry: Weak<Self> = Arc::downgrade(self);
        let suspense = self.flip_suspense;
        tokio::spawn(async move {
            tokio::time::sleep(suspense).await;
            let Some(registry) = registry.upgrade() else {
                return;
            };
            registry.settle_flip(id).await;
        });
    }

    /// Roll the coin and settle. A wager that left Active in the meantime
    /// is left alone.
    async fn settle_flip(&self, id: WagerId) {
        let Some(entry) = self.entry(id).await else {
            return;
        };
        let mut wager = entry.lock().await;
        if wager.status != WagerStatus::Active {
            return;
        }

        let heads = rand::rng().random_bool(0.5);
        let winner = if heads {
            wager.initiator
        } else {
            wager.counterparty
        };
        log::info!(
            "wager {id} coin flip landed {}",
            if heads { "heads" } else { "tails" }
        );
        if let Err(err) = self.settle_locked(&mut wager, winner).await {
            log::error!("coin flip settlement for wager {id} failed: {err}");
        }
    }
}
