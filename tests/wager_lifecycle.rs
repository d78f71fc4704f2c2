//! Integration tests for the wager lifecycle: consent quorum, activation
//! funding, settlement, expiry, and point conservation.

use std::sync::Arc;
use std::time::Duration;

use stakehouse::wager::{
    Outcome, Participant, StaticLookup, WagerOutcome, WagerRegistry, WagerStatus,
};
use stakehouse::{Config, LedgerStore, MemoryLedger, WagerError, WagerKind};

const SCOPE: i64 = 42;

fn setup(default_balance: i64) -> (Arc<WagerRegistry>, Arc<MemoryLedger>) {
    setup_with(Config {
        default_balance,
        ..Config::default()
    })
}

fn setup_with(config: Config) -> (Arc<WagerRegistry>, Arc<MemoryLedger>) {
    let ledger = Arc::new(MemoryLedger::new(config.default_balance));
    let registry = Arc::new(WagerRegistry::new(
        &config,
        Arc::clone(&ledger) as Arc<dyn LedgerStore>,
    ));
    (registry, ledger)
}

async fn create_direct(registry: &Arc<WagerRegistry>, id: u64, a: i64, b: i64, stake: i64) {
    registry
        .create(
            id,
            WagerKind::DirectStake,
            Participant::User(a),
            Participant::User(b),
            SCOPE,
            stake,
            "who wins the next match".into(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_direct_stake_full_lifecycle_conserves_points() {
    let (registry, ledger) = setup(1000);
    create_direct(&registry, 1, 1, 2, 150).await;

    assert_eq!(
        registry.record_consent(1, 1).await.unwrap(),
        WagerStatus::PendingConsent
    );
    assert_eq!(
        registry.record_consent(1, 2).await.unwrap(),
        WagerStatus::Active
    );

    // Both stakes held while active.
    assert_eq!(ledger.balance(1, SCOPE).await.unwrap(), 850);
    assert_eq!(ledger.balance(2, SCOPE).await.unwrap(), 850);

    let settlement = registry
        .resolve(1, 1, WagerOutcome::Winner(Participant::User(2)))
        .await
        .unwrap();
    assert_eq!(settlement.winner, Participant::User(2));
    assert_eq!(settlement.payout, 300);

    let a = ledger.balance(1, SCOPE).await.unwrap();
    let b = ledger.balance(2, SCOPE).await.unwrap();
    assert_eq!(a, 850);
    assert_eq!(b, 1150);
    assert_eq!(a + b, 2000);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_repeated_resolve_pays_once() {
    let (registry, _) = setup(1000);
    create_direct(&registry, 1, 1, 2, 100).await;
    registry.record_consent(1, 1).await.unwrap();
    registry.record_consent(1, 2).await.unwrap();

    registry
        .resolve(1, 1, WagerOutcome::Winner(Participant::User(1)))
        .await
        .unwrap();

    // The wager is gone; a second resolve cannot pay again.
    let err = registry
        .resolve(1, 1, WagerOutcome::Winner(Participant::User(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, WagerError::NotFound(1)));
}

#[tokio::test]
async fn test_concurrent_consents_debit_each_side_once() {
    let (registry, ledger) = setup(1000);
    create_direct(&registry, 1, 1, 2, 100).await;

    let (a, b) = tokio::join!(registry.record_consent(1, 1), registry.record_consent(1, 2));
    a.unwrap();
    b.unwrap();

    assert_eq!(registry.status(1).await, Some(WagerStatus::Active));
    assert_eq!(ledger.balance(1, SCOPE).await.unwrap(), 900);
    assert_eq!(ledger.balance(2, SCOPE).await.unwrap(), 900);
}

#[tokio::test]
async fn test_duplicate_consent_does_not_stack() {
    let (registry, ledger) = setup(1000);
    create_direct(&registry, 1, 1, 2, 100).await;

    registry.record_consent(1, 1).await.unwrap();
    registry.record_consent(1, 1).await.unwrap();
    assert_eq!(registry.status(1).await, Some(WagerStatus::PendingConsent));
    assert_eq!(ledger.balance(1, SCOPE).await.unwrap(), 1000);
}

#[tokio::test]
async fn test_cancel_only_before_activation() {
    let (registry, _) = setup(1000);
    create_direct(&registry, 1, 1, 2, 100).await;

    // Counterparty may not cancel.
    assert!(matches!(
        registry.cancel(1, 2).await,
        Err(WagerError::NotAuthorized)
    ));

    registry.record_consent(1, 1).await.unwrap();
    registry.record_consent(1, 2).await.unwrap();
    assert!(matches!(
        registry.cancel(1, 1).await,
        Err(WagerError::InvalidState(WagerStatus::Active))
    ));
}

#[tokio::test]
async fn test_cancelled_wager_moves_no_funds() {
    let (registry, ledger) = setup(1000);
    create_direct(&registry, 1, 1, 2, 100).await;
    registry.record_consent(1, 2).await.unwrap();
    registry.cancel(1, 1).await.unwrap();

    assert_eq!(registry.status(1).await, None);
    assert_eq!(ledger.balance(1, SCOPE).await.unwrap(), 1000);
    assert_eq!(ledger.balance(2, SCOPE).await.unwrap(), 1000);
}

#[tokio::test]
async fn test_pending_wagers_expire_after_ttl() {
    let (registry, ledger) = setup_with(Config {
        consent_ttl: Duration::ZERO,
        ..Config::default()
    });
    create_direct(&registry, 1, 1, 2, 100).await;
    registry.record_consent(1, 1).await.unwrap();

    assert_eq!(registry.expire_pending().await, 1);
    assert_eq!(registry.status(1).await, None);
    assert_eq!(ledger.balance(1, SCOPE).await.unwrap(), 1000);
}

#[tokio::test]
async fn test_activation_shortfall_cancels_without_charging() {
    let (registry, ledger) = setup(1000);
    // Two wagers both leaning on user 1's 1000 points.
    create_direct(&registry, 1, 1, 2, 600).await;
    create_direct(&registry, 2, 1, 3, 600).await;

    registry.record_consent(1, 1).await.unwrap();
    registry.record_consent(1, 2).await.unwrap();
    assert_eq!(ledger.balance(1, SCOPE).await.unwrap(), 400);

    // User 1 can no longer cover the second stake; quorum fails it.
    registry.record_consent(2, 1).await.unwrap();
    let status = registry.record_consent(2, 3).await.unwrap();
    assert_eq!(status, WagerStatus::Cancelled);
    assert_eq!(registry.status(2).await, None);
    assert_eq!(ledger.balance(1, SCOPE).await.unwrap(), 400);
    assert_eq!(ledger.balance(3, SCOPE).await.unwrap(), 1000);
}

#[tokio::test(start_paused = true)]
async fn test_coin_flip_settles_itself_after_suspense() {
    let (registry, ledger) = setup(1000);
    registry
        .create(
            1,
            WagerKind::CoinFlip,
            Participant::User(1),
            Participant::User(2),
            SCOPE,
            100,
            "heads or tails".into(),
        )
        .await
        .unwrap();
    registry.record_consent(1, 1).await.unwrap();
    registry.record_consent(1, 2).await.unwrap();

    // A flip refuses outside resolution while it waits for the roll.
    assert!(matches!(
        registry
            .resolve(1, 1, WagerOutcome::Winner(Participant::User(1)))
            .await,
        Err(WagerError::NotAuthorized)
    ));

    // Let the suspense delay lapse and the spawned roll run.
    tokio::time::sleep(Duration::from_secs(5)).await;
    for _ in 0..10 {
        if registry.is_empty().await {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(registry.is_empty().await);

    let a = ledger.balance(1, SCOPE).await.unwrap();
    let b = ledger.balance(2, SCOPE).await.unwrap();
    assert_eq!(a + b, 2000);
    // Exactly one side is up the stake.
    assert!((a == 1100 && b == 900) || (a == 900 && b == 1100));
}

#[tokio::test]
async fn test_prediction_settles_against_observed_outcome() {
    let (registry, ledger) = setup(1000);
    registry
        .create(
            1,
            WagerKind::OutcomePrediction {
                subject: "ranked_match".into(),
                predicted: Outcome::Win,
            },
            Participant::User(1),
            Participant::User(2),
            SCOPE,
            200,
            "they win this one".into(),
        )
        .await
        .unwrap();
    registry.record_consent(1, 1).await.unwrap();
    registry.record_consent(1, 2).await.unwrap();

    // Observation contradicts the prediction, so the counterparty wins.
    let settlement = registry
        .resolve(1, 1, WagerOutcome::Observed(Outcome::Lose))
        .await
        .unwrap();
    assert_eq!(settlement.winner, Participant::User(2));
    assert_eq!(ledger.balance(2, SCOPE).await.unwrap(), 1200);
}

#[tokio::test]
async fn test_prediction_via_lookup() {
    let (registry, _) = setup(1000);
    registry
        .create(
            1,
            WagerKind::OutcomePrediction {
                subject: "ranked_match".into(),
                predicted: Outcome::Win,
            },
            Participant::User(1),
            Participant::User(2),
            SCOPE,
            200,
            "calling the win".into(),
        )
        .await
        .unwrap();
    registry.record_consent(1, 1).await.unwrap();
    registry.record_consent(1, 2).await.unwrap();

    let mut lookup = StaticLookup::default();
    lookup.set("ranked_match", Outcome::Win);
    let settlement = registry.resolve_with_lookup(1, 1, &lookup).await.unwrap();
    assert_eq!(settlement.winner, Participant::User(1));
}

#[tokio::test]
async fn test_unknown_lookup_leaves_wager_active() {
    let (registry, _) = setup(1000);
    registry
        .create(
            1,
            WagerKind::OutcomePrediction {
                subject: "unfinished_match".into(),
                predicted: Outcome::Win,
            },
            Participant::User(1),
            Participant::User(2),
            SCOPE,
            200,
            "too early to tell".into(),
        )
        .await
        .unwrap();
    registry.record_consent(1, 1).await.unwrap();
    registry.record_consent(1, 2).await.unwrap();

    let lookup = StaticLookup::default();
    assert!(matches!(
        registry.resolve_with_lookup(1, 1, &lookup).await,
        Err(WagerError::OutcomeUnavailable)
    ));
    assert_eq!(registry.status(1).await, Some(WagerStatus::Active));
}

#[tokio::test]
async fn test_only_initiator_resolves() {
    let (registry, _) = setup(1000);
    create_direct(&registry, 1, 1, 2, 100).await;
    registry.record_consent(1, 1).await.unwrap();
    registry.record_consent(1, 2).await.unwrap();

    assert!(matches!(
        registry
            .resolve(1, 2, WagerOutcome::Winner(Participant::User(2)))
            .await,
        Err(WagerError::NotAuthorized)
    ));
}

#[tokio::test]
async fn test_resolve_before_activation_refused() {
    let (registry, _) = setup(1000);
    create_direct(&registry, 1, 1, 2, 100).await;
    registry.record_consent(1, 1).await.unwrap();

    assert!(matches!(
        registry
            .resolve(1, 1, WagerOutcome::Winner(Participant::User(1)))
            .await,
        Err(WagerError::NotActive(WagerStatus::PendingConsent))
    ));
}

#[tokio::test]
async fn test_independent_wagers_settle_independently() {
    let (registry, ledger) = setup(1000);
    create_direct(&registry, 1, 1, 2, 100).await;
    create_direct(&registry, 2, 3, 4, 250).await;

    for (id, a, b) in [(1u64, 1i64, 2i64), (2, 3, 4)] {
        registry.record_consent(id, a).await.unwrap();
        registry.record_consent(id, b).await.unwrap();
    }

    registry
        .resolve(1, 1, WagerOutcome::Winner(Participant::User(1)))
        .await
        .unwrap();
    registry
        .resolve(2, 3, WagerOutcome::Winner(Participant::User(4)))
        .await
        .unwrap();

    assert_eq!(ledger.balance(1, SCOPE).await.unwrap(), 1100);
    assert_eq!(ledger.balance(2, SCOPE).await.unwrap(), 900);
    assert_eq!(ledger.balance(3, SCOPE).await.unwrap(), 750);
    assert_eq!(ledger.balance(4, SCOPE).await.unwrap(), 1250);
}
