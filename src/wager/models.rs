//! Wager data models.

use crate::ledger::{ScopeId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Wager ID type, derived from the originating request (e.g. a message
/// identifier)
pub type WagerId = u64;

/// One side of a wager: a real member, or the house standing in for one
/// (solo wagers, scripted opponents). The house consents implicitly, is
/// skipped by every ledger operation, and absorbs its own side of payouts.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Participant {
    User(UserId),
    House,
}

impl Participant {
    /// The user id, if this participant is a real member.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::House => None,
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user {id}"),
            Self::House => write!(f, "house"),
        }
    }
}

/// Result of an externally observed event (a match, a game).
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
    Unknown,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Win => write!(f, "win"),
            Self::Lose => write!(f, "lose"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// What kind of wager this is, with the kind-specific payload.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum WagerKind {
    /// Free-form stake; the initiator declares the winner at resolution.
    DirectStake,
    /// Engine-rolled 50/50; resolves itself after the suspense delay.
    CoinFlip,
    /// The initiator predicts the outcome of a named subject's next match;
    /// settlement compares the observed outcome against the prediction.
    OutcomePrediction { subject: String, predicted: Outcome },
}

impl WagerKind {
    /// Whether the engine resolves this wager on its own after activation.
    pub fn auto_resolves(&self) -> bool {
        matches!(self, Self::CoinFlip)
    }
}

impl fmt::Display for WagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectStake => write!(f, "direct-stake"),
            Self::CoinFlip => write!(f, "coin-flip"),
            Self::OutcomePrediction { .. } => write!(f, "outcome-prediction"),
        }
    }
}

/// Wager lifecycle states. Transitions are monotonic; Resolved, Cancelled
/// and Expired are terminal.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WagerStatus {
    PendingConsent,
    Active,
    Resolved,
    Cancelled,
    Expired,
}

impl WagerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled | Self::Expired)
    }
}

impl fmt::Display for WagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingConsent => write!(f, "pending_consent"),
            Self::Active => write!(f, "active"),
            Self::Resolved => write!(f, "resolved"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// A proposed stake between two participants pending a future outcome.
#[derive(Clone, Debug, Serialize)]
pub struct Wager {
    pub id: WagerId,
    pub kind: WagerKind,
    pub initiator: Participant,
    pub counterparty: Participant,
    pub scope: ScopeId,
    /// Fixed at creation, never mutated.
    pub stake: i64,
    pub description: String,
    pub status: WagerStatus,
    pub consented: HashSet<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Wager {
    pub fn participants(&self) -> [Participant; 2] {
        [self.initiator, self.counterparty]
    }

    /// Whether a user is one of the two sides.
    pub fn is_participant(&self, user: UserId) -> bool {
        self.participants()
            .iter()
            .any(|p| p.user_id() == Some(user))
    }

    /// Consents required before activation: every distinct user
    /// participant. House sides never vote, so a solo wager needs one.
    pub fn quorum(&self) -> usize {
        self.participants()
            .iter()
            .filter(|p| p.user_id().is_some())
            .count()
    }

    /// The other side of the table.
    pub fn opponent_of(&self, participant: Participant) -> Participant {
        if participant == self.initiator {
            self.counterparty
        } else {
            self.initiator
        }
    }
}

/// Caller-supplied input to settlement.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WagerOutcome {
    /// Direct stakes: the declared winning participant.
    Winner(Participant),
    /// Outcome predictions: the observed result.
    Observed(Outcome),
}

/// What a settled wager paid, and to whom.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Settlement {
    pub id: WagerId,
    pub winner: Participant,
    pub loser: Participant,
    /// Stake × 2, credited to the winner (nothing moves for house sides).
    pub payout: i64,
}
