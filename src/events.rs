//! Presentation-facing events and commands.
//!
//! The engine is transport-agnostic: a presentation layer subscribes to the
//! broadcast event streams to render state, and feeds structured commands
//! back in through [`crate::Engine::dispatch`]. Event delivery is
//! best-effort — a lagging or absent subscriber never blocks or fails a
//! state transition.

use crate::blackjack::{HandOutcome, RoundView};
use crate::ledger::{ScopeId, UserId};
use crate::rewards::Reward;
use crate::slots::Symbol;
use crate::wager::{Participant, WagerId, WagerKind, WagerOutcome, WagerStatus};
use serde::{Deserialize, Serialize};

/// Notifications from the wager registry and settlement engine.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum WagerEvent {
    Created {
        id: WagerId,
        kind: WagerKind,
        initiator: Participant,
        counterparty: Participant,
        scope: ScopeId,
        stake: i64,
        description: String,
    },
    ConsentRecorded {
        id: WagerId,
        actor: UserId,
        status: WagerStatus,
    },
    Activated {
        id: WagerId,
        stake: i64,
    },
    /// Quorum was met but the funds re-check failed; nobody was charged.
    ActivationFailed {
        id: WagerId,
        broke: Participant,
    },
    Cancelled {
        id: WagerId,
    },
    Expired {
        id: WagerId,
    },
    Resolved {
        id: WagerId,
        winner: Participant,
        loser: Participant,
        payout: i64,
    },
}

/// Notifications from blackjack sessions.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum SessionEvent {
    Started {
        player: UserId,
        stake: i64,
        view: RoundView,
    },
    StateChanged {
        player: UserId,
        view: RoundView,
    },
    /// The decision window lapsed; the engine stood for the player.
    TimedOut {
        player: UserId,
    },
    Completed {
        player: UserId,
        outcomes: Vec<HandOutcome>,
    },
}

/// Notifications from the slot machine.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum SlotEvent {
    Spun {
        player: UserId,
        bet: i64,
        reels: [Symbol; 3],
        payout: i64,
    },
}

/// Notifications from reward redemption.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum RewardEvent {
    Redeemed {
        actor: UserId,
        target: UserId,
        reward: Reward,
        cost: i64,
    },
    /// The effect could not be applied; the cost was returned.
    Refunded {
        actor: UserId,
        reward: Reward,
        cost: i64,
    },
    MuteLifted {
        target: UserId,
    },
}

/// Structured commands from the presentation layer, tagged with the acting
/// user and the target entity.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", tag = "command")]
pub enum Command {
    CreateWager {
        id: WagerId,
        kind: WagerKind,
        actor: UserId,
        opponent: Participant,
        scope: ScopeId,
        stake: i64,
        description: String,
    },
    Consent {
        id: WagerId,
        actor: UserId,
    },
    CancelWager {
        id: WagerId,
        actor: UserId,
    },
    Resolve {
        id: WagerId,
        actor: UserId,
        outcome: WagerOutcome,
    },
    StartBlackjack {
        actor: UserId,
        scope: ScopeId,
        stake: i64,
    },
    Hit {
        actor: UserId,
    },
    Stand {
        actor: UserId,
    },
    Double {
        actor: UserId,
    },
    Split {
        actor: UserId,
    },
    Redeem {
        actor: UserId,
        scope: ScopeId,
        reward: Reward,
        target: UserId,
    },
    Spin {
        actor: UserId,
        scope: ScopeId,
        bet: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wager::Participant;

    #[test]
    fn test_command_wire_shape() {
        let json = serde_json::json!({
            "command": "create_wager",
            "id": 7,
            "kind": { "kind": "coin-flip" },
            "actor": 1,
            "opponent": { "user": 2 },
            "scope": 42,
            "stake": 100,
            "description": "movie night",
        });
        let command: Command = serde_json::from_value(json).unwrap();
        match command {
            Command::CreateWager {
                id,
                kind,
                opponent,
                stake,
                ..
            } => {
                assert_eq!(id, 7);
                assert_eq!(kind, WagerKind::CoinFlip);
                assert_eq!(opponent, Participant::User(2));
                assert_eq!(stake, 100);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_event_tags_are_snake_case() {
        let event = WagerEvent::ActivationFailed {
            id: 3,
            broke: Participant::User(9),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "activation_failed");
        assert_eq!(value["broke"]["user"], 9);

        let event = SlotEvent::Spun {
            player: 1,
            bet: 50,
            reels: [Symbol::Crown, Symbol::Crown, Symbol::Crown],
            payout: 2500,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "spun");
        assert_eq!(value["reels"][0], "crown");
    }
}
