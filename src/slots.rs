//! Multiplier slot machine.
//!
//! A single-spin point game: the bet is debited, three reels are rolled
//! uniformly, and a matched line pays the bet times the symbol's
//! multiplier — the full multiplier for three of a kind, half (rounded
//! down) for a pair adjacent to the middle reel, nothing otherwise. The
//! spin settles in one call; there is no session to keep.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::events::SlotEvent;
use crate::ledger::{LedgerError, LedgerStore, ScopeId, UserId};

const EVENT_CAPACITY: usize = 64;

/// Reel symbols, cheapest to rarest-paying
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Cherry,
    Lemon,
    Orange,
    Grape,
    Diamond,
    Jackpot,
    Crown,
}

impl Symbol {
    pub const ALL: [Symbol; 7] = [
        Self::Cherry,
        Self::Lemon,
        Self::Orange,
        Self::Grape,
        Self::Diamond,
        Self::Jackpot,
        Self::Crown,
    ];

    /// Bet multiplier for three of this symbol.
    pub fn multiplier(&self) -> i64 {
        match self {
            Self::Cherry => 2,
            Self::Lemon => 3,
            Self::Orange => 4,
            Self::Grape => 5,
            Self::Diamond => 10,
            Self::Jackpot => 25,
            Self::Crown => 50,
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let repr = match self {
            Self::Cherry => "🍒",
            Self::Lemon => "🍋",
            Self::Orange => "🍊",
            Self::Grape => "🍇",
            Self::Diamond => "💎",
            Self::Jackpot => "🎰",
            Self::Crown => "👑",
        };
        write!(f, "{repr}")
    }
}

/// Multiplier a line of three reels pays on the bet: the symbol's full
/// multiplier for three of a kind, half of the middle symbol's for a pair
/// touching the middle reel, zero otherwise.
pub fn line_multiplier(reels: [Symbol; 3]) -> i64 {
    if reels[0] == reels[1] && reels[1] == reels[2] {
        reels[0].multiplier()
    } else if reels[0] == reels[1] || reels[1] == reels[2] {
        reels[1].multiplier() / 2
    } else {
        0
    }
}

/// Outcome of one settled spin
#[derive(Clone, Debug, Serialize)]
pub struct SpinResult {
    pub reels: [Symbol; 3],
    pub bet: i64,
    pub multiplier: i64,
    /// `bet × multiplier`, already credited.
    pub payout: i64,
}

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("bet must be at least 1, got {0}")]
    InvalidBet(i64),
    #[error("insufficient funds: {available} available, {required} required")]
    InsufficientFunds { available: i64, required: i64 },
    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for SlotError {
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

pub type SlotResult<T> = Result<T, SlotError>;

/// The slot machine: stateless between spins, sharing only the ledger.
pub struct SlotMachine {
    ledger: Arc<dyn LedgerStore>,
    events: broadcast::Sender<SlotEvent>,
}

impl SlotMachine {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { ledger, events }
    }

    /// Subscribe to spin events.
    pub fn subscribe(&self) -> broadcast::Receiver<SlotEvent> {
        self.events.subscribe()
    }

    /// Debit the bet, roll three uniform reels, and settle.
    pub async fn spin(&self, player: UserId, scope: ScopeId, bet: i64) -> SlotResult<SpinResult> {
        let reels = {
            let mut rng = rand::rng();
            [(); 3].map(|()| Symbol::ALL[rng.random_range(0..Symbol::ALL.len())])
        };
        self.spin_with(player, scope, bet, reels).await
    }

    /// Settle a spin with the given reels. Useful for scripted spins and
    /// deterministic tests.
    pub async fn spin_with(
        &self,
        player: UserId,
        scope: ScopeId,
        bet: i64,
        reels: [Symbol; 3],
    ) -> SlotResult<SpinResult> {
        if bet < 1 {
            return Err(SlotError::InvalidBet(bet));
        }
        self.ledger.adjust(player, scope, -bet).await?;

        let multiplier = line_multiplier(reels);
        let payout = bet * multiplier;
        if payout > 0 {
            self.ledger.adjust(player, scope, payout).await?;
        }

        log::info!(
            "player {player} spun {}{}{} for {bet}, paying {payout}",
            reels[0],
            reels[1],
            reels[2]
        );
        let _ = self.events.send(SlotEvent::Spun {
            player,
            bet,
            reels,
            payout,
        });
        Ok(SpinResult {
            reels,
            bet,
            multiplier,
            payout,
        })
    }
}
