//! Pure blackjack round state machine.
//!
//! Holds no I/O and touches no balances: the actor layer debits stakes
//! before calling `double`/`split` and pays outcomes after the round
//! completes. Invariant: the sum of per-hand stakes always equals the
//! funds held against the session, and exactly one sub-hand is current
//! unless the round is in DealerPlay or Complete.

use crate::cards::{self, Card, Shoe, hand_value};
use serde::Serialize;

use super::errors::{SessionError, SessionResult};

/// Round states
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    AwaitingDecision,
    DealerPlay,
    Complete,
}

/// How a single sub-hand fared against the dealer
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandResult {
    Bust,
    DealerBust,
    Win,
    Lose,
    Push,
}

impl HandResult {
    /// Credit owed for this result on the given stake. The stake itself
    /// was debited when it was placed, so a push refunds exactly the
    /// stake and a win pays double.
    pub fn payout(&self, stake: i64) -> i64 {
        match self {
            Self::Bust | Self::Lose => 0,
            Self::DealerBust | Self::Win => stake * 2,
            Self::Push => stake,
        }
    }
}

/// Settlement record for one sub-hand
#[derive(Clone, Debug, Serialize)]
pub struct HandOutcome {
    pub cards: Vec<Card>,
    pub value: u32,
    pub stake: i64,
    pub result: HandResult,
    pub payout: i64,
}

/// Result of the opening deal
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Deal {
    /// Normal round; decisions follow.
    Playing,
    /// Player dealt 21; the round is already over.
    Natural(Natural),
}

/// Outcome of a player natural
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Natural {
    /// Dealer also has 21: stake comes back.
    Push,
    /// Pays the natural premium.
    Blackjack,
}

/// What a decision led to
#[derive(Debug)]
pub enum Progress {
    /// Still awaiting a decision (possibly on the next sub-hand).
    Continue,
    /// Dealer played out; every sub-hand is settled.
    Complete(Vec<HandOutcome>),
}

/// Presentation snapshot of a round
#[derive(Clone, Debug, Serialize)]
pub struct RoundView {
    pub hands: Vec<HandView>,
    pub current: usize,
    pub dealer_upcard: Card,
    /// Full dealer hand, revealed once the player is done deciding.
    pub dealer: Option<Vec<Card>>,
    pub dealer_value: Option<u32>,
    pub can_double: bool,
    pub can_split: bool,
    pub status: RoundStatus,
}

/// One sub-hand in a view
#[derive(Clone, Debug, Serialize)]
pub struct HandView {
    pub cards: Vec<Card>,
    pub value: u32,
    pub stake: i64,
    pub current: bool,
}

/// A single dealer round for one player
#[derive(Debug)]
pub struct Round {
    shoe: Shoe,
    hands: Vec<Vec<Card>>,
    stakes: Vec<i64>,
    current: usize,
    dealer: Vec<Card>,
    status: RoundStatus,
    dealer_stand: u32,
}

impl Round {
    /// Deal the opening hands: two cards to the player, two to the dealer,
    /// in that order. A player natural ends the round on the spot.
    pub fn deal(mut shoe: Shoe, stake: i64, dealer_stand: u32) -> (Self, Deal) {
        let player = vec![shoe.draw(), shoe.draw()];
        let dealer = vec![shoe.draw(), shoe.draw()];

        let natural = if cards::is_natural(&player) {
            if cards::is_natural(&dealer) {
                Some(Natural::Push)
            } else {
                Some(Natural::Blackjack)
            }
        } else {
            None
        };

        let round = Self {
            shoe,
            hands: vec![player],
            stakes: vec![stake],
            current: 0,
            dealer,
            status: if natural.is_some() {
                RoundStatus::Complete
            } else {
                RoundStatus::AwaitingDecision
            },
            dealer_stand,
        };

        match natural {
            Some(natural) => (round, Deal::Natural(natural)),
            None => (round, Deal::Playing),
        }
    }

    /// Draw one card into the current sub-hand. Busting or reaching 21
    /// moves on as if the player stood.
    pub fn hit(&mut self) -> Progress {
        debug_assert_eq!(self.status, RoundStatus::AwaitingDecision);
        let card = self.shoe.draw();
        self.hands[self.current].push(card);
        if hand_value(&self.hands[self.current]) >= 21 {
            self.advance()
        } else {
            Progress::Continue
        }
    }

    /// Stand on the current sub-hand, advancing to the next one or to
    /// dealer play.
    pub fn stand(&mut self) -> Progress {
        debug_assert_eq!(self.status, RoundStatus::AwaitingDecision);
        self.advance()
    }

    /// Double the current sub-hand's stake, draw exactly one card, and
    /// force a stand. The caller must have debited the additional stake
    /// already.
    pub fn double(&mut self) -> SessionResult<Progress> {
        if !self.can_double() {
            return Err(SessionError::DoubleUnavailable);
        }
        self.stakes[self.current] *= 2;
        let card = self.shoe.draw();
        self.hands[self.current].push(card);
        Ok(self.advance())
    }

    /// Split the current pair: the second card seeds a new sub-hand
    /// inserted right after the current one, and each hand draws a fresh
    /// card. A draw that makes 21 stands that hand automatically, the same
    /// as a hit to 21. The caller must have debited the additional stake
    /// already.
    pub fn split(&mut self) -> SessionResult<Progress> {
        if !self.can_split() {
            return Err(SessionError::SplitUnavailable);
        }
        let moved = match self.hands[self.current].pop() {
            Some(card) => card,
            None => return Err(SessionError::SplitUnavailable),
        };
        self.hands.insert(self.current + 1, vec![moved]);
        self.stakes
            .insert(self.current + 1, self.stakes[self.current]);

        let card = self.shoe.draw();
        self.hands[self.current].push(card);
        let card = self.shoe.draw();
        self.hands[self.current + 1].push(card);

        if hand_value(&self.hands[self.current]) >= 21 {
            Ok(self.advance())
        } else {
            Ok(Progress::Continue)
        }
    }

    /// Doubling is only offered on a two-card current hand.
    pub fn can_double(&self) -> bool {
        self.status == RoundStatus::AwaitingDecision && self.hands[self.current].len() == 2
    }

    /// Splitting is only offered on an equal-value two-card current hand.
    pub fn can_split(&self) -> bool {
        self.status == RoundStatus::AwaitingDecision && cards::can_split(&self.hands[self.current])
    }

    /// Stake riding on the current sub-hand.
    pub fn current_stake(&self) -> i64 {
        self.stakes[self.current]
    }

    /// Sum of all sub-hand stakes (equals the funds held against this
    /// round).
    pub fn total_staked(&self) -> i64 {
        self.stakes.iter().sum()
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    /// Snapshot for the presentation layer. The dealer's hand stays
    /// hidden behind its upcard until decisions are done.
    pub fn view(&self) -> RoundView {
        let revealed = self.status != RoundStatus::AwaitingDecision;
        RoundView {
            hands: self
                .hands
                .iter()
                .zip(&self.stakes)
                .enumerate()
                .map(|(i, (cards, stake))| HandView {
                    cards: cards.clone(),
                    value: hand_value(cards),
                    stake: *stake,
                    current: i == self.current && self.status == RoundStatus::AwaitingDecision,
                })
                .collect(),
            current: self.current,
            dealer_upcard: self.dealer[0],
            dealer: revealed.then(|| self.dealer.clone()),
            dealer_value: revealed.then(|| hand_value(&self.dealer)),
            can_double: self.can_double(),
            can_split: self.can_split(),
            status: self.status,
        }
    }

    /// Move to the next sub-hand that still has a decision to make. Hands
    /// already at 21 or better (a split ace drawing a ten, say) are stood
    /// in passing.
    fn advance(&mut self) -> Progress {
        while self.current + 1 < self.hands.len() {
            self.current += 1;
            if hand_value(&self.hands[self.current]) < 21 {
                return Progress::Continue;
            }
        }
        self.play_dealer()
    }

    /// Dealer draws to the stand threshold, then every sub-hand settles
    /// independently against the final dealer value.
    fn play_dealer(&mut self) -> Progress {
        self.status = RoundStatus::DealerPlay;
        while hand_value(&self.dealer) < self.dealer_stand {
            let card = self.shoe.draw();
            self.dealer.push(card);
        }
        let dealer_value = hand_value(&self.dealer);

        let outcomes = self
            .hands
            .iter()
            .zip(&self.stakes)
            .map(|(cards, stake)| {
                let value = hand_value(cards);
                let result = if value > 21 {
                    HandResult::Bust
                } else if dealer_value > 21 {
                    HandResult::DealerBust
                } else if value > dealer_value {
                    HandResult::Win
                } else if value < dealer_value {
                    HandResult::Lose
                } else {
                    HandResult::Push
                };
                HandOutcome {
                    cards: cards.clone(),
                    value,
                    stake: *stake,
                    result,
                    payout: result.payout(*stake),
                }
            })
            .collect();

        self.status = RoundStatus::Complete;
        Progress::Complete(outcomes)
    }
}
