//! Card, shoe, and blackjack hand arithmetic.
//!
//! The shoe is a renewable source of shuffled cards: it holds 52 unique
//! cards and silently reconstitutes a fresh shuffled 52 when exhausted
//! mid-deal. Callers never observe an empty shoe.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card suits
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

/// A playing card as a value (2-14, where 11-13 are faces and 14 is the
/// ace) and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Card(pub u8, pub Suit);

impl Card {
    /// Blackjack value: faces count 10, the ace counts 11 (soft; hand
    /// arithmetic downgrades it to 1 as needed).
    pub fn blackjack_value(&self) -> u32 {
        match self.0 {
            14 => 11,
            11..=13 => 10,
            value => u32::from(value),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            11 => write!(f, "J{}", self.1),
            12 => write!(f, "Q{}", self.1),
            13 => write!(f, "K{}", self.1),
            14 => write!(f, "A{}", self.1),
            value => write!(f, "{value}{}", self.1),
        }
    }
}

/// A continuously reshuffling card shoe.
#[derive(Debug)]
pub struct Shoe {
    cards: Vec<Card>,
}

impl Shoe {
    /// A fresh shoe of 52 unique cards in random order.
    pub fn new() -> Self {
        let mut cards = Self::fresh();
        cards.shuffle(&mut rand::rng());
        Self { cards }
    }

    /// A shoe that deals the given cards in order, then reshuffles fresh
    /// ones as usual. Useful for scripted rounds and deterministic tests.
    pub fn stacked(cards: Vec<Card>) -> Self {
        let mut cards = cards;
        cards.reverse();
        Self { cards }
    }

    /// Draw the next card, reconstituting a fresh shuffled shoe first if
    /// this one is exhausted.
    pub fn draw(&mut self) -> Card {
        loop {
            if let Some(card) = self.cards.pop() {
                return card;
            }
            self.cards = Self::fresh();
            self.cards.shuffle(&mut rand::rng());
        }
    }

    /// Cards remaining before the next reshuffle.
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    fn fresh() -> Vec<Card> {
        let mut cards = Vec::with_capacity(52);
        for value in 2u8..=14 {
            for suit in [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart] {
                cards.push(Card(value, suit));
            }
        }
        cards
    }
}

impl Default for Shoe {
    fn default() -> Self {
        Self::new()
    }
}

/// Blackjack value of a hand: every ace starts at 11, then aces are
/// downgraded to 1 one at a time while the total exceeds 21.
pub fn hand_value(cards: &[Card]) -> u32 {
    let mut value: u32 = 0;
    let mut aces = 0;
    for card in cards {
        if card.0 == 14 {
            aces += 1;
        }
        value += card.blackjack_value();
    }
    while value > 21 && aces > 0 {
        value -= 10;
        aces -= 1;
    }
    value
}

/// Whether the hand still counts an ace as 11.
pub fn is_soft(cards: &[Card]) -> bool {
    let raw: u32 = cards.iter().map(Card::blackjack_value).sum();
    cards.iter().any(|c| c.0 == 14) && raw == hand_value(cards)
}

/// A hand may be split when it is exactly two cards of equal blackjack
/// value.
pub fn can_split(cards: &[Card]) -> bool {
    cards.len() == 2 && cards[0].blackjack_value() == cards[1].blackjack_value()
}

/// A natural: 21 from the first two cards.
pub fn is_natural(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_value(cards) == 21
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn card(value: u8) -> Card {
        Card(value, Suit::Spade)
    }

    // === Card tests ===

    #[test]
    fn test_blackjack_values() {
        assert_eq!(card(2).blackjack_value(), 2);
        assert_eq!(card(10).blackjack_value(), 10);
        assert_eq!(card(11).blackjack_value(), 10);
        assert_eq!(card(12).blackjack_value(), 10);
        assert_eq!(card(13).blackjack_value(), 10);
        assert_eq!(card(14).blackjack_value(), 11);
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card(14, Suit::Spade).to_string(), "A♠");
        assert_eq!(Card(13, Suit::Heart).to_string(), "K♥");
        assert_eq!(Card(7, Suit::Club).to_string(), "7♣");
    }

    // === Shoe tests ===

    #[test]
    fn test_fresh_shoe_is_52_unique() {
        let mut shoe = Shoe::new();
        let mut seen = HashSet::new();
        for _ in 0..52 {
            assert!(seen.insert(shoe.draw()));
        }
        assert_eq!(seen.len(), 52);
    }

    #[test]
    fn test_exhausted_shoe_reconstitutes() {
        let mut shoe = Shoe::new();
        for _ in 0..52 {
            shoe.draw();
        }
        assert_eq!(shoe.remaining(), 0);
        // The next draw regenerates a full shoe losslessly.
        let _ = shoe.draw();
        assert_eq!(shoe.remaining(), 51);
    }

    #[test]
    fn test_stacked_shoe_deals_in_order() {
        let mut shoe = Shoe::stacked(vec![card(10), card(7), card(9), card(6)]);
        assert_eq!(shoe.draw(), card(10));
        assert_eq!(shoe.draw(), card(7));
        assert_eq!(shoe.draw(), card(9));
        assert_eq!(shoe.draw(), card(6));
    }

    // === Hand value tests ===

    #[test]
    fn test_two_aces_and_nine_is_twelve() {
        assert_eq!(hand_value(&[card(14), card(14), card(9)]), 12);
    }

    #[test]
    fn test_ace_king_is_natural_21() {
        let hand = [card(14), card(13)];
        assert_eq!(hand_value(&hand), 21);
        assert!(is_natural(&hand));
    }

    #[test]
    fn test_king_queen_two_busts() {
        assert_eq!(hand_value(&[card(13), card(12), card(2)]), 22);
    }

    #[test]
    fn test_soft_hand_detection() {
        assert!(is_soft(&[card(14), card(6)]));
        // A♠ 6♠ 9♠ forces the ace down to 1.
        assert!(!is_soft(&[card(14), card(6), card(9)]));
        assert!(!is_soft(&[card(10), card(7)]));
    }

    #[test]
    fn test_can_split_rules() {
        assert!(can_split(&[card(8), card(8)]));
        // Equal blackjack value, not equal rank.
        assert!(can_split(&[card(13), card(10)]));
        assert!(!can_split(&[card(8), card(9)]));
        assert!(!can_split(&[card(8), card(8), card(8)]));
    }

    proptest! {
        #[test]
        fn prop_hand_value_bounds(values in prop::collection::vec(2u8..=14, 0..8)) {
            let hand: Vec<Card> = values.iter().map(|v| card(*v)).collect();
            let value = hand_value(&hand);
            // Never below the all-aces-low total, never above the raw sum.
            let low: u32 = hand
                .iter()
                .map(|c| if c.0 == 14 { 1 } else { c.blackjack_value() })
                .sum();
            let high: u32 = hand.iter().map(Card::blackjack_value).sum();
            prop_assert!(value >= low);
            prop_assert!(value <= high);
            // The downgrade loop only stops early at or below 21.
            if value > 21 {
                prop_assert_eq!(value, low);
            }
        }

        #[test]
        fn prop_shoe_survives_long_deals(draws in 53usize..200) {
            let mut shoe = Shoe::new();
            for _ in 0..draws {
                let card = shoe.draw();
                prop_assert!((2..=14).contains(&card.0));
            }
        }
    }
}
