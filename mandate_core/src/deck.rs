use crate::card::{Card, CardId};
use crate::config::RulesConfig;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// A player's deck: the purchasable pool plus the two piles of ids drawn from it.
///
/// Every operation in this module consumes a deck and hands back a new one, so a
/// caller never observes a half-updated deck. The piles only ever move ids between
/// each other; nothing here adds ids to or removes ids from the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: String,
    pub name: String,
    pub cards: Vec<Card>,
    pub draw_pile: VecDeque<CardId>, // front = next draw
    pub discard_pile: Vec<CardId>,
}

/// A rule a deck breaks. The display text is what players see.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "rule")]
pub enum DeckViolation {
    #[error("Deck must contain exactly {expected} cards. Current count: {actual}")]
    WrongSize { expected: usize, actual: usize },
    #[error(
        "Deck exceeds the campaign budget of €{}. Current value: €{}",
        group_thousands(.budget),
        group_thousands(.value)
    )]
    OverBudget { budget: u32, value: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckValidation {
    pub valid: bool,
    pub errors: Vec<DeckViolation>,
}

impl DeckValidation {
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Formats an amount the way prices are shown to players, e.g. `250,000`.
fn group_thousands<T: Copy + Into<u64>>(amount: &T) -> String {
    let digits = (*amount).into().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

impl Deck {
    pub fn total_cards(&self) -> usize {
        self.draw_pile.len() + self.discard_pile.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.draw_pile.is_empty() && self.discard_pile.is_empty()
    }
}

// --- Pile operations ---

/// Builds a deck whose draw pile is a uniform permutation of every card in `cards`.
pub fn create_deck(cards: Vec<Card>) -> Deck {
    create_deck_with(cards, &mut rand::rng())
}

pub fn create_deck_with<R: Rng + ?Sized>(cards: Vec<Card>, rng: &mut R) -> Deck {
    let id = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
    let draw_pile: Vec<CardId> = cards.iter().map(|c| c.id.clone()).collect();
    let deck = Deck {
        id: format!("deck-{}", id.simple()),
        name: "New Deck".to_string(),
        cards,
        draw_pile: draw_pile.into(),
        discard_pile: Vec::new(),
    };
    shuffle_deck_with(deck, rng)
}

/// Re-permutes the draw pile. The discard pile and the pool are left alone.
pub fn shuffle_deck(deck: Deck) -> Deck {
    shuffle_deck_with(deck, &mut rand::rng())
}

pub fn shuffle_deck_with<R: Rng + ?Sized>(mut deck: Deck, rng: &mut R) -> Deck {
    deck.draw_pile.make_contiguous().shuffle(rng);
    deck
}

/// Moves the discard pile back under the draw pile and shuffles everything together.
pub fn reshuffle_discard_pile(deck: Deck) -> Deck {
    reshuffle_discard_pile_with(deck, &mut rand::rng())
}

pub fn reshuffle_discard_pile_with<R: Rng + ?Sized>(mut deck: Deck, rng: &mut R) -> Deck {
    let discarded = std::mem::take(&mut deck.discard_pile);
    deck.draw_pile.extend(discarded);
    shuffle_deck_with(deck, rng)
}

/// Draws up to `count` ids from the top of the deck.
///
/// An empty draw pile is refilled from the discard pile. When both are empty the
/// draw stops early, so the returned list may be shorter than `count`.
pub fn draw_cards(deck: Deck, count: usize) -> (Vec<CardId>, Deck) {
    draw_cards_with(deck, count, &mut rand::rng())
}

pub fn draw_cards_with<R: Rng + ?Sized>(mut deck: Deck, count: usize, rng: &mut R) -> (Vec<CardId>, Deck) {
    let mut drawn = Vec::with_capacity(count.min(deck.total_cards()));
    while drawn.len() < count {
        if deck.draw_pile.is_empty() {
            if deck.discard_pile.is_empty() {
                break;
            }
            deck = reshuffle_discard_pile_with(deck, rng);
        }
        match deck.draw_pile.pop_front() {
            Some(id) => drawn.push(id),
            None => break,
        }
    }
    (drawn, deck)
}

/// Puts `card_ids` on the discard pile. The ids are not checked against the pool.
pub fn discard_cards(mut deck: Deck, card_ids: &[CardId]) -> Deck {
    deck.discard_pile.extend_from_slice(card_ids);
    deck
}

/// Looks at up to `count` ids from the top without drawing them.
///
/// Like [`draw_cards`], an empty draw pile is refilled first, which clears the
/// discard pile; always continue with the returned deck.
pub fn peek_top_cards(deck: Deck, count: usize) -> (Vec<CardId>, Deck) {
    peek_top_cards_with(deck, count, &mut rand::rng())
}

pub fn peek_top_cards_with<R: Rng + ?Sized>(mut deck: Deck, count: usize, rng: &mut R) -> (Vec<CardId>, Deck) {
    if deck.draw_pile.is_empty() && !deck.discard_pile.is_empty() {
        deck = reshuffle_discard_pile_with(deck, rng);
    }
    let top = deck.draw_pile.iter().take(count).cloned().collect();
    (top, deck)
}

/// Puts `card_ids` on top of the draw pile; `card_ids[0]` becomes the next draw.
pub fn put_cards_on_top(mut deck: Deck, card_ids: &[CardId]) -> Deck {
    for id in card_ids.iter().rev() {
        deck.draw_pile.push_front(id.clone());
    }
    deck
}

pub fn get_card_by_id<'a>(deck: &'a Deck, card_id: &str) -> Option<&'a Card> {
    deck.cards.iter().find(|c| c.id == card_id)
}

// --- Deck-building rules ---

pub fn calculate_deck_value(deck: &Deck) -> u64 {
    deck.cards.iter().map(|c| u64::from(c.campaign_value)).sum()
}

/// Checks the deck against the default rules (20 cards, €250,000 budget).
pub fn validate_deck(deck: &Deck) -> DeckValidation {
    validate_deck_with(deck, &RulesConfig::default())
}

/// Runs every rule and reports all of the violations, not just the first.
pub fn validate_deck_with(deck: &Deck, rules: &RulesConfig) -> DeckValidation {
    let mut errors = Vec::new();

    if deck.cards.len() != rules.deck_size {
        errors.push(DeckViolation::WrongSize {
            expected: rules.deck_size,
            actual: deck.cards.len(),
        });
    }

    let value = calculate_deck_value(deck);
    if value > u64::from(rules.campaign_budget) {
        errors.push(DeckViolation::OverBudget {
            budget: rules.campaign_budget,
            value,
        });
    }

    DeckValidation {
        valid: errors.is_empty(),
        errors,
    }
}
