use crate::card::{Card, CardType};
use crate::config::RulesConfig;
use crate::deck::{self, Deck};
use crate::error::CatalogError;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::path::Path;

const STANDARD_CARDS: &str = include_str!("../data/cards.json");

/// Read-only card reference data, loaded once and shared by everything else.
#[derive(Debug, Clone)]
pub struct CardCatalog {
    cards: Vec<Card>,
    index: HashMap<String, usize>, // card id -> position in `cards`
}

impl CardCatalog {
    /// The catalog bundled with the engine.
    pub fn standard() -> Result<CardCatalog, CatalogError> {
        CardCatalog::from_json_str(STANDARD_CARDS)
    }

    pub fn from_json_str(json: &str) -> Result<CardCatalog, CatalogError> {
        let cards: Vec<Card> = serde_json::from_str(json)?;
        CardCatalog::from_cards(cards)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<CardCatalog, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        CardCatalog::from_json_str(&json)
    }

    pub fn from_cards(cards: Vec<Card>) -> Result<CardCatalog, CatalogError> {
        let mut index = HashMap::with_capacity(cards.len());
        for (i, card) in cards.iter().enumerate() {
            if index.insert(card.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateId(card.id.clone()));
            }
        }
        Ok(CardCatalog { cards, index })
    }

    pub fn get(&self, card_id: &str) -> Option<&Card> {
        self.index.get(card_id).map(|&i| &self.cards[i])
    }

    pub fn by_name(&self, name: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.name == name)
    }

    pub fn by_type(&self, card_type: CardType) -> impl Iterator<Item = &Card> {
        self.cards.iter().filter(move |c| c.card_type == card_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Picks a random starter deck with the composition `rules` asks for.
///
/// While the deck is over budget the most expensive card that has a cheaper unused
/// card of the same type is swapped for the cheapest such card. The result can
/// still be invalid when the catalog cannot satisfy the rules; run
/// [`deck::validate_deck_with`] before using it.
pub fn build_starter_deck<R: Rng + ?Sized>(catalog: &CardCatalog, rules: &RulesConfig, rng: &mut R) -> Deck {
    let mut picked: Vec<Card> = Vec::with_capacity(rules.deck_size);
    for (card_type, wanted) in [
        (CardType::Politician, rules.required_politicians),
        (CardType::Event, rules.required_events),
        (CardType::Special, rules.required_specials),
    ] {
        let mut pool: Vec<&Card> = catalog.by_type(card_type).collect();
        pool.shuffle(rng);
        picked.extend(pool.into_iter().take(wanted).cloned());
    }

    let budget = u64::from(rules.campaign_budget);
    loop {
        let total: u64 = picked.iter().map(|c| u64::from(c.campaign_value)).sum();
        if total <= budget {
            break;
        }
        let in_deck: HashSet<&str> = picked.iter().map(|c| c.id.as_str()).collect();
        let mut by_cost: Vec<usize> = (0..picked.len()).collect();
        by_cost.sort_by(|&a, &b| picked[b].campaign_value.cmp(&picked[a].campaign_value));

        let swap = by_cost.into_iter().find_map(|i| {
            let current = &picked[i];
            catalog
                .by_type(current.card_type)
                .filter(|c| !in_deck.contains(c.id.as_str()) && c.campaign_value < current.campaign_value)
                .min_by_key(|c| c.campaign_value)
                .map(|replacement| (i, replacement.clone()))
        });
        match swap {
            Some((i, replacement)) => picked[i] = replacement,
            None => break,
        }
    }

    let mut deck = deck::create_deck_with(picked, rng);
    deck.name = "Starter Deck".to_string();
    deck
}
