use crate::card::{Card, CardId, MomentumDirection};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PlayerId = String;
pub type EffectId = String;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub players: Vec<Player>, // seating order, also the fallback target order
    pub round: u32,
    pub momentum_level: u8, // shared escalation dial, 1..=6
    // Cards played into the middle this round, resolved together
    pub center_cards: Vec<CenterCard>,
    pub temporary_effects: Vec<GameEffect>,
    // Append-only; nothing in the engine ever truncates it
    pub log: Vec<LogEntry>,
    // Source for effect ids, bumped every time an effect is registered
    #[serde(default)]
    pub effect_seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub user_id: PlayerId,
    pub name: String,
    pub influence: i32,
    pub influence_modifier: i32, // round-scoped, reset by the session between rounds
    pub mandates: u32,
    pub is_skipping_round: bool,
    pub protected_mandates: bool,
    pub can_play_special: bool,
    pub discard_next: bool,
    pub played_card: Option<Card>,  // politician played this round
    pub special_card: Option<Card>, // event/special played this round
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterCard {
    pub player_id: PlayerId,
    pub card: Option<Card>, // None while still face down on the client side
    pub revealed: bool,
    pub position: u32, // play order, breaks ties between cards of the same type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_player_id: Option<PlayerId>,
    // For cards that let the player pick which way momentum moves
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<MomentumDirection>,
}

/// Tag of a duration-scoped effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    BlockEvents,
    BlockSpecials,
    ExtraDraw,
    BlockNextSpecial,
    SpecialImmunity,
    DiscardAll,
    DrawAll,
    RevealHand,
    PeekAndKeep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEffect {
    pub id: EffectId,
    #[serde(rename = "type")]
    pub kind: EffectKind,
    pub source_card_id: CardId,
    pub source_player_id: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_player_id: Option<PlayerId>,
    pub duration: u32, // rounds
    pub start_round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i32>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Action,
    System,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub message: String,
    pub kind: LogKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<CardId>,
    pub round: u32,
}

// --- Player ---

impl Player {
    pub fn new(user_id: impl Into<PlayerId>, name: impl Into<String>) -> Player {
        Player {
            user_id: user_id.into(),
            name: name.into(),
            influence: 0,
            influence_modifier: 0,
            mandates: 0,
            is_skipping_round: false,
            protected_mandates: false,
            can_play_special: true,
            discard_next: false,
            played_card: None,
            special_card: None,
        }
    }

    /// Influence this player brings to the current round.
    pub fn round_influence(&self) -> i32 {
        self.played_card.as_ref().map_or(0, |c| c.influence) + self.influence_modifier
    }

    /// Clears everything that only lives for one round.
    pub fn reset_round(&mut self) {
        self.influence_modifier = 0;
        self.protected_mandates = false;
        self.is_skipping_round = false;
        self.played_card = None;
        self.special_card = None;
    }
}

// --- LogEntry ---

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>, round: u32) -> LogEntry {
        LogEntry {
            message: message.into(),
            kind,
            player_id: None,
            card_id: None,
            round,
        }
    }

    pub fn system(message: impl Into<String>, round: u32) -> LogEntry {
        LogEntry::new(LogKind::System, message, round)
    }

    pub fn error(message: impl Into<String>, round: u32) -> LogEntry {
        LogEntry::new(LogKind::Error, message, round)
    }

    pub fn with_player(mut self, player_id: impl Into<PlayerId>) -> LogEntry {
        self.player_id = Some(player_id.into());
        self
    }

    pub fn with_card(mut self, card_id: impl Into<CardId>) -> LogEntry {
        self.card_id = Some(card_id.into());
        self
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[round {}] {}", self.round, self.message)
    }
}

// --- GameState ---

impl GameState {
    pub fn new(players: Vec<Player>, momentum_level: u8) -> GameState {
        GameState {
            players,
            round: 1,
            momentum_level,
            center_cards: Vec::new(),
            temporary_effects: Vec::new(),
            log: Vec::new(),
            effect_seq: 0,
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.user_id == player_id)
    }

    /// Everyone but `player_id`, in seating order.
    pub fn opponents<'a>(&'a self, player_id: &'a str) -> impl Iterator<Item = &'a Player> + 'a {
        self.players.iter().filter(move |p| p.user_id != player_id)
    }

    pub fn push_log(&mut self, entry: LogEntry) {
        self.log.push(entry);
    }

    /// Applies `delta` to every player selected by `filter`.
    pub fn adjust_influence(&mut self, delta: i32, mut filter: impl FnMut(&Player) -> bool) {
        for player in self.players.iter_mut().filter(|p| filter(&**p)) {
            player.influence_modifier += delta;
        }
    }

    /// Whether someone other than `player_id` has a revealed politician in the center.
    pub fn has_other_politician_in_play(&self, player_id: &str) -> bool {
        self.center_cards.iter().any(|cc| {
            cc.player_id != player_id && cc.revealed && cc.card.as_ref().is_some_and(Card::is_politician)
        })
    }
}
