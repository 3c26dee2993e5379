use mandate_core::{CardId, CenterCard, GameState, MomentumDirection, PlayerId};
use serde::{Deserialize, Serialize};

// --- Player -> session ---
// Everything a seated player can ask the session to do.

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Deal everyone their opening hand (host only)
    DealOpeningHands,
    /// Put a card from the hand face down into the center
    PlayCard {
        card_id: CardId,
        #[serde(default)]
        target: Option<PlayerId>,
        #[serde(default)]
        direction: Option<MomentumDirection>,
    },
    /// Turn every center card face up (host only)
    RevealAll,
    /// Resolve effects and score the round (host only)
    ResolveRound,
    /// Move on to the next round (host only)
    AdvanceRound,
    Draw { count: usize },
    Discard { card_ids: Vec<CardId> },
    RollDice { card_id: CardId },
    /// Keep one of the peeked cards; `put_back` orders the rest, top first (empty keeps the peeked order)
    ChoosePeekedCard {
        card_id: CardId,
        #[serde(default)]
        put_back: Vec<CardId>,
    },
    GetMyHand,
}

// --- Session -> players ---
// Notifications produced after the game state changed.

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    HandsDealt { hand_size: usize },
    /// Private to `player_id`, the ids are their new cards
    CardsDrawn { player_id: PlayerId, card_ids: Vec<CardId> },
    CardsDiscarded { player_id: PlayerId, card_ids: Vec<CardId> },
    /// A face-down card entered the center
    CardPlayed { player_id: PlayerId, position: u32 },
    CardsRevealed { cards: Vec<CenterCard> },
    RoundResolved { round: u32, momentum_level: u8 },
    /// `winner` is `None` when the highest influence was tied
    RoundScored { round: u32, winner: Option<PlayerId>, influence: i32 },
    RoundStarted { round: u32 },
    DiceRolled { player_id: PlayerId, card_id: CardId, roll: u8 },
    /// Private to `viewer`, who forced `player_id` to show their hand
    HandRevealed { player_id: PlayerId, viewer: PlayerId, card_ids: Vec<CardId> },
    /// Private to `player_id`, top of their deck waiting for `ChoosePeekedCard`
    CardsPeeked { player_id: PlayerId, card_ids: Vec<CardId> },
    /// Reply to `GetMyHand`
    PlayerHand { card_ids: Vec<CardId> },
    GameOver { winner: Option<PlayerId> },
    /// Full state, sent after anything that changes more than one field
    GameStateSnapshot(GameState),
    Error { message: String },
}

impl From<crate::SessionError> for SessionEvent {
    fn from(err: crate::SessionError) -> Self {
        SessionEvent::Error { message: err.to_string() }
    }
}
