use mandate_core::{CardId, PlayerId};
use thiserror::Error;
use uuid::Uuid;

/// Why a session refused a command. The display text is sent back to the player.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a game needs at least {needed} players, got {got}")]
    NotEnoughPlayers { needed: usize, got: usize },
    #[error("player `{0}` joined twice")]
    DuplicatePlayer(PlayerId),
    #[error("deck of player `{player}` is invalid: {}", .messages.join("; "))]
    InvalidDeck { player: PlayerId, messages: Vec<String> },
    #[error("player `{0}` is not part of this game")]
    UnknownPlayer(PlayerId),
    #[error("only the host can do that")]
    NotHost,
    #[error("card `{card}` is not in the hand of `{player}`")]
    CardNotInHand { player: PlayerId, card: CardId },
    #[error("player `{player}` already played a {slot} card this round")]
    AlreadyPlayed { player: PlayerId, slot: &'static str },
    #[error("player `{0}` cannot play special cards this round")]
    SpecialsSilenced(PlayerId),
    #[error("`{0}` is not a valid target")]
    InvalidTarget(PlayerId),
    #[error("player `{0}` has no peeked cards to choose from")]
    NothingPeeked(PlayerId),
    #[error("card `{card}` is not among the cards `{player}` peeked at")]
    CardNotPeeked { player: PlayerId, card: CardId },
    #[error("the cards put back must be exactly the other peeked cards")]
    InvalidPutBack,
    #[error("cannot {action} while the round is {phase}")]
    WrongPhase { action: &'static str, phase: &'static str },
    #[error("the game is over")]
    GameOver,
    #[error("game {0} does not exist")]
    GameNotFound(Uuid),
}
