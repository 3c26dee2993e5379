//! # Mandate card game engine
//!
//! The `mandate_core` crate holds the rules of the game: card definitions and
//! the bundled catalog, deck management, the round resolver with its temporary
//! effect registry, and the game state they all operate on.
//! It knows nothing about sessions, transports or user interfaces, so any
//! front end can drive it.

mod card;
mod catalog;
mod config;
pub mod deck;
mod error;
mod registry;
mod resolver;
mod state;

pub use card::*;

pub use catalog::*;

pub use config::*;

pub use deck::{Deck, DeckValidation, DeckViolation};

pub use error::*;

pub use registry::expire_effects;

pub use resolver::*;

pub use state::*;
