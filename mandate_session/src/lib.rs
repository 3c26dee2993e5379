//! # Mandate game sessions
//!
//! Runs games on top of `mandate_core`: seats players with their decks, keeps
//! hands private, drives the round flow (deal, play, reveal, resolve, advance),
//! scores rounds and decides the winner. Commands and events are plain serde
//! types so any transport can carry them.

mod error;
mod message;
mod registry;
mod session;

pub use error::*;

pub use message::*;

pub use registry::*;

pub use session::*;
