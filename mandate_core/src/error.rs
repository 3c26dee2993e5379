//! Error types for the fallible edges of the engine.
//!
//! Resolution and deck operations never fail: missing players are logged,
//! rule violations come back as a `DeckValidation`, and exhausted piles simply
//! return fewer cards. Only loading data from outside can go wrong.

use crate::card::CardId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read card catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed card catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate card id `{0}` in catalog")]
    DuplicateId(CardId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed rules file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid rules: {0}")]
    Invalid(String),
}
