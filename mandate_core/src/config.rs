use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lowest and highest momentum level a game can reach.
pub const MOMENTUM_MIN: u8 = 1;
pub const MOMENTUM_MAX: u8 = 6;
/// Level that "reset momentum" effects return to.
pub const NEUTRAL_MOMENTUM: u8 = 3;

/// Tunable game rules. Every field has a default, so a rules file only needs
/// to list what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesConfig {
    pub deck_size: usize,
    pub campaign_budget: u32, // max total campaign value of a deck
    pub initial_momentum: u8,
    pub mandate_threshold: u32, // mandates needed to win
    pub alternate_win_threshold: i32, // accumulated influence that also wins
    pub min_players: usize,
    pub opening_hand_size: usize,
    pub max_rounds: u32,
    // Starter deck composition, must add up to deck_size
    pub required_politicians: usize,
    pub required_events: usize,
    pub required_specials: usize,
}

impl RulesConfig {
    pub const DEFAULT_DECK_SIZE: usize = 20;
    pub const DEFAULT_CAMPAIGN_BUDGET: u32 = 250_000;

    pub fn from_json_str(json: &str) -> Result<RulesConfig, ConfigError> {
        let config: RulesConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<RulesConfig, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        RulesConfig::from_json_str(&json)
    }

    /// Rejects combinations the engine cannot play with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deck_size == 0 {
            return Err(ConfigError::Invalid("deckSize must be positive".to_string()));
        }
        if !(MOMENTUM_MIN..=MOMENTUM_MAX).contains(&self.initial_momentum) {
            return Err(ConfigError::Invalid(format!(
                "initialMomentum must be between {} and {}, got {}",
                MOMENTUM_MIN, MOMENTUM_MAX, self.initial_momentum
            )));
        }
        if self.mandate_threshold == 0 {
            return Err(ConfigError::Invalid("mandateThreshold must be positive".to_string()));
        }
        if self.alternate_win_threshold <= 0 {
            return Err(ConfigError::Invalid("alternateWinThreshold must be positive".to_string()));
        }
        if self.min_players < 2 {
            return Err(ConfigError::Invalid(format!(
                "minPlayers must be at least 2, got {}",
                self.min_players
            )));
        }
        if self.opening_hand_size > self.deck_size {
            return Err(ConfigError::Invalid(format!(
                "openingHandSize {} exceeds deckSize {}",
                self.opening_hand_size, self.deck_size
            )));
        }
        let composition = self.required_politicians + self.required_events + self.required_specials;
        if composition != self.deck_size {
            return Err(ConfigError::Invalid(format!(
                "starter deck composition adds up to {} cards, deckSize is {}",
                composition, self.deck_size
            )));
        }
        Ok(())
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            deck_size: Self::DEFAULT_DECK_SIZE,
            campaign_budget: Self::DEFAULT_CAMPAIGN_BUDGET,
            initial_momentum: MOMENTUM_MIN,
            mandate_threshold: 12,
            alternate_win_threshold: 40,
            min_players: 3,
            opening_hand_size: 6,
            max_rounds: 20,
            required_politicians: 10,
            required_events: 5,
            required_specials: 5,
        }
    }
}

/// Clamps a momentum value into the legal range.
pub fn clamp_momentum(level: i32) -> u8 {
    level.clamp(MOMENTUM_MIN as i32, MOMENTUM_MAX as i32) as u8
}
