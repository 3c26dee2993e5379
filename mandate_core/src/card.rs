use serde::{Deserialize, Serialize};
use std::fmt;

pub type CardId = String;

/// Card category. Also decides the resolution order within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Politician,
    Event,
    Special,
    // Tags this engine does not know about still load, they just resolve last
    #[serde(other)]
    Unknown,
}

impl CardType {
    /// Politicians resolve before events, events before specials.
    pub fn resolution_rank(self) -> u8 {
        match self {
            CardType::Politician => 1,
            CardType::Event => 2,
            CardType::Special => 3,
            CardType::Unknown => 99,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

/// Which class of card a blocking effect suppresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockedCategory {
    Events,
    Specials,
}

/// Which way a player pushes momentum when a card lets them choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MomentumDirection {
    Up,
    Down,
}

/// A predicate over the board, evaluated from the point of view of the card's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Condition {
    MomentumAtLeast { level: u8 },
    MomentumBelow { level: u8 },
    /// Another player has a politician on the table this round
    OtherPoliticianInPlay,
    /// Some other player holds more mandates than the owner
    TrailingInMandates,
    /// Nobody holds fewer mandates than the owner
    FewestMandates,
}

/// Structured description of what a card does when it resolves.
///
/// Cards carry a list of these instead of relying on their display name, so a
/// new card is a catalog entry rather than a new branch in the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Ability {
    /// Registers a `block-events` / `block-specials` effect starting this round
    BlockCategory { category: BlockedCategory, duration: u32 },
    /// Every other player who played a politician loses `amount` influence
    PenalizeRivalPoliticians { amount: i32 },
    /// The owner gains `amount` influence when `condition` holds
    ConditionalBoost { condition: Condition, amount: i32 },
    /// Every other player loses `amount` influence
    PenalizeOthers { amount: i32 },
    /// Every player, the owner included, loses `amount` influence
    PenalizeAll { amount: i32 },
    /// Players with a politician in play gain `amount`; an empty list means every country
    BoostPoliticians {
        amount: i32,
        #[serde(default)]
        countries: Vec<String>,
    },
    /// Registers an `extra-draw` effect, the session draws at end of round
    ExtraDraw {
        count: u32,
        #[serde(default)]
        condition: Option<Condition>,
    },
    SetMomentum { level: u8 },
    /// Moves momentum by `delta`, clamped to the legal range
    ShiftMomentum { delta: i8 },
    /// The chosen target loses `amount` influence
    TargetedPenalty { amount: i32 },
    BlockNextSpecial,
    ProtectMandates,
    /// Opponents may not play a special card next round
    SilenceOpponentSpecials,
    /// The owner's politician counts twice this round
    DoubleInfluence,
    /// The chosen target shows their hand to the owner and discards a card
    ForceDiscard,
    /// Every player discards `count` cards from hand when the round resolves
    DiscardAll { count: u32 },
    /// Every player draws `count` cards when the round resolves
    DrawAll { count: u32 },
    /// Cancels the politician most recently played by an opponent
    CancelLastPolitician,
    /// Moves momentum by `amount` in the direction the owner picked, up when they did not
    ChosenMomentumShift { amount: u8 },
    /// The owner looks at the top `look` cards of their deck, keeps one and puts the rest back
    PeekAndKeep { look: u32 },
    /// The player with the highest influence this round gains mandates
    AwardMandateToLeader { amount: u32 },
    /// Targeted specials cannot pick the owner this round
    SpecialImmunity,
}

impl Ability {
    /// Abilities that pick a single opponent.
    pub fn is_targeted(&self) -> bool {
        matches!(self, Ability::TargetedPenalty { .. } | Ability::ForceDiscard)
    }
}

/// Immutable card definition loaded from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    #[serde(default)]
    pub influence: i32, // 0 for anything but politicians
    pub effect: String, // human-readable only, never interpreted
    pub campaign_value: u32, // deck-building cost
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<Rarity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub abilities: Vec<Ability>,
}

impl Card {
    pub fn new(id: impl Into<CardId>, name: impl Into<String>, card_type: CardType) -> Card {
        Card {
            id: id.into(),
            name: name.into(),
            card_type,
            influence: 0,
            effect: String::new(),
            campaign_value: 0,
            country: None,
            era: None,
            description: None,
            rarity: None,
            tags: Vec::new(),
            abilities: Vec::new(),
        }
    }

    pub fn with_influence(mut self, influence: i32) -> Card {
        self.influence = influence;
        self
    }

    pub fn with_effect(mut self, effect: impl Into<String>) -> Card {
        self.effect = effect.into();
        self
    }

    pub fn with_campaign_value(mut self, value: u32) -> Card {
        self.campaign_value = value;
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Card {
        self.country = Some(country.into());
        self
    }

    pub fn with_ability(mut self, ability: Ability) -> Card {
        self.abilities.push(ability);
        self
    }

    pub fn is_politician(&self) -> bool {
        self.card_type == CardType::Politician
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            CardType::Politician => "politician",
            CardType::Event => "event",
            CardType::Special => "special",
            CardType::Unknown => "unknown",
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.card_type, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_rank_order() {
        assert!(CardType::Politician.resolution_rank() < CardType::Event.resolution_rank());
        assert!(CardType::Event.resolution_rank() < CardType::Special.resolution_rank());
        assert_eq!(CardType::Unknown.resolution_rank(), 99);
    }

    #[test]
    fn test_unknown_type_tag_loads() {
        let json = r#"{"id":"x-1","name":"Mystery","type":"bonus","effect":"?","campaignValue":100}"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.card_type, CardType::Unknown);
        assert_eq!(card.influence, 0);
        assert!(card.abilities.is_empty());
    }

    #[test]
    fn test_ability_wire_shape() {
        let ability = Ability::ConditionalBoost {
            condition: Condition::MomentumAtLeast { level: 4 },
            amount: 3,
        };
        let value = serde_json::to_value(&ability).unwrap();
        assert_eq!(value["kind"], "conditional-boost");
        assert_eq!(value["condition"]["kind"], "momentum-at-least");
        assert_eq!(value["condition"]["level"], 4);

        let unit: Ability = serde_json::from_str(r#"{"kind":"block-next-special"}"#).unwrap();
        assert_eq!(unit, Ability::BlockNextSpecial);

        let peek: Ability = serde_json::from_str(r#"{"kind":"peek-and-keep","look":3}"#).unwrap();
        assert_eq!(peek, Ability::PeekAndKeep { look: 3 });
        let shift = serde_json::to_value(Ability::ChosenMomentumShift { amount: 1 }).unwrap();
        assert_eq!(shift["kind"], "chosen-momentum-shift");
        assert_eq!(serde_json::to_value(MomentumDirection::Down).unwrap(), "down");
    }

    #[test]
    fn test_card_serde_field_names() {
        let card = Card::new("card-1", "Angela Merkel", CardType::Politician)
            .with_influence(6)
            .with_campaign_value(18_000)
            .with_country("Germany");
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["type"], "politician");
        assert_eq!(value["campaignValue"], 18_000);
        assert!(value.get("era").is_none());
        let back: Card = serde_json::from_value(value).unwrap();
        assert_eq!(back, card);
    }
}
