//! Temporary effects: duration-scoped modifiers stored on the game state.
//!
//! Handlers register effects while a round resolves and query them to decide
//! whether a later card is blocked. The resolver itself never removes expired
//! effects; whoever advances the round calls [`expire_effects`].

use crate::card::CardId;
use crate::state::{EffectKind, GameEffect, GameState, PlayerId};

impl EffectKind {
    pub fn default_description(self) -> &'static str {
        match self {
            EffectKind::BlockEvents => "Event cards are blocked this round",
            EffectKind::BlockSpecials => "Special cards are blocked this round",
            EffectKind::ExtraDraw => "Draw extra cards at end of round",
            EffectKind::BlockNextSpecial => "Block the next special card played",
            EffectKind::SpecialImmunity => "Cannot be targeted by special cards this round",
            EffectKind::DiscardAll => "Every player discards cards at end of round",
            EffectKind::DrawAll => "Every player draws cards at end of round",
            EffectKind::RevealHand => "A hand is shown to the card's owner",
            EffectKind::PeekAndKeep => "Look at the top of the deck and keep one card",
        }
    }
}

impl GameEffect {
    /// Whether the effect still applies in `round`.
    pub fn is_active_in(&self, round: u32) -> bool {
        round >= self.start_round && round < self.start_round.saturating_add(self.duration)
    }

    pub fn is_expired_at(&self, round: u32) -> bool {
        self.start_round.saturating_add(self.duration) <= round
    }

    /// The card count carried in `value`, one when unset and never below zero.
    pub fn count(&self) -> u32 {
        u32::try_from(self.value.unwrap_or(1)).unwrap_or(0)
    }
}

impl GameState {
    /// Registers a new effect starting this round and returns it for further tweaking.
    ///
    /// Ids come from a per-game counter so they stay unique for the lifetime of the
    /// game and resolution stays deterministic.
    pub fn register_effect(
        &mut self,
        kind: EffectKind,
        source_card_id: impl Into<CardId>,
        source_player_id: impl Into<PlayerId>,
        duration: u32,
    ) -> &mut GameEffect {
        self.effect_seq += 1;
        let effect = GameEffect {
            id: format!("effect-{}-{}", self.round, self.effect_seq),
            kind,
            source_card_id: source_card_id.into(),
            source_player_id: source_player_id.into(),
            target_player_id: None,
            duration,
            start_round: self.round,
            value: None,
            description: kind.default_description().to_string(),
        };
        self.temporary_effects.push(effect);
        let last = self.temporary_effects.len() - 1;
        &mut self.temporary_effects[last]
    }

    /// True when an effect of `kind` was created in the current round.
    pub fn started_this_round(&self, kind: EffectKind) -> bool {
        self.temporary_effects
            .iter()
            .any(|e| e.kind == kind && e.start_round == self.round)
    }

    pub fn events_blocked(&self) -> bool {
        self.started_this_round(EffectKind::BlockEvents)
    }

    pub fn specials_blocked(&self) -> bool {
        self.started_this_round(EffectKind::BlockSpecials)
    }

    pub fn is_immune_to_specials(&self, player_id: &str) -> bool {
        self.temporary_effects.iter().any(|e| {
            e.kind == EffectKind::SpecialImmunity
                && e.is_active_in(self.round)
                && e.target_player_id.as_deref() == Some(player_id)
        })
    }

    /// Removes and returns the oldest pending `block-next-special` that someone other
    /// than `player_id` set up. Each one cancels exactly one special.
    pub fn take_block_next_special(&mut self, player_id: &str) -> Option<GameEffect> {
        let round = self.round;
        let idx = self.temporary_effects.iter().position(|e| {
            e.kind == EffectKind::BlockNextSpecial && e.source_player_id != player_id && e.is_active_in(round)
        })?;
        Some(self.temporary_effects.remove(idx))
    }

    /// Effects of `kind` created in the current round, oldest first.
    pub fn effects_started_this_round(&self, kind: EffectKind) -> impl Iterator<Item = &GameEffect> + '_ {
        let round = self.round;
        self.temporary_effects
            .iter()
            .filter(move |e| e.kind == kind && e.start_round == round)
    }

    /// Extra cards owed to each player at the end of this round, in seating order.
    pub fn pending_extra_draws(&self) -> Vec<(PlayerId, u32)> {
        self.players
            .iter()
            .filter_map(|p| {
                let count = self
                    .effects_started_this_round(EffectKind::ExtraDraw)
                    .filter(|e| e.source_player_id == p.user_id)
                    .map(GameEffect::count)
                    .fold(0u32, u32::saturating_add);
                (count > 0).then(|| (p.user_id.clone(), count))
            })
            .collect()
    }

    /// Cards every player draws (`DrawAll`) and discards (`DiscardAll`) at the end of this round.
    pub fn pending_table_draws(&self) -> u32 {
        self.effects_started_this_round(EffectKind::DrawAll)
            .map(GameEffect::count)
            .fold(0, u32::saturating_add)
    }

    pub fn pending_table_discards(&self) -> u32 {
        self.effects_started_this_round(EffectKind::DiscardAll)
            .map(GameEffect::count)
            .fold(0, u32::saturating_add)
    }
}

/// Drops every effect whose duration has run out by the current round.
pub fn expire_effects(mut state: GameState) -> GameState {
    let round = state.round;
    let before = state.temporary_effects.len();
    state.temporary_effects.retain(|e| !e.is_expired_at(round));
    let expired = before - state.temporary_effects.len();
    if expired > 0 {
        tracing::debug!(round, expired, "expired temporary effects");
    }
    state
}
