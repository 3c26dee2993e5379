use crate::error::SessionError;
use crate::message::{SessionCommand, SessionEvent};
use mandate_core::deck::{self, get_card_by_id};
use mandate_core::{
    Card, CardId, CardType, CenterCard, Deck, EffectKind, GameEffect, GameState, LogEntry, LogKind, MomentumDirection,
    Player, PlayerId, RulesConfig, expire_effects, process_effects, roll_dice_with,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

pub type GameId = Uuid;

/// Where the current round stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Waiting for the host to deal opening hands
    Dealing,
    /// Players put cards face down into the center
    Playing,
    Revealed,
    Resolved,
    Finished,
}

impl RoundPhase {
    fn as_str(self) -> &'static str {
        match self {
            RoundPhase::Dealing => "dealing",
            RoundPhase::Playing => "playing",
            RoundPhase::Revealed => "revealed",
            RoundPhase::Resolved => "resolved",
            RoundPhase::Finished => "finished",
        }
    }
}

/// A player joining a new game with the deck they built.
#[derive(Debug, Clone)]
pub struct Entrant {
    pub player_id: PlayerId,
    pub name: String,
    pub deck: Deck,
}

impl Entrant {
    pub fn new(player_id: impl Into<PlayerId>, name: impl Into<String>, deck: Deck) -> Entrant {
        Entrant {
            player_id: player_id.into(),
            name: name.into(),
            deck,
        }
    }
}

// Private per-player card holdings. The deck's piles plus the hand always add up
// to every card the player brought, except for cards sitting in the center.
#[derive(Debug, Clone)]
struct Seat {
    deck: Deck,
    hand: Vec<CardId>,
}

/// One running game: the canonical `GameState` plus everything the engine
/// itself does not track (decks, hands, round flow, the winner).
#[derive(Debug)]
pub struct GameSession {
    id: GameId,
    rules: RulesConfig,
    state: GameState,
    seats: HashMap<PlayerId, Seat>,
    host_id: PlayerId,
    phase: RoundPhase,
    winner: Option<PlayerId>,
    next_position: u32,
    // Cards lifted off the top of a deck, waiting for their owner to keep one
    peeked: HashMap<PlayerId, Vec<CardId>>,
    rng: StdRng,
}

impl GameSession {
    /// Seats every entrant, in the given order. The first entrant hosts.
    pub fn new(id: GameId, entrants: Vec<Entrant>, rules: RulesConfig) -> Result<GameSession, SessionError> {
        if entrants.len() < rules.min_players {
            return Err(SessionError::NotEnoughPlayers { needed: rules.min_players, got: entrants.len() });
        }

        let count = entrants.len();
        let mut seats = HashMap::with_capacity(count);
        let mut players = Vec::with_capacity(count);
        for entrant in entrants {
            if seats.contains_key(&entrant.player_id) {
                return Err(SessionError::DuplicatePlayer(entrant.player_id));
            }
            let validation = deck::validate_deck_with(&entrant.deck, &rules);
            if !validation.valid {
                return Err(SessionError::InvalidDeck {
                    player: entrant.player_id,
                    messages: validation.messages(),
                });
            }
            players.push(Player::new(entrant.player_id.clone(), entrant.name));
            seats.insert(entrant.player_id, Seat { deck: entrant.deck, hand: Vec::new() });
        }

        let host_id = players[0].user_id.clone();
        let mut state = GameState::new(players, rules.initial_momentum);
        state.push_log(LogEntry::system(format!("Game created with {} players.", count), state.round));
        info!(game = %id, players = count, "game session created");

        Ok(GameSession {
            id,
            rules,
            state,
            seats,
            host_id,
            phase: RoundPhase::Dealing,
            winner: None,
            next_position: 0,
            peeked: HashMap::new(),
            rng: StdRng::from_os_rng(),
        })
    }

    /// Makes every draw, reshuffle and dice roll of this session reproducible.
    pub fn with_seed(mut self, seed: u64) -> GameSession {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn winner(&self) -> Option<&PlayerId> {
        self.winner.as_ref()
    }

    pub fn host_id(&self) -> &PlayerId {
        &self.host_id
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RoundPhase::Finished
    }

    pub fn hand(&self, player_id: &str) -> Option<&[CardId]> {
        self.seats.get(player_id).map(|s| s.hand.as_slice())
    }

    pub fn deck(&self, player_id: &str) -> Option<&Deck> {
        self.seats.get(player_id).map(|s| &s.deck)
    }

    /// Cards the player lifted off their deck and has not chosen from yet.
    pub fn peeked(&self, player_id: &str) -> Option<&[CardId]> {
        self.peeked.get(player_id).map(Vec::as_slice)
    }

    /// The cards behind the ids in a player's hand.
    pub fn hand_cards(&self, player_id: &str) -> Vec<&Card> {
        self.seats.get(player_id).map_or_else(Vec::new, |seat| {
            seat.hand
                .iter()
                .filter_map(|id| get_card_by_id(&seat.deck, id))
                .collect()
        })
    }

    // --- Round flow ---

    pub fn deal_opening_hands(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.expect_phase(RoundPhase::Dealing, "deal")?;
        let size = self.rules.opening_hand_size;
        let mut events = vec![SessionEvent::HandsDealt { hand_size: size }];
        for player_id in self.seating_order() {
            let card_ids = self.draw(&player_id, size)?;
            events.push(SessionEvent::CardsDrawn { player_id, card_ids });
        }

        self.phase = RoundPhase::Playing;
        let round = self.state.round;
        self.state.push_log(LogEntry::system(
            format!("Opening hands dealt: {} cards each.", size),
            round,
        ));
        events.push(SessionEvent::RoundStarted { round });
        Ok(events)
    }

    /// Moves a card from the hand face down into the center.
    ///
    /// A player gets one politician and one event or special per round. `target`
    /// names the opponent a targeted special should hit.
    pub fn play_card(
        &mut self,
        player_id: &str,
        card_id: &str,
        target: Option<&str>,
    ) -> Result<SessionEvent, SessionError> {
        self.play_card_with(player_id, card_id, target, None)
    }

    /// Like [`GameSession::play_card`], also recording which way the card should move momentum.
    pub fn play_card_with(
        &mut self,
        player_id: &str,
        card_id: &str,
        target: Option<&str>,
        direction: Option<MomentumDirection>,
    ) -> Result<SessionEvent, SessionError> {
        self.expect_phase(RoundPhase::Playing, "play a card")?;
        let not_in_hand = || SessionError::CardNotInHand {
            player: player_id.to_string(),
            card: card_id.to_string(),
        };

        let seat = self
            .seats
            .get(player_id)
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))?;
        let hand_idx = seat.hand.iter().position(|id| id == card_id).ok_or_else(not_in_hand)?;
        let card = get_card_by_id(&seat.deck, card_id).cloned().ok_or_else(not_in_hand)?;

        let player = self
            .state
            .player(player_id)
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))?;
        if card.is_politician() {
            if player.played_card.is_some() {
                return Err(SessionError::AlreadyPlayed { player: player_id.to_string(), slot: "politician" });
            }
        } else {
            if player.special_card.is_some() {
                return Err(SessionError::AlreadyPlayed {
                    player: player_id.to_string(),
                    slot: "event or special",
                });
            }
            if card.card_type == CardType::Special && !player.can_play_special {
                return Err(SessionError::SpecialsSilenced(player_id.to_string()));
            }
        }
        if let Some(t) = target {
            if t == player_id || self.state.player(t).is_none() {
                return Err(SessionError::InvalidTarget(t.to_string()));
            }
        }

        // validated, now commit
        if let Some(seat) = self.seats.get_mut(player_id) {
            seat.hand.remove(hand_idx);
        }
        let round = self.state.round;
        let position = self.next_position;
        self.next_position += 1;
        let mut name = String::new();
        if let Some(player) = self.state.player_mut(player_id) {
            name = player.name.clone();
            if card.is_politician() {
                player.played_card = Some(card.clone());
            } else {
                player.special_card = Some(card.clone());
            }
        }
        self.state.center_cards.push(CenterCard {
            player_id: player_id.to_string(),
            card: Some(card),
            revealed: false,
            position,
            target_player_id: target.map(str::to_string),
            direction,
        });
        self.state.push_log(
            LogEntry::new(LogKind::Action, format!("{} plays a card face down.", name), round).with_player(player_id),
        );
        debug!(game = %self.id, player = %player_id, card = %card_id, position, "card played");

        Ok(SessionEvent::CardPlayed { player_id: player_id.to_string(), position })
    }

    pub fn reveal_all(&mut self) -> Result<SessionEvent, SessionError> {
        self.expect_phase(RoundPhase::Playing, "reveal")?;
        for cc in &mut self.state.center_cards {
            cc.revealed = true;
        }
        self.phase = RoundPhase::Revealed;
        let round = self.state.round;
        let count = self.state.center_cards.len();
        self.state.push_log(LogEntry::system(format!("{} card(s) revealed.", count), round));
        Ok(SessionEvent::CardsRevealed { cards: self.state.center_cards.clone() })
    }

    /// Resolves the revealed cards, carries out the card movement their effects
    /// asked for and scores the round.
    ///
    /// Reveals first if the host skipped that step.
    pub fn resolve_round(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        let mut events = Vec::new();
        if self.phase == RoundPhase::Playing {
            events.push(self.reveal_all()?);
        }
        self.expect_phase(RoundPhase::Revealed, "resolve")?;
        let round = self.state.round;

        // a silence from last round only lasted for this round's plays
        for player in &mut self.state.players {
            player.can_play_special = true;
        }
        self.state = process_effects(std::mem::take(&mut self.state));

        for (player_id, count) in self.state.pending_extra_draws() {
            let card_ids = self.draw(&player_id, count as usize)?;
            events.push(SessionEvent::CardsDrawn { player_id, card_ids });
        }
        events.extend(self.apply_table_effects()?);
        events.extend(self.reveal_hands());
        events.extend(self.settle_forced_discards()?);
        events.extend(self.start_peeks()?);
        events.push(SessionEvent::RoundResolved { round, momentum_level: self.state.momentum_level });
        events.push(self.score_round());
        self.discard_played_cards();

        match self.check_game_over() {
            Some(event) => {
                self.settle_peeks()?;
                events.push(event);
            }
            None => self.phase = RoundPhase::Resolved,
        }
        info!(game = %self.id, round, momentum = self.state.momentum_level, "round resolved");
        events.push(SessionEvent::GameStateSnapshot(self.state.clone()));
        Ok(events)
    }

    /// Starts the next round: clears round-scoped state, drops expired effects
    /// and lets every player draw one card. Peeks nobody chose from keep their top card.
    pub fn advance_round(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.expect_phase(RoundPhase::Resolved, "advance")?;
        self.settle_peeks()?;
        self.state.round += 1;
        for player in &mut self.state.players {
            player.reset_round();
        }
        self.state.center_cards.clear();
        self.next_position = 0;
        self.state = expire_effects(std::mem::take(&mut self.state));
        self.phase = RoundPhase::Playing;

        let round = self.state.round;
        self.state.push_log(LogEntry::system(format!("Round {} begins.", round), round));
        let mut events = vec![SessionEvent::RoundStarted { round }];
        for player_id in self.seating_order() {
            let card_ids = self.draw(&player_id, 1)?;
            events.push(SessionEvent::CardsDrawn { player_id, card_ids });
        }
        Ok(events)
    }

    // --- Card movement ---

    /// Draws up to `count` cards into the player's hand and returns their ids.
    ///
    /// A player marked `discard_next` loses the first drawn card straight to the
    /// discard pile.
    pub fn draw(&mut self, player_id: &str, count: usize) -> Result<Vec<CardId>, SessionError> {
        if self.is_finished() {
            return Err(SessionError::GameOver);
        }
        let round = self.state.round;
        let seat = self
            .seats
            .get_mut(player_id)
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))?;
        let (mut drawn, deck) = deck::draw_cards_with(std::mem::take(&mut seat.deck), count, &mut self.rng);
        seat.deck = deck;
        if drawn.len() < count {
            debug!(player = %player_id, wanted = count, got = drawn.len(), "deck exhausted");
        }

        let forced = match self.state.player_mut(player_id) {
            Some(p) if p.discard_next && !drawn.is_empty() => {
                p.discard_next = false;
                Some((drawn.remove(0), p.name.clone()))
            }
            _ => None,
        };
        if let Some((card_id, name)) = forced {
            seat.deck = deck::discard_cards(std::mem::take(&mut seat.deck), std::slice::from_ref(&card_id));
            self.state.push_log(
                LogEntry::new(LogKind::Action, format!("{} has to discard a freshly drawn card.", name), round)
                    .with_player(player_id)
                    .with_card(card_id),
            );
        }

        seat.hand.extend(drawn.iter().cloned());
        Ok(drawn)
    }

    /// Moves cards from the hand to the discard pile. Nothing moves unless every id is in the hand.
    pub fn discard(&mut self, player_id: &str, card_ids: &[CardId]) -> Result<(), SessionError> {
        if self.is_finished() {
            return Err(SessionError::GameOver);
        }
        let seat = self
            .seats
            .get_mut(player_id)
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))?;

        let mut remaining = seat.hand.clone();
        for card_id in card_ids {
            let idx = remaining
                .iter()
                .position(|id| id == card_id)
                .ok_or_else(|| SessionError::CardNotInHand { player: player_id.to_string(), card: card_id.clone() })?;
            remaining.remove(idx);
        }
        seat.hand = remaining;
        seat.deck = deck::discard_cards(std::mem::take(&mut seat.deck), card_ids);

        let round = self.state.round;
        let name = self.state.player(player_id).map_or_else(String::new, |p| p.name.clone());
        self.state.push_log(
            LogEntry::new(LogKind::Action, format!("{} discards {} card(s).", name, card_ids.len()), round)
                .with_player(player_id),
        );
        Ok(())
    }

    /// Keeps `card_id` out of the player's peeked cards and puts the others back on
    /// top of their deck, `put_back[0]` on top. An empty `put_back` keeps the peeked order.
    pub fn choose_peeked_card(
        &mut self,
        player_id: &str,
        card_id: &str,
        put_back: &[CardId],
    ) -> Result<SessionEvent, SessionError> {
        let peeked = self
            .peeked
            .get(player_id)
            .ok_or_else(|| SessionError::NothingPeeked(player_id.to_string()))?;
        let idx = peeked.iter().position(|id| id == card_id).ok_or_else(|| SessionError::CardNotPeeked {
            player: player_id.to_string(),
            card: card_id.to_string(),
        })?;
        let mut rest = peeked.clone();
        rest.remove(idx);
        let order = if put_back.is_empty() {
            rest
        } else {
            let mut wanted = put_back.to_vec();
            wanted.sort();
            let mut left = rest;
            left.sort();
            if wanted != left {
                return Err(SessionError::InvalidPutBack);
            }
            put_back.to_vec()
        };

        self.peeked.remove(player_id);
        let seat = self
            .seats
            .get_mut(player_id)
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))?;
        seat.deck = deck::put_cards_on_top(std::mem::take(&mut seat.deck), &order);
        seat.hand.push(card_id.to_string());

        let round = self.state.round;
        let name = self.state.player(player_id).map_or_else(String::new, |p| p.name.clone());
        self.state.push_log(
            LogEntry::new(
                LogKind::Action,
                format!("{} keeps one card and puts {} back on top of their deck.", name, order.len()),
                round,
            )
            .with_player(player_id),
        );
        Ok(SessionEvent::CardsDrawn { player_id: player_id.to_string(), card_ids: vec![card_id.to_string()] })
    }

    pub fn roll_dice(&mut self, player_id: &str, card_id: &str) -> Result<u8, SessionError> {
        if self.is_finished() {
            return Err(SessionError::GameOver);
        }
        let name = self
            .state
            .player(player_id)
            .map(|p| p.name.clone())
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))?;
        let roll = roll_dice_with(&self.state, player_id, card_id, &mut self.rng);
        let round = self.state.round;
        self.state.push_log(
            LogEntry::new(LogKind::Action, format!("{} rolls a {}.", name, roll), round)
                .with_player(player_id)
                .with_card(card_id),
        );
        Ok(roll)
    }

    // --- Commands ---

    /// Runs a command on behalf of `player_id`. Failures come back as a single
    /// `SessionEvent::Error` meant for that player only.
    pub fn handle(&mut self, player_id: &str, command: SessionCommand) -> Vec<SessionEvent> {
        match self.dispatch(player_id, command) {
            Ok(events) => events,
            Err(err) => {
                debug!(game = %self.id, player = %player_id, error = %err, "command rejected");
                vec![err.into()]
            }
        }
    }

    fn dispatch(&mut self, player_id: &str, command: SessionCommand) -> Result<Vec<SessionEvent>, SessionError> {
        if self.state.player(player_id).is_none() {
            return Err(SessionError::UnknownPlayer(player_id.to_string()));
        }
        match command {
            SessionCommand::DealOpeningHands => {
                self.require_host(player_id)?;
                let mut events = self.deal_opening_hands()?;
                events.push(SessionEvent::GameStateSnapshot(self.state.clone()));
                Ok(events)
            }
            SessionCommand::PlayCard { card_id, target, direction } => {
                Ok(vec![self.play_card_with(player_id, &card_id, target.as_deref(), direction)?])
            }
            SessionCommand::RevealAll => {
                self.require_host(player_id)?;
                Ok(vec![self.reveal_all()?])
            }
            SessionCommand::ResolveRound => {
                self.require_host(player_id)?;
                self.resolve_round()
            }
            SessionCommand::AdvanceRound => {
                self.require_host(player_id)?;
                self.advance_round()
            }
            SessionCommand::Draw { count } => {
                let card_ids = self.draw(player_id, count)?;
                Ok(vec![SessionEvent::CardsDrawn { player_id: player_id.to_string(), card_ids }])
            }
            SessionCommand::Discard { card_ids } => {
                self.discard(player_id, &card_ids)?;
                Ok(vec![SessionEvent::CardsDiscarded { player_id: player_id.to_string(), card_ids }])
            }
            SessionCommand::RollDice { card_id } => {
                let roll = self.roll_dice(player_id, &card_id)?;
                Ok(vec![SessionEvent::DiceRolled { player_id: player_id.to_string(), card_id, roll }])
            }
            SessionCommand::ChoosePeekedCard { card_id, put_back } => {
                Ok(vec![self.choose_peeked_card(player_id, &card_id, &put_back)?])
            }
            SessionCommand::GetMyHand => {
                let card_ids = self.hand(player_id).map(<[CardId]>::to_vec).unwrap_or_default();
                Ok(vec![SessionEvent::PlayerHand { card_ids }])
            }
        }
    }

    // --- Helpers ---

    fn expect_phase(&self, expected: RoundPhase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == RoundPhase::Finished {
            return Err(SessionError::GameOver);
        }
        if self.phase != expected {
            return Err(SessionError::WrongPhase { action, phase: self.phase.as_str() });
        }
        Ok(())
    }

    fn require_host(&self, player_id: &str) -> Result<(), SessionError> {
        if self.host_id != player_id {
            return Err(SessionError::NotHost);
        }
        Ok(())
    }

    fn seating_order(&self) -> Vec<PlayerId> {
        self.state.players.iter().map(|p| p.user_id.clone()).collect()
    }

    /// Adds everyone's round influence to their running total. The single player
    /// with the highest positive round influence gains a mandate.
    fn score_round(&mut self) -> SessionEvent {
        let round = self.state.round;
        for player in &mut self.state.players {
            player.influence += player.round_influence();
        }
        let contenders: Vec<&Player> = self.state.players.iter().filter(|p| !p.is_skipping_round).collect();
        let best = contenders.iter().map(|p| p.round_influence()).max().unwrap_or(0);
        let mut leaders: Vec<PlayerId> = contenders
            .iter()
            .filter(|p| p.round_influence() == best)
            .map(|p| p.user_id.clone())
            .collect();
        let winner = if best > 0 && leaders.len() == 1 { leaders.pop() } else { None };

        let message = match winner.as_deref().and_then(|id| self.state.player_mut(id)) {
            Some(player) => {
                player.mandates += 1;
                format!("{} wins round {} with {} influence and gains a mandate.", player.name, round, best)
            }
            None => format!("Round {} ends without a winner.", round),
        };
        let mut entry = LogEntry::system(message, round);
        if let Some(id) = &winner {
            entry = entry.with_player(id);
        }
        self.state.push_log(entry);

        SessionEvent::RoundScored { round, winner, influence: best }
    }

    fn discard_played_cards(&mut self) {
        for player in &self.state.players {
            let played: Vec<CardId> = [&player.played_card, &player.special_card]
                .into_iter()
                .flatten()
                .map(|c| c.id.clone())
                .collect();
            if let Some(seat) = self.seats.get_mut(&player.user_id) {
                seat.deck = deck::discard_cards(std::mem::take(&mut seat.deck), &played);
            }
        }
    }

    /// Ends the game once someone reaches the mandate threshold, someone's total
    /// influence reaches the alternate threshold, or the round limit is hit.
    ///
    /// Mandates decide the winner unless only the influence threshold was reached,
    /// then the highest total influence wins. A tie at the top is a draw.
    fn check_game_over(&mut self) -> Option<SessionEvent> {
        let players = &self.state.players;
        let by_mandates = players.iter().any(|p| p.mandates >= self.rules.mandate_threshold);
        let by_influence = players.iter().any(|p| p.influence >= self.rules.alternate_win_threshold);
        if !by_mandates && !by_influence && self.state.round < self.rules.max_rounds {
            return None;
        }

        let influence_decides = by_influence && !by_mandates;
        let winner = if influence_decides {
            unique_leader(players, |p| i64::from(p.influence))
        } else {
            unique_leader(players, |p| i64::from(p.mandates))
        }
        .cloned();

        let round = self.state.round;
        let message = match &winner {
            Some(p) if influence_decides => format!("Game over: {} wins with {} influence.", p.name, p.influence),
            Some(p) => format!("Game over: {} wins with {} mandates.", p.name, p.mandates),
            None => "Game over: the game ends in a draw.".to_string(),
        };
        self.state.push_log(LogEntry::system(message, round));
        self.phase = RoundPhase::Finished;
        self.winner = winner.map(|p| p.user_id);
        info!(game = %self.id, round, winner = ?self.winner, "game over");
        Some(SessionEvent::GameOver { winner: self.winner.clone() })
    }

    // --- Effects that move cards ---

    /// Everyone draws for `draw-all` effects, then discards for `discard-all` ones.
    fn apply_table_effects(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        let mut events = Vec::new();
        let draws = self.state.pending_table_draws() as usize;
        let discards = self.state.pending_table_discards() as usize;
        if draws > 0 {
            for player_id in self.seating_order() {
                let card_ids = self.draw(&player_id, draws)?;
                events.push(SessionEvent::CardsDrawn { player_id, card_ids });
            }
        }
        if discards > 0 {
            for player_id in self.seating_order() {
                let card_ids = self.discard_random(&player_id, discards)?;
                events.push(SessionEvent::CardsDiscarded { player_id, card_ids });
            }
        }
        Ok(events)
    }

    /// Shows each exposed hand to whoever exposed it.
    fn reveal_hands(&mut self) -> Vec<SessionEvent> {
        let reveals: Vec<(PlayerId, PlayerId)> = self
            .state
            .effects_started_this_round(EffectKind::RevealHand)
            .filter_map(|e| e.target_player_id.clone().map(|t| (t, e.source_player_id.clone())))
            .collect();
        let round = self.state.round;
        reveals
            .into_iter()
            .map(|(player_id, viewer)| {
                let card_ids = self.hand(&player_id).map(<[CardId]>::to_vec).unwrap_or_default();
                let name = self.state.player(&player_id).map_or_else(String::new, |p| p.name.clone());
                let viewer_name = self.state.player(&viewer).map_or_else(String::new, |p| p.name.clone());
                self.state.push_log(
                    LogEntry::system(format!("{} reveals their hand to {}.", name, viewer_name), round)
                        .with_player(&player_id),
                );
                SessionEvent::HandRevealed { player_id, viewer, card_ids }
            })
            .collect()
    }

    /// Players told to discard lose a random card from hand now. With an empty
    /// hand the order stays pending and hits their next draw instead.
    fn settle_forced_discards(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        let forced: Vec<PlayerId> = self
            .state
            .players
            .iter()
            .filter(|p| p.discard_next)
            .map(|p| p.user_id.clone())
            .collect();
        let mut events = Vec::new();
        for player_id in forced {
            if self.hand(&player_id).is_none_or(<[CardId]>::is_empty) {
                continue;
            }
            let card_ids = self.discard_random(&player_id, 1)?;
            if let Some(p) = self.state.player_mut(&player_id) {
                p.discard_next = false;
            }
            events.push(SessionEvent::CardsDiscarded { player_id, card_ids });
        }
        Ok(events)
    }

    /// Lifts the top cards off the deck of every `peek-and-keep` owner. They stay
    /// out of deck and hand until the owner keeps one.
    fn start_peeks(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        let peeks: Vec<(PlayerId, usize)> = self
            .state
            .effects_started_this_round(EffectKind::PeekAndKeep)
            .map(|e| (e.source_player_id.clone(), GameEffect::count(e) as usize))
            .collect();
        let mut events = Vec::new();
        for (player_id, look) in peeks {
            if let Some(first) = self.peeked(&player_id).and_then(|ids| ids.first()).cloned() {
                self.choose_peeked_card(&player_id, &first, &[])?;
            }
            let seat = self
                .seats
                .get_mut(&player_id)
                .ok_or_else(|| SessionError::UnknownPlayer(player_id.clone()))?;
            // peek first so an almost empty pile is not topped up from the discards mid-lift
            let (top, deck) = deck::peek_top_cards_with(std::mem::take(&mut seat.deck), look, &mut self.rng);
            let (card_ids, deck) = deck::draw_cards_with(deck, top.len(), &mut self.rng);
            seat.deck = deck;
            if card_ids.is_empty() {
                continue;
            }
            debug!(game = %self.id, player = %player_id, cards = card_ids.len(), "cards peeked");
            self.peeked.insert(player_id.clone(), card_ids.clone());
            events.push(SessionEvent::CardsPeeked { player_id, card_ids });
        }
        Ok(events)
    }

    /// Every pending peek keeps its top card and puts the rest back unchanged.
    fn settle_peeks(&mut self) -> Result<(), SessionError> {
        for player_id in self.seating_order() {
            if let Some(first) = self.peeked(&player_id).and_then(|ids| ids.first()).cloned() {
                self.choose_peeked_card(&player_id, &first, &[])?;
            }
        }
        Ok(())
    }

    /// Discards up to `count` cards picked at random from the player's hand.
    fn discard_random(&mut self, player_id: &str, count: usize) -> Result<Vec<CardId>, SessionError> {
        let mut hand = self
            .hand(player_id)
            .map(<[CardId]>::to_vec)
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))?;
        let mut picked = Vec::new();
        while picked.len() < count && !hand.is_empty() {
            let idx = self.rng.random_range(0..hand.len());
            picked.push(hand.remove(idx));
        }
        if !picked.is_empty() {
            self.discard(player_id, &picked)?;
        }
        Ok(picked)
    }
}

/// The only player with the highest `key`, if there is exactly one.
fn unique_leader(players: &[Player], key: impl Fn(&Player) -> i64) -> Option<&Player> {
    let best = players.iter().map(&key).max()?;
    let mut leaders = players.iter().filter(|&p| key(p) == best);
    match (leaders.next(), leaders.next()) {
        (Some(leader), None) => Some(leader),
        _ => None,
    }
}
