//! Round resolution: applies the effects of every revealed center card.
//!
//! The state is threaded through by value. Each handler takes the current
//! `GameState`, returns the next one, and nothing else holds a reference to it
//! while a round resolves.

use crate::card::{Ability, BlockedCategory, Card, CardType, Condition, MomentumDirection};
use crate::config::{NEUTRAL_MOMENTUM, clamp_momentum};
use crate::state::{EffectKind, GameState, LogEntry, PlayerId};
use rand::Rng;
use tracing::{debug, warn};

/// A revealed card waiting to resolve.
#[derive(Debug, Clone)]
struct Play {
    card: Card,
    player_id: PlayerId,
    position: u32,
    target: Option<PlayerId>,
    direction: Option<MomentumDirection>,
}

/// Who played the card, whom they aimed it at and which way they want momentum to go.
#[derive(Debug, Clone, Copy)]
struct EffectContext<'a> {
    player_id: &'a str,
    target: Option<&'a str>,
    direction: Option<MomentumDirection>,
}

/// Resolves every revealed center card of the round.
///
/// Cards resolve by type (politicians, then events, then specials) and within a
/// type by play position. When nothing is revealed the input comes back untouched.
pub fn process_effects(state: GameState) -> GameState {
    let mut plays: Vec<Play> = state
        .center_cards
        .iter()
        .filter(|cc| cc.revealed)
        .filter_map(|cc| {
            cc.card.as_ref().map(|card| Play {
                card: card.clone(),
                player_id: cc.player_id.clone(),
                position: cc.position,
                target: cc.target_player_id.clone(),
                direction: cc.direction,
            })
        })
        .collect();

    if plays.is_empty() {
        return state;
    }

    // sort_by_key is stable, equal keys keep their center-card order
    plays.sort_by_key(|p| (p.card.card_type.resolution_rank(), p.position));
    debug!(round = state.round, cards = plays.len(), "resolving round");

    plays.into_iter().fold(state, |state, play| {
        let ctx = EffectContext {
            player_id: &play.player_id,
            target: play.target.as_deref(),
            direction: play.direction,
        };
        apply_play(state, &play.card, ctx)
    })
}

/// Applies one card as if `player_id` had just revealed it.
///
/// `target` is the opponent chosen for targeted specials. Without one (or with an
/// invalid one) the first opponent in seating order is used.
pub fn apply_card_effect(state: GameState, card: &Card, player_id: &str, target: Option<&str>) -> GameState {
    let ctx = EffectContext {
        player_id,
        target,
        direction: None,
    };
    apply_play(state, card, ctx)
}

fn apply_play(mut state: GameState, card: &Card, ctx: EffectContext) -> GameState {
    let player_id = ctx.player_id;
    let round = state.round;
    let Some(player) = state.player(player_id) else {
        warn!(player = %player_id, card = %card.name, "player not found for card effect");
        state.push_log(
            LogEntry::error(format!("Player {} not found for card effect", player_id), round).with_card(&card.id),
        );
        return state;
    };

    let message = format!("{}'s {} effect: {}", player.name, card.name, card.effect);
    state.push_log(LogEntry::system(message, round).with_player(player_id).with_card(&card.id));
    debug!(player = %player_id, card = %card.name, kind = %card.card_type, "applying card effect");

    match card.card_type {
        CardType::Politician => apply_politician_effect(state, card, ctx),
        CardType::Event => apply_event_effect(state, card, ctx),
        CardType::Special => apply_special_effect(state, card, ctx),
        CardType::Unknown => state,
    }
}

/// Rolls a six-sided die for an effect. Folding the result into the state is up to the caller.
pub fn roll_dice(state: &GameState, player_id: &str, card_id: &str) -> u8 {
    roll_dice_with(state, player_id, card_id, &mut rand::rng())
}

pub fn roll_dice_with<R: Rng + ?Sized>(state: &GameState, player_id: &str, card_id: &str, rng: &mut R) -> u8 {
    let roll = rng.random_range(1..=6);
    debug!(round = state.round, player = %player_id, card = %card_id, roll, "dice rolled");
    roll
}

// --- Type handlers ---

fn apply_politician_effect(state: GameState, card: &Card, ctx: EffectContext) -> GameState {
    apply_abilities(state, card, ctx)
}

fn apply_event_effect(mut state: GameState, card: &Card, ctx: EffectContext) -> GameState {
    if state.events_blocked() {
        let round = state.round;
        state.push_log(LogEntry::system(format!("{} event was blocked.", card.name), round).with_card(&card.id));
        return state;
    }
    apply_abilities(state, card, ctx)
}

fn apply_special_effect(mut state: GameState, card: &Card, ctx: EffectContext) -> GameState {
    let round = state.round;
    if state.specials_blocked() {
        state.push_log(LogEntry::system(format!("{} special was blocked.", card.name), round).with_card(&card.id));
        return state;
    }
    if let Some(blocker) = state.take_block_next_special(ctx.player_id) {
        debug!(effect = %blocker.id, card = %card.name, "special cancelled by pending block");
        state.push_log(
            LogEntry::system(format!("{} was blocked before it could take effect.", card.name), round)
                .with_player(ctx.player_id)
                .with_card(&card.id),
        );
        return state;
    }
    apply_abilities(state, card, ctx)
}

fn apply_abilities(state: GameState, card: &Card, ctx: EffectContext) -> GameState {
    card.abilities
        .iter()
        .fold(state, |state, ability| apply_ability(state, card, ctx, ability))
}

// --- Abilities ---

fn apply_ability(mut state: GameState, card: &Card, ctx: EffectContext, ability: &Ability) -> GameState {
    let round = state.round;
    let owner = ctx.player_id;
    let log = |message: String| LogEntry::system(message, round).with_player(owner).with_card(&card.id);

    match ability {
        Ability::BlockCategory { category, duration } => {
            let kind = match category {
                BlockedCategory::Events => EffectKind::BlockEvents,
                BlockedCategory::Specials => EffectKind::BlockSpecials,
            };
            state.register_effect(kind, &card.id, owner, *duration);
        }
        Ability::PenalizeRivalPoliticians { amount } => {
            state.adjust_influence(-amount, |p| {
                p.user_id != owner && p.played_card.as_ref().is_some_and(Card::is_politician)
            });
        }
        Ability::ConditionalBoost { condition, amount } => {
            if condition.holds(&state, owner) {
                state.adjust_influence(*amount, |p| p.user_id == owner);
            } else {
                debug!(card = %card.name, ?condition, "condition not met, no boost");
            }
        }
        Ability::PenalizeOthers { amount } => {
            state.adjust_influence(-amount, |p| p.user_id != owner);
        }
        Ability::PenalizeAll { amount } => {
            state.adjust_influence(-amount, |_| true);
        }
        Ability::BoostPoliticians { amount, countries } => {
            state.adjust_influence(*amount, |p| match &p.played_card {
                Some(played) if played.is_politician() => {
                    countries.is_empty() || played.country.as_ref().is_some_and(|c| countries.contains(c))
                }
                _ => false,
            });
        }
        Ability::ExtraDraw { count, condition } => {
            if condition.as_ref().is_none_or(|c| c.holds(&state, owner)) {
                let effect = state.register_effect(EffectKind::ExtraDraw, &card.id, owner, 1);
                effect.value = Some(i32::try_from(*count).unwrap_or(i32::MAX));
                effect.description = format!("Draw {} extra card(s) at end of round", count);
                let name = player_name(&state, owner);
                state.push_log(log(format!(
                    "{} will draw {} extra card(s) at the end of the round.",
                    name, count
                )));
            }
        }
        Ability::SetMomentum { level } => {
            state.momentum_level = clamp_momentum(i32::from(*level));
            let message = if state.momentum_level == NEUTRAL_MOMENTUM {
                format!("{} resets momentum to neutral (level {}).", card.name, NEUTRAL_MOMENTUM)
            } else {
                format!("{} sets momentum to level {}.", card.name, state.momentum_level)
            };
            state.push_log(log(message));
        }
        Ability::ShiftMomentum { delta } => {
            let before = state.momentum_level;
            state.momentum_level = clamp_momentum(i32::from(before) + i32::from(*delta));
            state.push_log(log(format!(
                "{} moves momentum from level {} to level {}.",
                card.name, before, state.momentum_level
            )));
        }
        Ability::TargetedPenalty { amount } => {
            if let Some(target) = resolve_target(&mut state, card, ctx) {
                let name = player_name(&state, &target);
                state.adjust_influence(-amount, |p| p.user_id == target);
                state.push_log(log(format!(
                    "{} targets {}, reducing their influence by {}.",
                    card.name, name, amount
                )));
            }
        }
        Ability::BlockNextSpecial => {
            state.register_effect(EffectKind::BlockNextSpecial, &card.id, owner, 1);
            state.push_log(log(format!(
                "{} prevents the next special card from being played.",
                card.name
            )));
        }
        Ability::ProtectMandates => {
            if let Some(p) = state.player_mut(owner) {
                p.protected_mandates = true;
            }
            let name = player_name(&state, owner);
            state.push_log(log(format!("{}'s mandates are protected this round.", name)));
        }
        Ability::SilenceOpponentSpecials => {
            for p in state.players.iter_mut().filter(|p| p.user_id != owner) {
                p.can_play_special = false;
            }
            state.push_log(log(format!(
                "{}: opponents cannot play special cards next round.",
                card.name
            )));
        }
        Ability::DoubleInfluence => {
            let base = state
                .player(owner)
                .and_then(|p| p.played_card.as_ref())
                .filter(|c| c.is_politician())
                .map_or(0, |c| c.influence);
            state.adjust_influence(base, |p| p.user_id == owner);
        }
        Ability::ForceDiscard => {
            if let Some(target) = resolve_target(&mut state, card, ctx) {
                if let Some(p) = state.player_mut(&target) {
                    p.discard_next = true;
                }
                state.register_effect(EffectKind::RevealHand, &card.id, owner, 1).target_player_id =
                    Some(target.clone());
                let name = player_name(&state, &target);
                state.push_log(log(format!(
                    "{} exposes {}, who reveals their hand and must discard a card.",
                    card.name, name
                )));
            }
        }
        Ability::DiscardAll { count } => {
            let effect = state.register_effect(EffectKind::DiscardAll, &card.id, owner, 1);
            effect.value = Some(i32::try_from(*count).unwrap_or(i32::MAX));
            state.push_log(log(format!("{}: every player discards {} card(s).", card.name, count)));
        }
        Ability::DrawAll { count } => {
            let effect = state.register_effect(EffectKind::DrawAll, &card.id, owner, 1);
            effect.value = Some(i32::try_from(*count).unwrap_or(i32::MAX));
            state.push_log(log(format!("{}: every player draws {} card(s).", card.name, count)));
        }
        Ability::CancelLastPolitician => {
            let last = state
                .center_cards
                .iter()
                .filter(|cc| cc.revealed && cc.player_id != owner)
                .filter_map(|cc| cc.card.as_ref().filter(|c| c.is_politician()).map(|c| (cc, c)))
                .max_by_key(|(cc, _)| cc.position)
                .map(|(cc, c)| (cc.player_id.clone(), c.name.clone(), c.influence));
            match last {
                Some((victim, _, _)) if state.is_immune_to_specials(&victim) => {
                    let name = player_name(&state, &victim);
                    state.push_log(log(format!("{} is immune to {} this round.", name, card.name)));
                }
                Some((victim, politician, influence)) => {
                    state.adjust_influence(-influence, |p| p.user_id == victim);
                    let name = player_name(&state, &victim);
                    state.push_log(log(format!("{} cancels {}'s {}.", card.name, name, politician)));
                }
                None => state.push_log(log(format!("{}: no opposing politician to cancel.", card.name))),
            }
        }
        Ability::ChosenMomentumShift { amount } => {
            let before = state.momentum_level;
            let step = i32::from(*amount);
            let delta = match ctx.direction.unwrap_or(MomentumDirection::Up) {
                MomentumDirection::Up => step,
                MomentumDirection::Down => -step,
            };
            state.momentum_level = clamp_momentum(i32::from(before) + delta);
            state.push_log(log(format!(
                "{} moves momentum from level {} to level {}.",
                card.name, before, state.momentum_level
            )));
        }
        Ability::PeekAndKeep { look } => {
            let effect = state.register_effect(EffectKind::PeekAndKeep, &card.id, owner, 1);
            effect.value = Some(i32::try_from(*look).unwrap_or(i32::MAX));
            let name = player_name(&state, owner);
            state.push_log(log(format!(
                "{} looks at the top {} card(s) of their deck and keeps one.",
                name, look
            )));
        }
        Ability::AwardMandateToLeader { amount } => {
            match round_leader(&state) {
                Some(leader) => {
                    if let Some(p) = state.player_mut(&leader) {
                        p.mandates += amount;
                    }
                    let name = player_name(&state, &leader);
                    state.push_log(log(format!("{} gains {} mandate(s) from {}.", name, amount, card.name)));
                }
                None => state.push_log(log(format!("{}: no single leader, no mandate awarded.", card.name))),
            }
        }
        Ability::SpecialImmunity => {
            let effect = state.register_effect(EffectKind::SpecialImmunity, &card.id, owner, 1);
            effect.target_player_id = Some(owner.to_string());
        }
    }
    state
}

impl Condition {
    /// Evaluates the condition for the player who owns the card.
    pub fn holds(&self, state: &GameState, owner: &str) -> bool {
        let own_mandates = state.player(owner).map_or(0, |p| p.mandates);
        match self {
            Condition::MomentumAtLeast { level } => state.momentum_level >= *level,
            Condition::MomentumBelow { level } => state.momentum_level < *level,
            Condition::OtherPoliticianInPlay => state.has_other_politician_in_play(owner),
            Condition::TrailingInMandates => state.opponents(owner).any(|p| p.mandates > own_mandates),
            Condition::FewestMandates => state.opponents(owner).all(|p| p.mandates >= own_mandates),
        }
    }
}

/// Picks the opponent a targeted special hits.
///
/// A requested target is honoured when it names an opponent; otherwise the first
/// opponent in seating order is used. Returns `None` (and logs why) when there is
/// nobody to hit or the target is immune.
fn resolve_target(state: &mut GameState, card: &Card, ctx: EffectContext) -> Option<PlayerId> {
    let round = state.round;
    let requested = ctx
        .target
        .filter(|t| *t != ctx.player_id && state.player(t).is_some())
        .map(str::to_string);
    if ctx.target.is_some() && requested.is_none() {
        debug!(card = %card.name, target = ?ctx.target, "invalid target, falling back to first opponent");
    }

    let target = requested.or_else(|| state.opponents(ctx.player_id).next().map(|p| p.user_id.clone()));
    let Some(target) = target else {
        state.push_log(
            LogEntry::system(format!("{} has no valid target.", card.name), round)
                .with_player(ctx.player_id)
                .with_card(&card.id),
        );
        return None;
    };

    if state.is_immune_to_specials(&target) {
        let name = player_name(state, &target);
        state.push_log(
            LogEntry::system(format!("{} is immune to {} this round.", name, card.name), round)
                .with_player(ctx.player_id)
                .with_card(&card.id),
        );
        return None;
    }
    Some(target)
}

/// The single player with the highest round influence, skipping players who sit the round out.
fn round_leader(state: &GameState) -> Option<PlayerId> {
    let contenders: Vec<_> = state.players.iter().filter(|p| !p.is_skipping_round).collect();
    let best = contenders.iter().map(|p| p.round_influence()).max()?;
    let mut leaders = contenders.iter().filter(|p| p.round_influence() == best);
    match (leaders.next(), leaders.next()) {
        (Some(leader), None) => Some(leader.user_id.clone()),
        _ => None,
    }
}

fn player_name(state: &GameState, player_id: &str) -> String {
    state
        .player(player_id)
        .map_or_else(|| player_id.to_string(), |p| p.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CardCatalog;
    use crate::state::{CenterCard, LogKind, Player};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn card(name: &str) -> Card {
        let catalog = CardCatalog::standard().unwrap();
        catalog.by_name(name).cloned().unwrap()
    }

    fn setup_test_game(momentum: u8) -> GameState {
        let players = vec![
            Player::new("p1", "Alice"),
            Player::new("p2", "Bob"),
            Player::new("p3", "Carol"),
        ];
        GameState::new(players, momentum)
    }

    fn play(state: &mut GameState, player_id: &str, card: Card, position: u32) {
        if let Some(p) = state.player_mut(player_id) {
            if card.is_politician() {
                p.played_card = Some(card.clone());
            } else {
                p.special_card = Some(card.clone());
            }
        }
        state.center_cards.push(CenterCard {
            player_id: player_id.to_string(),
            card: Some(card),
            revealed: true,
            position,
            target_player_id: None,
            direction: None,
        });
    }

    fn modifier(state: &GameState, player_id: &str) -> i32 {
        state.player(player_id).unwrap().influence_modifier
    }

    fn effect_log_order(state: &GameState) -> Vec<String> {
        state
            .log
            .iter()
            .filter(|e| e.message.contains(" effect: "))
            .filter_map(|e| e.card_id.clone())
            .collect()
    }

    #[test]
    fn test_no_revealed_cards_returns_input() {
        let mut state = setup_test_game(3);
        state.center_cards.push(CenterCard {
            player_id: "p1".to_string(),
            card: Some(card("UN Resolution")),
            revealed: false,
            position: 0,
            target_player_id: None,
            direction: None,
        });
        state.center_cards.push(CenterCard {
            player_id: "p2".to_string(),
            card: None,
            revealed: true,
            position: 1,
            target_player_id: None,
            direction: None,
        });
        let before = state.clone();
        assert_eq!(process_effects(state), before);
    }

    #[test]
    fn test_type_rank_overrides_play_order() {
        let mut state = setup_test_game(3);
        let event = Card::new("e", "Quiet Event", CardType::Event).with_effect("nothing");
        let politician = Card::new("p", "Quiet Politician", CardType::Politician).with_effect("nothing");
        let special = Card::new("s", "Quiet Special", CardType::Special).with_effect("nothing");
        play(&mut state, "p1", event, 0);
        play(&mut state, "p2", politician, 1);
        play(&mut state, "p3", special, 2);

        let state = process_effects(state);
        assert_eq!(effect_log_order(&state), vec!["p", "e", "s"]);
    }

    #[test]
    fn test_same_type_resolves_by_position() {
        let mut state = setup_test_game(3);
        play(&mut state, "p1", Card::new("late", "Late", CardType::Event), 5);
        play(&mut state, "p2", Card::new("early", "Early", CardType::Event), 1);
        play(&mut state, "p3", Card::new("odd", "Odd", CardType::Unknown), 0);

        let state = process_effects(state);
        assert_eq!(effect_log_order(&state), vec!["early", "late", "odd"]);
    }

    #[test]
    fn test_block_events_short_circuits_event() {
        let mut state = setup_test_game(5);
        // the event is played first but still resolves after the politician
        play(&mut state, "p2", card("UN Resolution"), 0);
        play(&mut state, "p1", card("Angela Merkel"), 1);

        let state = process_effects(state);
        assert_eq!(state.momentum_level, 5);
        assert!(state.events_blocked());
        assert!(state.log.iter().any(|e| e.message == "UN Resolution event was blocked."));
        assert!(!state.log.iter().any(|e| e.message.contains("resets momentum")));
    }

    #[test]
    fn test_block_from_earlier_round_does_not_block() {
        let mut state = setup_test_game(5);
        state.register_effect(EffectKind::BlockEvents, "card-1", "p1", 1);
        state.round = 2;
        let state = apply_card_effect(state, &card("UN Resolution"), "p2", None);
        assert_eq!(state.momentum_level, NEUTRAL_MOMENTUM);
    }

    #[test]
    fn test_unknown_card_only_appends_generic_log() {
        let state = setup_test_game(3);
        let mystery = Card::new("x-1", "Mystery", CardType::Politician).with_effect("Does nothing at all.");
        let after = apply_card_effect(state.clone(), &mystery, "p1", None);

        let mut expected = state;
        expected.push_log(
            LogEntry::system("Alice's Mystery effect: Does nothing at all.", 1)
                .with_player("p1")
                .with_card("x-1"),
        );
        assert_eq!(after, expected);
    }

    #[test]
    fn test_empty_effect_text_still_logs() {
        let state = setup_test_game(3);
        let blank = Card::new("x-3", "Blank", CardType::Event);
        let after = apply_card_effect(state.clone(), &blank, "p2", None);

        let mut expected = state;
        expected.push_log(LogEntry::system("Bob's Blank effect: ", 1).with_player("p2").with_card("x-3"));
        assert_eq!(after, expected);
    }

    #[test]
    fn test_missing_player_is_logged_and_skipped() {
        let mut state = setup_test_game(3);
        play(&mut state, "ghost", card("Vladimir Putin"), 0);
        play(&mut state, "p1", card("UN Resolution"), 1);

        let state = process_effects(state);
        let error = state.log.iter().find(|e| e.kind == LogKind::Error).unwrap();
        assert_eq!(error.message, "Player ghost not found for card effect");
        assert!(state.players.iter().all(|p| p.influence_modifier == 0));
        assert_eq!(state.momentum_level, NEUTRAL_MOMENTUM);
    }

    #[test]
    fn test_trump_only_hits_rival_politicians() {
        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Donald Trump"), 0);
        play(&mut state, "p2", card("Olaf Scholz"), 1);
        play(&mut state, "p3", card("Shitstorm"), 2);

        let state = apply_card_effect(state, &card("Donald Trump"), "p1", None);
        assert_eq!(modifier(&state, "p1"), 0);
        assert_eq!(modifier(&state, "p2"), -2);
        assert_eq!(modifier(&state, "p3"), 0);
    }

    #[test]
    fn test_conditional_boost_respects_threshold() {
        let below = apply_card_effect(setup_test_game(3), &card("Volodymyr Zelenskyj"), "p1", None);
        assert_eq!(modifier(&below, "p1"), 0);
        assert_eq!(below.log.len(), 1);

        let at = apply_card_effect(setup_test_game(4), &card("Volodymyr Zelenskyj"), "p1", None);
        assert_eq!(modifier(&at, "p1"), 3);

        let baerbock = apply_card_effect(setup_test_game(2), &card("Annalena Baerbock"), "p2", None);
        assert_eq!(modifier(&baerbock, "p2"), 2);

        let johnson = apply_card_effect(setup_test_game(3), &card("Boris Johnson"), "p2", None);
        assert_eq!(modifier(&johnson, "p2"), 0);
    }

    #[test]
    fn test_putin_penalizes_everyone_else() {
        let state = apply_card_effect(setup_test_game(3), &card("Vladimir Putin"), "p2", None);
        assert_eq!(modifier(&state, "p1"), -1);
        assert_eq!(modifier(&state, "p2"), 0);
        assert_eq!(modifier(&state, "p3"), -1);
    }

    #[test]
    fn test_extra_draw_registers_effect_only() {
        let state = apply_card_effect(setup_test_game(3), &card("Lobbyismus"), "p3", None);
        assert_eq!(state.temporary_effects.len(), 1);
        let effect = &state.temporary_effects[0];
        assert_eq!(effect.kind, EffectKind::ExtraDraw);
        assert_eq!(effect.value, Some(1));
        assert_eq!(effect.start_round, 1);
        assert_eq!(effect.source_player_id, "p3");
        assert_eq!(state.pending_extra_draws(), vec![("p3".to_string(), 1)]);
        assert!(state.log.iter().any(|e| e.message == "Carol will draw 1 extra card(s) at the end of the round."));
    }

    #[test]
    fn test_conditional_extra_draw() {
        let low = apply_card_effect(setup_test_game(2), &card("Emmanuel Macron"), "p1", None);
        assert!(low.temporary_effects.is_empty());
        let high = apply_card_effect(setup_test_game(3), &card("Emmanuel Macron"), "p1", None);
        assert_eq!(high.pending_extra_draws(), vec![("p1".to_string(), 1)]);
    }

    #[test]
    fn test_un_resolution_resets_momentum() {
        let state = apply_card_effect(setup_test_game(6), &card("UN Resolution"), "p1", None);
        assert_eq!(state.momentum_level, 3);
        assert!(state.log.iter().any(|e| e.message == "UN Resolution resets momentum to neutral (level 3)."));
    }

    #[test]
    fn test_momentum_shift_is_clamped() {
        let state = apply_card_effect(setup_test_game(5), &card("Nuclear Tensions"), "p1", None);
        assert_eq!(state.momentum_level, 6);
        let state = apply_card_effect(setup_test_game(1), &card("Diplomatic Breakthrough"), "p1", None);
        assert_eq!(state.momentum_level, 1);
    }

    #[test]
    fn test_nuclear_tensions_makes_everyone_discard() {
        let state = apply_card_effect(setup_test_game(2), &card("Nuclear Tensions"), "p1", None);
        assert_eq!(state.momentum_level, 4);
        assert_eq!(state.pending_table_discards(), 1);
        assert_eq!(state.pending_table_draws(), 0);
        assert!(state.log.iter().any(|e| e.message == "Nuclear Tensions: every player discards 1 card(s)."));
    }

    #[test]
    fn test_diplomatic_breakthrough_makes_everyone_draw() {
        let state = apply_card_effect(setup_test_game(4), &card("Diplomatic Breakthrough"), "p2", None);
        assert_eq!(state.momentum_level, 3);
        assert_eq!(state.pending_table_draws(), 1);
        assert_eq!(state.pending_table_discards(), 0);
    }

    #[test]
    fn test_blocked_event_registers_no_table_effect() {
        let mut state = setup_test_game(3);
        state.register_effect(EffectKind::BlockEvents, "card-1", "p1", 1);
        let state = apply_card_effect(state, &card("Nuclear Tensions"), "p2", None);
        assert_eq!(state.momentum_level, 3);
        assert_eq!(state.pending_table_discards(), 0);
    }

    #[test]
    fn test_huge_extra_draw_count_saturates() {
        let greedy = Card::new("x-2", "Greedy", CardType::Event)
            .with_effect("Draw a lot.")
            .with_ability(Ability::ExtraDraw { count: u32::MAX, condition: None });
        let state = apply_card_effect(setup_test_game(3), &greedy, "p1", None);
        assert_eq!(state.temporary_effects[0].value, Some(i32::MAX));
        assert_eq!(state.pending_extra_draws(), vec![("p1".to_string(), i32::MAX as u32)]);
    }

    #[test]
    fn test_counterintelligence_cancels_last_opposing_politician() {
        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Emmanuel Macron"), 0);
        play(&mut state, "p2", card("Angela Merkel"), 1);
        play(&mut state, "p3", card("Counterintelligence"), 2);

        let state = process_effects(state);
        assert_eq!(modifier(&state, "p2"), -6);
        assert_eq!(state.player("p2").unwrap().round_influence(), 0);
        assert_eq!(modifier(&state, "p1"), 0);
        assert!(state.log.iter().any(|e| e.message == "Counterintelligence cancels Bob's Angela Merkel."));
    }

    #[test]
    fn test_counterintelligence_skips_own_politician() {
        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Angela Merkel"), 0);
        play(&mut state, "p2", card("Olaf Scholz"), 1);
        play(&mut state, "p2", card("Counterintelligence"), 2);

        let state = process_effects(state);
        assert_eq!(modifier(&state, "p1"), -6);
        // Scholz keeps his own boost
        assert_eq!(modifier(&state, "p2"), 2);

        let lonely = apply_card_effect(setup_test_game(3), &card("Counterintelligence"), "p1", None);
        assert!(lonely.players.iter().all(|p| p.influence_modifier == 0));
        assert!(lonely.log.iter().any(|e| e.message == "Counterintelligence: no opposing politician to cancel."));
    }

    #[test]
    fn test_counterintelligence_respects_immunity() {
        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Angela Merkel"), 0);
        play(&mut state, "p1", card("Diplomatic Immunity"), 1);
        play(&mut state, "p2", card("Counterintelligence"), 2);

        let state = process_effects(state);
        assert_eq!(modifier(&state, "p1"), 0);
        assert!(state.log.iter().any(|e| e.message == "Alice is immune to Counterintelligence this round."));
    }

    #[test]
    fn test_fake_news_follows_chosen_direction() {
        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Fake News"), 0);
        state.center_cards[0].direction = Some(MomentumDirection::Down);
        assert_eq!(process_effects(state).momentum_level, 2);

        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Fake News"), 0);
        state.center_cards[0].direction = Some(MomentumDirection::Up);
        assert_eq!(process_effects(state).momentum_level, 4);

        // no choice pushes momentum up, and the range still clamps
        let state = apply_card_effect(setup_test_game(6), &card("Fake News"), "p1", None);
        assert_eq!(state.momentum_level, 6);
        assert!(state.log.iter().any(|e| e.message == "Fake News moves momentum from level 6 to level 6."));
    }

    #[test]
    fn test_opposition_research_registers_peek() {
        let state = apply_card_effect(setup_test_game(3), &card("Opposition Research"), "p2", None);
        let peeks: Vec<_> = state.effects_started_this_round(EffectKind::PeekAndKeep).collect();
        assert_eq!(peeks.len(), 1);
        assert_eq!(peeks[0].source_player_id, "p2");
        assert_eq!(peeks[0].value, Some(3));
        assert!(state.log.iter().any(|e| e.message == "Bob looks at the top 3 card(s) of their deck and keeps one."));
    }

    #[test]
    fn test_shitstorm_defaults_to_first_opponent() {
        let state = apply_card_effect(setup_test_game(3), &card("Shitstorm"), "p2", None);
        assert_eq!(modifier(&state, "p1"), -2);
        assert_eq!(modifier(&state, "p3"), 0);
        assert!(state.log.iter().any(|e| e.message == "Shitstorm targets Alice, reducing their influence by 2."));
    }

    #[test]
    fn test_shitstorm_honours_chosen_target() {
        let state = apply_card_effect(setup_test_game(3), &card("Shitstorm"), "p1", Some("p3"));
        assert_eq!(modifier(&state, "p2"), 0);
        assert_eq!(modifier(&state, "p3"), -2);

        // aiming at yourself is not allowed, fall back to the first opponent
        let state = apply_card_effect(setup_test_game(3), &card("Shitstorm"), "p1", Some("p1"));
        assert_eq!(modifier(&state, "p1"), 0);
        assert_eq!(modifier(&state, "p2"), -2);
    }

    #[test]
    fn test_center_card_target_is_used() {
        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Shitstorm"), 0);
        state.center_cards[0].target_player_id = Some("p3".to_string());
        let state = process_effects(state);
        assert_eq!(modifier(&state, "p3"), -2);
    }

    #[test]
    fn test_media_blackout_blocks_next_special_once() {
        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Media Blackout"), 0);
        play(&mut state, "p2", card("Shitstorm"), 1);
        play(&mut state, "p3", card("Shitstorm"), 2);

        let state = process_effects(state);
        // p2's Shitstorm is swallowed, p3's lands on p1
        assert_eq!(modifier(&state, "p1"), -2);
        assert_eq!(modifier(&state, "p3"), 0);
        assert!(state.log.iter().any(|e| e.message == "Shitstorm was blocked before it could take effect."));
        assert!(!state.temporary_effects.iter().any(|e| e.kind == EffectKind::BlockNextSpecial));
    }

    #[test]
    fn test_pandemic_blocks_specials_this_round() {
        let mut state = setup_test_game(2);
        play(&mut state, "p1", card("Shitstorm"), 0);
        play(&mut state, "p2", card("Pandemic"), 1);

        let state = process_effects(state);
        assert_eq!(state.momentum_level, 4);
        assert!(state.players.iter().all(|p| p.influence_modifier == 0));
        assert!(state.log.iter().any(|e| e.message == "Shitstorm special was blocked."));
    }

    #[test]
    fn test_immunity_deflects_targeted_special() {
        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Diplomatic Immunity"), 0);
        play(&mut state, "p2", card("Whistleblower"), 1);

        let state = process_effects(state);
        assert!(!state.player("p1").unwrap().discard_next);
        assert!(!state.started_this_round(EffectKind::RevealHand));
        assert!(state.log.iter().any(|e| e.message == "Alice is immune to Whistleblower this round."));
    }

    #[test]
    fn test_whistleblower_forces_discard() {
        let state = apply_card_effect(setup_test_game(3), &card("Whistleblower"), "p3", Some("p2"));
        assert!(state.player("p2").unwrap().discard_next);
        assert!(!state.player("p1").unwrap().discard_next);

        let reveals: Vec<_> = state.effects_started_this_round(EffectKind::RevealHand).collect();
        assert_eq!(reveals.len(), 1);
        assert_eq!(reveals[0].source_player_id, "p3");
        assert_eq!(reveals[0].target_player_id.as_deref(), Some("p2"));
    }

    #[test]
    fn test_boost_politicians_by_country() {
        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Angela Merkel"), 0);
        play(&mut state, "p2", card("Donald Trump"), 1);
        let state = apply_card_effect(state, &card("Ursula von der Leyen"), "p3", None);
        assert_eq!(modifier(&state, "p1"), 1);
        assert_eq!(modifier(&state, "p2"), 0);

        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Angela Merkel"), 0);
        play(&mut state, "p2", card("Donald Trump"), 1);
        let state = apply_card_effect(state, &card("Election Year"), "p3", None);
        assert_eq!(modifier(&state, "p1"), 1);
        assert_eq!(modifier(&state, "p2"), 1);
        assert_eq!(modifier(&state, "p3"), 0);
    }

    #[test]
    fn test_mandate_conditions() {
        let mut state = setup_test_game(3);
        state.player_mut("p2").unwrap().mandates = 3;
        let harris = apply_card_effect(state.clone(), &card("Kamala Harris"), "p1", None);
        assert_eq!(modifier(&harris, "p1"), 2);
        let harris = apply_card_effect(state.clone(), &card("Kamala Harris"), "p2", None);
        assert_eq!(modifier(&harris, "p2"), 0);

        let grassroots = apply_card_effect(state.clone(), &card("Grassroots Movement"), "p3", None);
        assert_eq!(modifier(&grassroots, "p3"), 3);
        let grassroots = apply_card_effect(state, &card("Grassroots Movement"), "p2", None);
        assert_eq!(modifier(&grassroots, "p2"), 0);
    }

    #[test]
    fn test_emergency_powers_doubles_politician() {
        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Vladimir Putin"), 0);
        let state = apply_card_effect(state, &card("Emergency Powers"), "p1", None);
        assert_eq!(state.player("p1").unwrap().round_influence(), 16);
    }

    #[test]
    fn test_economic_summit_rewards_single_leader() {
        let mut state = setup_test_game(3);
        play(&mut state, "p1", card("Vladimir Putin"), 0);
        play(&mut state, "p2", card("Olaf Scholz"), 1);
        let state = apply_card_effect(state, &card("Economic Summit"), "p3", None);
        assert_eq!(state.player("p1").unwrap().mandates, 1);

        let mut tied = setup_test_game(3);
        play(&mut tied, "p1", card("Olaf Scholz"), 0);
        play(&mut tied, "p2", card("Olaf Scholz"), 1);
        let tied = apply_card_effect(tied, &card("Economic Summit"), "p3", None);
        assert!(tied.players.iter().all(|p| p.mandates == 0));
    }

    #[test]
    fn test_xi_silences_opponents() {
        let state = apply_card_effect(setup_test_game(3), &card("Xi Jinping"), "p1", None);
        assert!(state.player("p1").unwrap().can_play_special);
        assert!(!state.player("p2").unwrap().can_play_special);
        assert!(!state.player("p3").unwrap().can_play_special);
    }

    #[test]
    fn test_asylum_protects_mandates() {
        let state = apply_card_effect(setup_test_game(3), &card("Political Asylum"), "p2", None);
        assert!(state.player("p2").unwrap().protected_mandates);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let mut state = setup_test_game(4);
        play(&mut state, "p1", card("Angela Merkel"), 0);
        play(&mut state, "p2", card("Lobbyismus"), 1);
        play(&mut state, "p3", card("Media Blackout"), 2);
        assert_eq!(process_effects(state.clone()), process_effects(state));
    }

    #[test]
    fn test_roll_dice_range() {
        let state = setup_test_game(3);
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [false; 7];
        for _ in 0..10_000 {
            let roll = roll_dice_with(&state, "p1", "card-1", &mut rng);
            assert!((1..=6).contains(&roll));
            seen[roll as usize] = true;
        }
        assert!(seen[1..].iter().all(|&s| s));
        for _ in 0..1_000 {
            assert!((1..=6).contains(&roll_dice(&state, "p1", "card-1")));
        }
    }
}
