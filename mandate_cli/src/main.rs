//! Simulator entry point: plays a game of Mandate between bots and prints the log.

use anyhow::{Context, Result, bail};
use clap::Parser;
use mandate_core::{
    Ability, Card, CardCatalog, CardId, CardType, MomentumDirection, PlayerId, RulesConfig, build_starter_deck,
};
use mandate_session::{Entrant, GameSession, SessionCommand, SessionEvent, SessionRegistry};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

/// Simulates a game of Mandate between bots
#[derive(Parser, Debug)]
#[command(name = "mandate")]
#[command(about = "Simulates a game of Mandate between bots", long_about = None)]
#[command(version)]
struct Cli {
    /// Number of bots at the table
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(2..=8))]
    players: u8,

    /// Seed for decks, draws and bot choices (random when omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Stop after this many rounds even without a winner
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Rules file (JSON); missing fields keep their defaults
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Card catalog (JSON) to use instead of the bundled one
    #[arg(long)]
    cards: Option<PathBuf>,

    /// Print the final game state as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let rules = match &cli.rules {
        Some(path) => RulesConfig::from_path(path)
            .with_context(|| format!("failed to load rules from {}", path.display()))?,
        None => RulesConfig::default(),
    };
    let catalog = match &cli.cards {
        Some(path) => CardCatalog::from_path(path)
            .with_context(|| format!("failed to load cards from {}", path.display()))?,
        None => CardCatalog::standard().context("bundled card catalog is broken")?,
    };

    let seed = cli.seed.unwrap_or_else(rand::random);
    let max_rounds = cli.rounds.unwrap_or(rules.max_rounds);
    info!(seed, players = cli.players, max_rounds, "starting simulation");

    let mut rng = StdRng::seed_from_u64(seed);
    let session = new_session(&catalog, &rules, cli.players, seed, &mut rng)?;

    let registry = SessionRegistry::new();
    let game_id = registry.insert(session);
    registry.with_session(&game_id, |session| play_game(session, max_rounds, &mut rng))??;
    registry.with_session(&game_id, |session| report(session, cli.json))??;
    registry.teardown(&game_id);
    Ok(())
}

/// Seats `players` bots, each with a freshly built starter deck.
fn new_session(
    catalog: &CardCatalog,
    rules: &RulesConfig,
    players: u8,
    seed: u64,
    rng: &mut StdRng,
) -> Result<GameSession> {
    let entrants = (1..=players)
        .map(|i| {
            let deck = build_starter_deck(catalog, rules, rng);
            Entrant::new(format!("bot-{}", i), format!("Bot {}", i), deck)
        })
        .collect();
    let session = GameSession::new(Uuid::new_v4(), entrants, rules.clone())
        .context("starter decks do not satisfy the rules, check the catalog and rules files")?;
    Ok(session.with_seed(seed))
}

/// Plays rounds until someone wins or `max_rounds` have been resolved.
fn play_game<R: Rng + ?Sized>(session: &mut GameSession, max_rounds: u32, rng: &mut R) -> Result<()> {
    let host = session.host_id().clone();
    expect_ok(session.handle(&host, SessionCommand::DealOpeningHands))?;

    loop {
        let seating: Vec<PlayerId> = session.state().players.iter().map(|p| p.user_id.clone()).collect();
        for player_id in &seating {
            for command in choose_plays(session, player_id, rng) {
                // a rejected bot move is not fatal, the bot just plays less this round
                for event in session.handle(player_id, command) {
                    if let SessionEvent::Error { message } = event {
                        warn!(player = %player_id, %message, "bot move rejected");
                    }
                }
            }
        }

        let resolved = expect_ok(session.handle(&host, SessionCommand::ResolveRound))?;
        for event in resolved {
            if let SessionEvent::CardsPeeked { player_id, card_ids } = event {
                // a game that just ended has already settled its peeks
                if session.peeked(&player_id).is_none() {
                    continue;
                }
                // keep the strongest peeked card, the rest go back as they were
                let Some(card_id) = strongest(session, &player_id, &card_ids) else {
                    continue;
                };
                let command = SessionCommand::ChoosePeekedCard { card_id, put_back: Vec::new() };
                expect_ok(session.handle(&player_id, command))?;
            }
        }
        if session.is_finished() || session.state().round >= max_rounds {
            break;
        }
        expect_ok(session.handle(&host, SessionCommand::AdvanceRound))?;
    }
    Ok(())
}

/// The bot plays its strongest politician and, half of the time, a random
/// event or special it is allowed to play.
fn choose_plays<R: Rng + ?Sized>(session: &GameSession, player_id: &str, rng: &mut R) -> Vec<SessionCommand> {
    let hand = session.hand_cards(player_id);
    let mut commands = Vec::new();

    if let Some(politician) = hand.iter().filter(|c| c.is_politician()).max_by_key(|c| c.influence) {
        commands.push(SessionCommand::PlayCard { card_id: politician.id.clone(), target: None, direction: None });
    }

    let can_play_special = session.state().player(player_id).is_some_and(|p| p.can_play_special);
    let extras: Vec<&Card> = hand
        .iter()
        .copied()
        .filter(|c| match c.card_type {
            CardType::Event => true,
            CardType::Special => can_play_special,
            _ => false,
        })
        .collect();
    if rng.random_bool(0.5) {
        if let Some(card) = extras.choose(rng) {
            let target = if card.abilities.iter().any(Ability::is_targeted) {
                leading_opponent(session, player_id)
            } else {
                None
            };
            let direction = card
                .abilities
                .iter()
                .any(|a| matches!(a, Ability::ChosenMomentumShift { .. }))
                .then(|| if rng.random_bool(0.5) { MomentumDirection::Up } else { MomentumDirection::Down });
            commands.push(SessionCommand::PlayCard { card_id: card.id.clone(), target, direction });
        }
    }
    commands
}

/// Bots aim targeted specials at whoever holds the most mandates.
fn leading_opponent(session: &GameSession, player_id: &str) -> Option<PlayerId> {
    session
        .state()
        .opponents(player_id)
        .max_by_key(|p| p.mandates)
        .map(|p| p.user_id.clone())
}

/// The peeked card with the most influence, politicians first.
fn strongest(session: &GameSession, player_id: &str, card_ids: &[CardId]) -> Option<CardId> {
    let deck = session.deck(player_id)?;
    card_ids
        .iter()
        .filter_map(|id| mandate_core::deck::get_card_by_id(deck, id))
        .max_by_key(|c| (c.is_politician(), c.influence))
        .map(|c| c.id.clone())
}

fn expect_ok(events: Vec<SessionEvent>) -> Result<Vec<SessionEvent>> {
    if let Some(SessionEvent::Error { message }) = events.iter().find(|e| matches!(e, SessionEvent::Error { .. })) {
        bail!("session rejected command: {}", message);
    }
    Ok(events)
}

fn report(session: &GameSession, json: bool) -> Result<()> {
    let state = session.state();
    for entry in &state.log {
        println!("{}", entry);
    }

    println!();
    let mut standings: Vec<_> = state.players.iter().collect();
    standings.sort_by(|a, b| b.mandates.cmp(&a.mandates));
    for player in standings {
        println!("{:<12} {:>3} mandates", player.name, player.mandates);
    }
    match session.winner().and_then(|id| state.player(id)) {
        Some(winner) => println!("Winner: {} after {} rounds", winner.name, state.round),
        None => println!("No winner after {} rounds", state.round),
    }

    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulate(seed: u64, players: u8) -> GameSession {
        let catalog = CardCatalog::standard().unwrap();
        let rules = RulesConfig::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut session = new_session(&catalog, &rules, players, seed, &mut rng).unwrap();
        play_game(&mut session, rules.max_rounds, &mut rng).unwrap();
        session
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from(["mandate", "--players", "4", "--seed", "7", "--json"]).unwrap();
        assert_eq!(cli.players, 4);
        assert_eq!(cli.seed, Some(7));
        assert!(cli.json);
        assert!(cli.rules.is_none());

        assert!(Cli::try_parse_from(["mandate", "--players", "1"]).is_err());
    }

    #[test]
    fn test_bots_keep_the_strongest_peeked_card() {
        let catalog = CardCatalog::standard().unwrap();
        let rules = RulesConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let session = new_session(&catalog, &rules, 3, 3, &mut rng).unwrap();
        let deck = session.deck("bot-1").unwrap();
        let politician = deck.cards.iter().filter(|c| c.is_politician()).max_by_key(|c| c.influence).unwrap();
        let event = deck.cards.iter().find(|c| c.card_type == CardType::Event).unwrap();
        let ids = vec![event.id.clone(), politician.id.clone()];
        assert_eq!(strongest(&session, "bot-1", &ids), Some(politician.id.clone()));
        assert_eq!(strongest(&session, "bot-1", &[]), None);
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let a = simulate(7, 3);
        let b = simulate(7, 3);
        assert_eq!(a.state(), b.state());
        assert!(a.state().log.len() > 3);
    }

    #[test]
    fn test_simulation_conserves_cards() {
        for seed in 0..5 {
            let session = simulate(seed, 3);
            assert!(session.is_finished() || session.state().round == 20);
            for player in &session.state().players {
                let held = session.hand(&player.user_id).unwrap().len()
                    + session.deck(&player.user_id).unwrap().total_cards()
                    + session.peeked(&player.user_id).map_or(0, <[CardId]>::len);
                assert_eq!(held, 20, "seed {} player {}", seed, player.user_id);
            }
        }
    }
}
