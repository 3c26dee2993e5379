use crate::error::SessionError;
use crate::session::{Entrant, GameId, GameSession};
use dashmap::DashMap;
use mandate_core::RulesConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub type SharedSession = Arc<Mutex<GameSession>>;

/// Every running game, keyed by id.
///
/// Lookups go through the map, the game itself sits behind its own lock, so
/// games never wait on each other.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<GameId, SharedSession>,
}

impl SessionRegistry {
    pub fn new() -> SessionRegistry {
        SessionRegistry::default()
    }

    /// Starts a new game and returns its id.
    pub fn create(&self, entrants: Vec<Entrant>, rules: RulesConfig) -> Result<GameId, SessionError> {
        let session = GameSession::new(Uuid::new_v4(), entrants, rules)?;
        Ok(self.insert(session))
    }

    /// Registers an already built session, e.g. a seeded one.
    pub fn insert(&self, session: GameSession) -> GameId {
        let id = session.id();
        self.sessions.insert(id, Arc::new(Mutex::new(session)));
        info!(game = %id, active = self.sessions.len(), "game registered");
        id
    }

    pub fn get(&self, id: &GameId) -> Option<SharedSession> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Runs `f` with the game locked.
    pub fn with_session<T>(&self, id: &GameId, f: impl FnOnce(&mut GameSession) -> T) -> Result<T, SessionError> {
        // clone the Arc first so the map shard is not held while the game is locked
        let session = self.get(id).ok_or(SessionError::GameNotFound(*id))?;
        let mut guard = session.lock();
        Ok(f(&mut guard))
    }

    /// Removes the game. Handles still held elsewhere keep working on their copy of the Arc.
    pub fn teardown(&self, id: &GameId) -> Option<SharedSession> {
        let removed = self.sessions.remove(id).map(|(_, session)| session);
        if removed.is_some() {
            info!(game = %id, active = self.sessions.len(), "game torn down");
        }
        removed
    }

    pub fn ids(&self) -> Vec<GameId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
