//! In-memory session table.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::state::SessionState;

/// Sessions untouched for this long are dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

/// Most sessions kept at once.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug, Clone)]
struct Entry {
    state: SessionState,
    last_seen: Instant,
}

/// Session states keyed by session id. Lost on restart.
///
/// A session that is still in its default state is never stored, so clients
/// that send no `X-Session-Id` do not grow the table. Idle sessions are pruned
/// whenever a new one is added, and the least recently seen session makes
/// room once `max_sessions` is reached.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Current state of a session; unknown or expired ids start from the
    /// default state.
    pub fn get(&self, id: Uuid) -> SessionState {
        let now = Instant::now();
        self.sessions
            .read()
            .get(&id)
            .filter(|entry| !self.is_idle(entry, now))
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    /// Apply a transition to one session and return the new state.
    pub fn update(
        &self,
        id: Uuid,
        transition: impl FnOnce(SessionState) -> SessionState,
    ) -> SessionState {
        let mut sessions = self.sessions.write();
        let next = transition(self.current(&sessions, id));
        self.commit(&mut sessions, id, next.clone());
        next
    }

    /// Fallible variant of [`SessionStore::update`]; a failed transition
    /// leaves the session unchanged.
    pub fn try_update<E>(
        &self,
        id: Uuid,
        transition: impl FnOnce(SessionState) -> Result<SessionState, E>,
    ) -> Result<SessionState, E> {
        let mut sessions = self.sessions.write();
        let next = transition(self.current(&sessions, id))?;
        self.commit(&mut sessions, id, next.clone());
        Ok(next)
    }

    /// Clear the playback selection of every session playing `song_id`.
    pub fn forget_song(&self, song_id: i64) -> usize {
        let mut sessions = self.sessions.write();
        let mut cleared = 0;
        for entry in sessions.values_mut() {
            if entry.state.playing_song == Some(song_id) {
                entry.state = std::mem::take(&mut entry.state).forget_song(song_id);
                cleared += 1;
            }
        }
        cleared
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    fn is_idle(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_seen) >= self.idle_timeout
    }

    fn current(&self, sessions: &HashMap<Uuid, Entry>, id: Uuid) -> SessionState {
        let now = Instant::now();
        sessions
            .get(&id)
            .filter(|entry| !self.is_idle(entry, now))
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    fn commit(&self, sessions: &mut HashMap<Uuid, Entry>, id: Uuid, state: SessionState) {
        let now = Instant::now();

        if let Some(entry) = sessions.get_mut(&id) {
            entry.state = state;
            entry.last_seen = now;
            return;
        }
        if state == SessionState::default() {
            return;
        }

        self.make_room(sessions, now);
        sessions.insert(
            id,
            Entry {
                state,
                last_seen: now,
            },
        );
    }

    fn make_room(&self, sessions: &mut HashMap<Uuid, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_idle(entry, now));

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        let dropped = before - sessions.len();
        if dropped > 0 {
            tracing::debug!(dropped, remaining = sessions.len(), "Pruned sessions");
        }
    }
}
