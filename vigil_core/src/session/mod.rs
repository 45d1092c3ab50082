//! Pending sessions and the storage collaborators.
//!
//! A pending session is the durable record of an unacknowledged knock. The
//! door rule lives here: a character can only have ONE waiting session at a
//! time. They don't knock twice. They wait until you open the door.
//!
//! Stores are capability traits so the engine can run against any backend;
//! the in-memory implementations are the reference (and the test double).
//! Whatever the backend, `create_waiting` must enforce the one-waiting-
//! per-character rule atomically, or two near-simultaneous runs could both
//! knock.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use story_rules::{CharacterId, Dimension, EmotionalState, WoundArchetype};

use crate::error::StoreError;

/// Unique identifier for pending sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a pending session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Knock sent, door not yet opened.
    Waiting,
    /// A human opened the session; the record no longer gates new knocks.
    Opened,
}

/// A durable record of a knock waiting to be answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSession {
    pub id: SessionId,
    pub character_id: CharacterId,
    pub character_name: String,
    pub archetype: WoundArchetype,
    pub knock_message: String,
    pub wound: String,
    /// Full emotional vector at the moment of the knock.
    pub state_snapshot: EmotionalState,
    pub trigger_dimension: Dimension,
    pub trigger_value: u8,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

/// A character's stored emotional profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalProfile {
    pub character_id: CharacterId,
    pub state: EmotionalState,
    /// When the character's last session closed; gates the cooldown window.
    pub last_session_at: Option<DateTime<Utc>>,
    /// Most recent echo of the founding pain, if a scene rhymed with it.
    pub last_wound_echo: Option<String>,
    pub sessions_completed: u32,
}

impl EmotionalProfile {
    /// Create a fresh profile with every dimension at baseline.
    pub fn baseline(character_id: CharacterId) -> Self {
        Self {
            character_id,
            state: EmotionalState::baseline(),
            last_session_at: None,
            last_wound_echo: None,
            sessions_completed: 0,
        }
    }
}

/// Storage for pending sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The character's waiting session, if any.
    async fn find_waiting(&self, id: CharacterId)
        -> Result<Option<PendingSession>, StoreError>;

    /// Persist a new waiting session.
    ///
    /// Must fail with [`StoreError::AlreadyWaiting`] if the character already
    /// has one, atomically with respect to concurrent callers.
    async fn create_waiting(&self, session: PendingSession) -> Result<SessionId, StoreError>;

    /// Transition the character's waiting session to opened.
    async fn mark_opened(&self, id: CharacterId) -> Result<PendingSession, StoreError>;

    /// All waiting sessions, oldest knock first.
    async fn waiting_sessions(&self) -> Result<Vec<PendingSession>, StoreError>;
}

/// Storage for emotional profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: CharacterId) -> Result<Option<EmotionalProfile>, StoreError>;

    /// Fetch the profile, creating a baseline one on first reference.
    async fn get_or_create(&self, id: CharacterId) -> Result<EmotionalProfile, StoreError>;

    async fn save_state(&self, id: CharacterId, state: EmotionalState)
        -> Result<(), StoreError>;

    /// Stamp the cooldown marker and bump the session counter.
    async fn record_session(&self, id: CharacterId, at: DateTime<Utc>)
        -> Result<(), StoreError>;

    /// Remember the most recent wound echo for knock context.
    async fn record_wound_echo(&self, id: CharacterId, echo: String)
        -> Result<(), StoreError>;

    /// Every stored profile.
    async fn all_profiles(&self) -> Result<Vec<EmotionalProfile>, StoreError>;
}

/// In-memory session store. The waiting-uniqueness check and the insert
/// happen under one lock, which is what makes double-runs idempotent.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<Vec<PendingSession>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find_waiting(
        &self,
        id: CharacterId,
    ) -> Result<Option<PendingSession>, StoreError> {
        let sessions = self.sessions.lock().expect("session store lock poisoned");
        Ok(sessions
            .iter()
            .find(|s| s.character_id == id && s.status == SessionStatus::Waiting)
            .cloned())
    }

    async fn create_waiting(&self, session: PendingSession) -> Result<SessionId, StoreError> {
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        let occupied = sessions
            .iter()
            .any(|s| s.character_id == session.character_id && s.status == SessionStatus::Waiting);
        if occupied {
            return Err(StoreError::AlreadyWaiting(session.character_id));
        }
        let id = session.id;
        sessions.push(session);
        Ok(id)
    }

    async fn mark_opened(&self, id: CharacterId) -> Result<PendingSession, StoreError> {
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        let session = sessions
            .iter_mut()
            .find(|s| s.character_id == id && s.status == SessionStatus::Waiting)
            .ok_or(StoreError::NoWaitingSession(id))?;
        session.status = SessionStatus::Opened;
        Ok(session.clone())
    }

    async fn waiting_sessions(&self) -> Result<Vec<PendingSession>, StoreError> {
        let sessions = self.sessions.lock().expect("session store lock poisoned");
        let mut waiting: Vec<_> = sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Waiting)
            .cloned()
            .collect();
        waiting.sort_by_key(|s| s.created_at);
        Ok(waiting)
    }
}

/// In-memory profile store.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<CharacterId, EmotionalProfile>>,
}

impl MemoryProfileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, id: CharacterId) -> Result<Option<EmotionalProfile>, StoreError> {
        let profiles = self.profiles.lock().expect("profile store lock poisoned");
        Ok(profiles.get(&id).cloned())
    }

    async fn get_or_create(&self, id: CharacterId) -> Result<EmotionalProfile, StoreError> {
        let mut profiles = self.profiles.lock().expect("profile store lock poisoned");
        Ok(profiles
            .entry(id)
            .or_insert_with(|| EmotionalProfile::baseline(id))
            .clone())
    }

    async fn save_state(
        &self,
        id: CharacterId,
        state: EmotionalState,
    ) -> Result<(), StoreError> {
        let mut profiles = self.profiles.lock().expect("profile store lock poisoned");
        profiles
            .entry(id)
            .or_insert_with(|| EmotionalProfile::baseline(id))
            .state = state;
        Ok(())
    }

    async fn record_session(
        &self,
        id: CharacterId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut profiles = self.profiles.lock().expect("profile store lock poisoned");
        let profile = profiles
            .entry(id)
            .or_insert_with(|| EmotionalProfile::baseline(id));
        profile.last_session_at = Some(at);
        profile.sessions_completed += 1;
        Ok(())
    }

    async fn record_wound_echo(&self, id: CharacterId, echo: String) -> Result<(), StoreError> {
        let mut profiles = self.profiles.lock().expect("profile store lock poisoned");
        profiles
            .entry(id)
            .or_insert_with(|| EmotionalProfile::baseline(id))
            .last_wound_echo = Some(echo);
        Ok(())
    }

    async fn all_profiles(&self) -> Result<Vec<EmotionalProfile>, StoreError> {
        let profiles = self.profiles.lock().expect("profile store lock poisoned");
        Ok(profiles.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use story_rules::Dimension;

    fn waiting_session(id: CharacterId) -> PendingSession {
        PendingSession {
            id: SessionId::new(),
            character_id: id,
            character_name: "Test".to_string(),
            archetype: WoundArchetype::Special,
            knock_message: "Something happened.".to_string(),
            wound: "A wound.".to_string(),
            state_snapshot: EmotionalState::baseline(),
            trigger_dimension: Dimension::Fear,
            trigger_value: 8,
            status: SessionStatus::Waiting,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_then_find_waiting() {
        let store = MemorySessionStore::new();
        let id = CharacterId::new();

        store.create_waiting(waiting_session(id)).await.unwrap();

        let found = store.find_waiting(id).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().character_id, id);
    }

    #[tokio::test]
    async fn test_door_rule_rejects_second_waiting() {
        let store = MemorySessionStore::new();
        let id = CharacterId::new();

        store.create_waiting(waiting_session(id)).await.unwrap();
        let err = store.create_waiting(waiting_session(id)).await.unwrap_err();

        assert!(matches!(err, StoreError::AlreadyWaiting(c) if c == id));
    }

    #[tokio::test]
    async fn test_mark_opened_clears_the_door() {
        let store = MemorySessionStore::new();
        let id = CharacterId::new();

        store.create_waiting(waiting_session(id)).await.unwrap();
        let opened = store.mark_opened(id).await.unwrap();
        assert_eq!(opened.status, SessionStatus::Opened);

        assert!(store.find_waiting(id).await.unwrap().is_none());
        // A new knock can now be recorded.
        store.create_waiting(waiting_session(id)).await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_opened_without_waiting_fails() {
        let store = MemorySessionStore::new();
        let err = store.mark_opened(CharacterId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NoWaitingSession(_)));
    }

    #[tokio::test]
    async fn test_waiting_sessions_oldest_first() {
        let store = MemorySessionStore::new();
        let first = CharacterId::new();
        let second = CharacterId::new();

        let mut older = waiting_session(first);
        older.created_at = Utc::now() - chrono::Duration::hours(2);
        let newer = waiting_session(second);

        store.create_waiting(newer).await.unwrap();
        store.create_waiting(older).await.unwrap();

        let waiting = store.waiting_sessions().await.unwrap();
        assert_eq!(waiting.len(), 2);
        assert_eq!(waiting[0].character_id, first);
    }

    #[tokio::test]
    async fn test_profile_get_or_create_baselines() {
        let store = MemoryProfileStore::new();
        let id = CharacterId::new();

        assert!(store.get(id).await.unwrap().is_none());

        let profile = store.get_or_create(id).await.unwrap();
        assert_eq!(profile.state.get(Dimension::Hope), 5);
        assert!(profile.last_session_at.is_none());
        assert_eq!(profile.sessions_completed, 0);
    }

    #[tokio::test]
    async fn test_record_session_stamps_cooldown() {
        let store = MemoryProfileStore::new();
        let id = CharacterId::new();
        let at = Utc::now();

        store.record_session(id, at).await.unwrap();

        let profile = store.get(id).await.unwrap().unwrap();
        assert_eq!(profile.last_session_at, Some(at));
        assert_eq!(profile.sessions_completed, 1);
    }

    #[tokio::test]
    async fn test_save_state_persists() {
        let store = MemoryProfileStore::new();
        let id = CharacterId::new();

        let state = EmotionalState::baseline().with(Dimension::Shame, 9);
        store.save_state(id, state.clone()).await.unwrap();

        let profile = store.get(id).await.unwrap().unwrap();
        assert_eq!(profile.state, state);
    }
}
