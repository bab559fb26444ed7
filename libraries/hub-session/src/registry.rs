//! Session registry
//!
//! The set of live sessions, shared between client command handlers and the
//! arbitration engine. All access goes through one async mutex, so
//! enumeration always sees a consistent snapshot.

use crate::error::{Result, SessionError};
use crate::session::{Session, SessionSummary};
use hub_core::{AudioStreamRole, Lifetime, MediaEngine, SessionKey};
use hub_playback::TrackList;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

/// Shared handle to the registry
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

/// Registry contents, accessible while the lock is held
#[derive(Debug, Default)]
pub struct RegistryState {
    sessions: BTreeMap<SessionKey, Session>,
    current_player: Option<SessionKey>,
    next_key: u32,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.lock().await
    }

    /// Create a session and return its key
    pub async fn create(
        &self,
        role: AudioStreamRole,
        lifetime: Lifetime,
        track_list: TrackList,
        engine: Arc<dyn MediaEngine>,
    ) -> SessionKey {
        let mut state = self.lock().await;
        let key = state.allocate_key();
        state
            .sessions
            .insert(key, Session::new(key, role, lifetime, track_list, engine));
        info!(session = %key, ?role, ?lifetime, "Session created");
        key
    }

    /// Run `f` against one session
    ///
    /// # Errors
    /// `SessionNotFound` if `key` is unknown
    pub async fn with_session<R>(
        &self,
        key: SessionKey,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R> {
        let mut state = self.lock().await;
        let session = state.get_mut(key)?;
        Ok(f(session))
    }

    pub async fn summaries(&self) -> Vec<SessionSummary> {
        self.lock().await.sessions().map(Session::summary).collect()
    }

    pub async fn current_player(&self) -> Option<SessionKey> {
        self.lock().await.current_player()
    }

    pub async fn len(&self) -> usize {
        self.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lock().await.is_empty()
    }

    pub async fn contains(&self, key: SessionKey) -> bool {
        self.lock().await.contains(key)
    }
}

impl RegistryState {
    fn allocate_key(&mut self) -> SessionKey {
        while self.sessions.contains_key(&SessionKey::new(self.next_key)) {
            self.next_key = self.next_key.wrapping_add(1);
        }
        let key = SessionKey::new(self.next_key);
        self.next_key = self.next_key.wrapping_add(1);
        key
    }

    /// # Errors
    /// `SessionNotFound` if `key` is unknown
    pub fn get(&self, key: SessionKey) -> Result<&Session> {
        self.sessions
            .get(&key)
            .ok_or(SessionError::SessionNotFound(key))
    }

    /// # Errors
    /// `SessionNotFound` if `key` is unknown
    pub fn get_mut(&mut self, key: SessionKey) -> Result<&mut Session> {
        self.sessions
            .get_mut(&key)
            .ok_or(SessionError::SessionNotFound(key))
    }

    pub fn contains(&self, key: SessionKey) -> bool {
        self.sessions.contains_key(&key)
    }

    /// Remove a session, clearing the current-player slot if it held it
    pub fn remove(&mut self, key: SessionKey) -> Option<Session> {
        let session = self.sessions.remove(&key)?;
        if self.current_player == Some(key) {
            self.current_player = None;
        }
        Some(session)
    }

    /// Sessions in key order
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn sessions_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    pub fn current_player(&self) -> Option<SessionKey> {
        self.current_player
    }

    pub fn set_current_player(&mut self, key: SessionKey) {
        self.current_player = Some(key);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
