// ── Session registry ──
//
// One `Session` per configured unit, keyed by session name. The
// registry is the composition root's handle for starting and stopping
// every unit together; sessions themselves never know about it.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::info;

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::session::Session;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a session for `config`.
    ///
    /// Names are unique; registering an existing name fails and leaves
    /// the running session alone.
    pub async fn open(&self, config: SessionConfig) -> Result<Session, CoreError> {
        let name = config.name.clone();
        if self.sessions.contains_key(&name) {
            return Err(CoreError::Config {
                message: format!("session '{name}' is already registered"),
            });
        }
        let session = Session::new(config);
        if let Err(e) = self.insert(session.clone()) {
            session.shutdown().await;
            return Err(e);
        }
        Ok(session)
    }

    /// Register an already built session under its name.
    pub fn insert(&self, session: Session) -> Result<(), CoreError> {
        let name = session.name().to_owned();
        match self.sessions.entry(name.clone()) {
            Entry::Occupied(_) => Err(CoreError::Config {
                message: format!("session '{name}' is already registered"),
            }),
            Entry::Vacant(slot) => {
                slot.insert(session);
                info!(session = %name, "session registered");
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Session> {
        self.sessions.get(name).map(|entry| entry.value().clone())
    }

    /// Unregister and shut down a session.
    pub async fn remove(&self, name: &str) -> bool {
        let Some((_, session)) = self.sessions.remove(name) else {
            return false;
        };
        session.shutdown().await;
        info!(session = %name, "session removed");
        true
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Shut every session down and empty the registry.
    pub async fn shutdown_all(&self) {
        let sessions: Vec<Session> = self.sessions.iter().map(|entry| entry.value().clone()).collect();
        self.sessions.clear();
        for session in sessions {
            session.shutdown().await;
        }
    }
}
