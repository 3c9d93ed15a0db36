//! Session registry: binds live connections to player identities
//!
//! A session exists only between a successful `Register` and the connection
//! going away. It carries the player-visible name and the cooldown expiry;
//! it is owned exclusively by this registry and handed out by reference.

use log::info;
use std::collections::HashMap;
use std::time::Instant;

use crate::engine::EditError;

/// Server-side record for one registered player.
#[derive(Debug, Clone)]
pub struct Session {
    /// Connection id this session is bound to
    pub id: u32,
    /// Display name chosen at registration (not required to be unique)
    pub name: String,
    /// When the current cooldown elapses; `None` means the player may edit
    /// immediately (never edited, or the cooldown has been cleared).
    pub cooldown_until: Option<Instant>,
}

impl Session {
    pub fn new(id: u32, name: String) -> Self {
        Self {
            id,
            name,
            cooldown_until: None,
        }
    }
}

/// All currently registered sessions, keyed by connection id.
pub struct SessionRegistry {
    sessions: HashMap<u32, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Creates the session for a connection, replacing any prior one.
    ///
    /// The display name is trimmed before validation and storage; a name
    /// that is empty after trimming is rejected with `InvalidInput`.
    /// Re-registering always yields a fresh session with no cooldown.
    pub fn register(&mut self, connection_id: u32, name: &str) -> Result<&Session, EditError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditError::InvalidInput);
        }

        info!("Player registered: {} (connection {})", name, connection_id);
        self.sessions
            .insert(connection_id, Session::new(connection_id, name.to_string()));
        Ok(&self.sessions[&connection_id])
    }

    pub fn lookup(&self, connection_id: u32) -> Option<&Session> {
        self.sessions.get(&connection_id)
    }

    pub fn lookup_mut(&mut self, connection_id: u32) -> Option<&mut Session> {
        self.sessions.get_mut(&connection_id)
    }

    /// Removes the session for a departed connection. Returns true if one
    /// existed; removing an unregistered connection is a no-op.
    pub fn remove(&mut self, connection_id: u32) -> bool {
        if let Some(session) = self.sessions.remove(&connection_id) {
            info!(
                "Player removed: {} (connection {})",
                session.name, connection_id
            );
            true
        } else {
            false
        }
    }

    /// Presence count: registered, not-yet-disconnected sessions.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
