//! In-process session store
//!
//! Opaque uuid tokens mapped to usernames with an expiry. Sessions live in
//! process memory: a restart logs everyone out, which is acceptable for this
//! deployment and keeps tokens out of the database.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Session {
    pub username: String,
    pub expires_at: Instant,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Issue a fresh token for the given user. Abandoned expired sessions
    /// are swept here, so the map never outgrows the live session count for
    /// long.
    pub fn issue(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let now = Instant::now();
        let session = Session {
            username: username.to_string(),
            expires_at: now + self.ttl,
        };
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|_, s| s.expires_at > now);
            sessions.insert(token.clone(), session);
        }
        token
    }

    /// Resolve a token to its session, dropping it if expired.
    pub fn resolve(&self, token: &str) -> Option<Session> {
        let expired = {
            let sessions = self.sessions.read().ok()?;
            match sessions.get(token) {
                Some(session) if session.expires_at > Instant::now() => {
                    return Some(session.clone());
                },
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            if let Ok(mut sessions) = self.sessions.write() {
                sessions.remove(token);
            }
        }
        None
    }

    /// Revoke a token. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        match self.sessions.write() {
            Ok(mut sessions) => sessions.remove(token).is_some(),
            Err(_) => false,
        }
    }
}
