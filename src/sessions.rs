//! In-process sessions binding an opaque token to a verified login.
//!
//! The OAuth callback creates one entry per successful authentication; award
//! handlers resolve the token once and pass the login explicitly from there.
//! Tokens are random v4 UUIDs, expire after a fixed TTL, and are swept by a
//! background task in `main`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use uuid::Uuid;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "contribot_session";

struct SessionEntry {
    login: String,
    expires_at: Instant,
}

pub struct SessionStore {
    entries: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Binds `login` to a fresh opaque token and returns the token.
    pub fn create(&self, login: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let entry = SessionEntry {
            login: login.to_string(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().insert(token.clone(), entry);
        token
    }

    /// Returns the login bound to `token`, if the session exists and has not
    /// expired. Expired entries read as absent; the sweeper reclaims them.
    pub fn resolve(&self, token: &str) -> Option<String> {
        let entries = self.entries.read();
        let entry = entries.get(token)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.login.clone())
    }

    /// Drops expired entries; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve() {
        let sessions = SessionStore::new(Duration::from_secs(60));

        let token = sessions.create("alice");
        assert_eq!(sessions.resolve(&token), Some("alice".to_string()));

        // Distinct sessions for the same login coexist.
        let second = sessions.create("alice");
        assert_ne!(token, second);
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_resolve_unknown_token() {
        let sessions = SessionStore::new(Duration::from_secs(60));
        assert_eq!(sessions.resolve("not-a-token"), None);
    }

    #[test]
    fn test_expired_sessions_read_as_absent() {
        let sessions = SessionStore::new(Duration::ZERO);

        let token = sessions.create("alice");
        assert_eq!(sessions.resolve(&token), None);
    }

    #[test]
    fn test_sweep_reclaims_only_expired_entries() {
        let sessions = SessionStore::new(Duration::ZERO);
        sessions.create("alice");
        sessions.create("bob");

        let live = SessionStore::new(Duration::from_secs(60));
        live.create("carol");

        assert_eq!(sessions.sweep(), 2);
        assert!(sessions.is_empty());
        assert_eq!(live.sweep(), 0);
        assert_eq!(live.len(), 1);
    }
}
