//! Session boundary: cookie contract, store trait, in-memory store.
//!
//! The engine only fixes the contract: session identity travels in the
//! `PHPSESSID` cookie and state lives behind [`SessionStore`]. Handlers
//! decide when a session starts; [`Session::obtain`] and
//! [`Session::persist`] cover the usual load-mutate-save cycle including
//! the `Set-Cookie` on first use.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::http::request::RequestModel;
use crate::http::response::ResponseModel;

/// Cookie carrying the session identifier.
pub const SESSION_COOKIE_NAME: &str = "PHPSESSID";

/// Default session lifetime, matching PHP's `gc_maxlifetime`.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(1440);

/// Arbitrary JSON-shaped session state.
pub type SessionData = HashMap<String, serde_json::Value>;

/// Persistence backend for session state.
pub trait SessionStore: Send + Sync {
    /// Load a live session; expired or unknown ids return `None`.
    fn load(&self, session_id: &str) -> Option<SessionData>;

    /// Store state under `session_id`, resetting its lifetime to `ttl`.
    fn save(&self, session_id: &str, data: SessionData, ttl: Duration);

    fn remove(&self, session_id: &str);
}

struct StoredSession {
    data: SessionData,
    expires_at: DateTime<Utc>,
}

/// Process-local store; state is lost on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        match self.sessions.read() {
            Ok(sessions) => sessions.len(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired session, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let Ok(mut sessions) = self.sessions.write() else {
            return 0;
        };
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        before - sessions.len()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, session_id: &str) -> Option<SessionData> {
        let sessions = self.sessions.read().ok()?;
        let session = sessions.get(session_id)?;
        if session.expires_at <= Utc::now() {
            return None;
        }
        Some(session.data.clone())
    }

    fn save(&self, session_id: &str, data: SessionData, ttl: Duration) {
        let expires_at = Utc::now()
            + chrono::TimeDelta::from_std(ttl).unwrap_or_else(|_| chrono::TimeDelta::seconds(0));
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(session_id.to_string(), StoredSession { data, expires_at });
        }
    }

    fn remove(&self, session_id: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(session_id);
        }
    }
}

/// Fresh, unpredictable session identifier.
pub fn generate_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `Set-Cookie` value establishing the session cookie.
pub fn session_cookie(session_id: &str) -> String {
    format!("{SESSION_COOKIE_NAME}={session_id}; Path=/; HttpOnly")
}

/// One request's view of its session.
pub struct Session {
    pub id: String,
    pub data: SessionData,
    /// True when the id was generated for this request and the cookie
    /// still has to be sent.
    pub fresh: bool,
}

impl Session {
    /// Load the request's session or start a new one.
    pub fn obtain(store: &dyn SessionStore, request: &RequestModel) -> Session {
        if let Some(id) = request.session_id() {
            if let Some(data) = store.load(id) {
                return Session {
                    id: id.to_string(),
                    data,
                    fresh: false,
                };
            }
        }
        Session {
            id: generate_session_id(),
            data: SessionData::new(),
            fresh: true,
        }
    }

    /// Write the state back and emit the cookie for a fresh session.
    pub fn persist(self, store: &dyn SessionStore, response: &mut ResponseModel, ttl: Duration) {
        if self.fresh {
            response.add_cookie(session_cookie(&self.id));
        }
        store.save(&self.id, self.data, ttl);
    }
}
