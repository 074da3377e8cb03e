//! In-memory cookie sessions
//!
//! Process-local by design: the login/consent flows are stateless, only the
//! self-service dashboard needs to remember who signed in and the pending
//! OAuth state nonce.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::RwLock;
use rand::RngCore;
use std::collections::HashMap;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "sesame_session";

#[derive(Debug, Clone, Default)]
pub struct SessionData {
    /// Pending OAuth state nonce, set when self-service login starts
    pub oauth_state: String,

    /// Signed-in subject, set after a completed self-service login
    pub user: Option<String>,
}

#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<String, SessionData>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, id: &str) -> Option<SessionData> {
        self.inner.read().get(id).cloned()
    }

    /// Mutate the session behind `id`, creating one when the id is absent
    /// or unknown. Returns the id the caller should set as the cookie.
    pub fn update(&self, id: Option<&str>, f: impl FnOnce(&mut SessionData)) -> String {
        let mut inner = self.inner.write();
        let id = match id {
            Some(id) if inner.contains_key(id) => id.to_string(),
            _ => {
                let id = new_session_id();
                inner.insert(id.clone(), SessionData::default());
                id
            }
        };
        if let Some(data) = inner.get_mut(&id) {
            f(data);
        }
        id
    }

    pub fn remove(&self, id: &str) {
        self.inner.write().remove(id);
    }
}

fn new_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_creates_and_reuses_sessions() {
        let store = SessionStore::new();

        let id = store.update(None, |s| s.oauth_state = "abc".to_string());
        assert_eq!(store.load(&id).unwrap().oauth_state, "abc");

        let same = store.update(Some(&id), |s| s.user = Some("titi".to_string()));
        assert_eq!(same, id);
        let data = store.load(&id).unwrap();
        assert_eq!(data.oauth_state, "abc");
        assert_eq!(data.user.as_deref(), Some("titi"));
    }

    #[test]
    fn unknown_ids_get_a_fresh_session() {
        let store = SessionStore::new();
        let id = store.update(Some("stale"), |_| {});
        assert_ne!(id, "stale");
        assert!(store.load("stale").is_none());
    }

    #[test]
    fn remove_forgets_the_session() {
        let store = SessionStore::new();
        let id = store.update(None, |s| s.user = Some("titi".to_string()));
        store.remove(&id);
        assert!(store.load(&id).is_none());
    }
}
