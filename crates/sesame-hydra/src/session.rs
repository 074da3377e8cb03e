//! Consent session model and deduplication

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use sesame_core::types::ClientInfo;

/// One consent grant as recorded by the authorization server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSession {
    #[serde(default)]
    pub grant_scope: Vec<String>,

    #[serde(default)]
    pub handled_at: DateTime<Utc>,

    #[serde(default)]
    pub consent_request: ConsentRequestInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRequestInfo {
    #[serde(default)]
    pub client: ClientInfo,
}

/// Keep only the most recently handled session per relying party.
///
/// Strict comparison, so exact timestamp ties keep the first session
/// encountered. Output order is unspecified.
pub fn dedup_sessions(sessions: Vec<ConsentSession>) -> Vec<ConsentSession> {
    let mut by_client: HashMap<String, ConsentSession> = HashMap::with_capacity(sessions.len());
    for session in sessions {
        match by_client.entry(session.consent_request.client.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(session);
            }
            Entry::Occupied(mut slot) => {
                if session.handled_at > slot.get().handled_at {
                    slot.insert(session);
                }
            }
        }
    }
    by_client.into_values().collect()
}
