//! Identity types shared across the login and consent flows

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// OIDC claims harvested for one subject.
///
/// Built per request from directory attributes and role membership,
/// discarded after the response is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claim {
    /// Claim name to value, e.g. `given_name` -> `Jean`
    pub details: HashMap<String, String>,

    /// Application role names, in directory order
    pub roles: Vec<String>,
}

impl Claim {
    /// Build the `id_token` session object sent to the authorization server.
    ///
    /// The `roles` key is present iff the subject has at least one role.
    pub fn to_id_token(&self) -> Map<String, Value> {
        let mut result = Map::with_capacity(self.details.len() + 1);
        for (name, value) in &self.details {
            result.insert(name.clone(), Value::String(value.clone()));
        }
        if !self.roles.is_empty() {
            result.insert(
                "roles".to_string(),
                Value::Array(self.roles.iter().cloned().map(Value::String).collect()),
            );
        }
        result
    }
}

/// Relying party identity as reported by the authorization server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(rename = "client_id", default)]
    pub id: String,

    #[serde(rename = "client_name", default)]
    pub name: String,
}
