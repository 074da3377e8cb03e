//! Configuration for Sesame
//!
//! Loaded once at startup from a TOML file and/or environment variables.
//! `AppConfig::validate` runs eagerly and is fatal on malformed values, so
//! request handlers never see a half-usable configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ldap: DirectoryConfig,

    #[serde(default)]
    pub hydra: HydraConfig,

    #[serde(default)]
    pub selfservice: OidcConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Environment variables override file values
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("SESAME_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Ok(port) = std::env::var("SESAME_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(endpoint) = std::env::var("SESAME_LDAP_ENDPOINT") {
            self.ldap.endpoint = endpoint;
        }
        if let Ok(dn) = std::env::var("SESAME_LDAP_BASE_DN") {
            self.ldap.base_dn = dn;
        }
        if let Ok(dn) = std::env::var("SESAME_LDAP_ROLE_BASE_DN") {
            self.ldap.role_base_dn = dn;
        }
        if let Ok(url) = std::env::var("SESAME_HYDRA_URL") {
            self.hydra.url = url;
        }
        if let Ok(secret) = std::env::var("SESAME_OIDC_SECRET") {
            self.selfservice.secret = secret;
        }
        if let Ok(level) = std::env::var("SESAME_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate every section, normalizing where the protocol requires it.
    ///
    /// Must run before any client is constructed.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.ldap.validate()?;
        self.hydra.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "localhost".to_string(),
            port: 8080,
        }
    }
}

/// LDAP directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory endpoint as host:port
    #[serde(default)]
    pub endpoint: String,

    /// Wrap the connection in TLS
    #[serde(default)]
    pub tls: bool,

    /// Skip TLS certificate verification. Deliberate trust decision for
    /// directories with private CAs, not a default.
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// Base DN for user searches
    #[serde(default)]
    pub base_dn: String,

    /// Base DN under which per-application role OUs live
    #[serde(default)]
    pub role_base_dn: String,

    /// Administrative bind DN (reserved for maintenance tooling)
    #[serde(default)]
    pub admin_dn: String,

    /// Administrative bind password
    #[serde(default)]
    pub admin_password: String,

    /// `directoryAttr:claimName` mapping entries
    #[serde(default = "default_attributes")]
    pub attributes: Vec<String>,

    /// Connection timeout in seconds
    #[serde(default = "default_ldap_timeout")]
    pub timeout_secs: u64,
}

fn default_attributes() -> Vec<String> {
    vec![
        "name:name".to_string(),
        "sn:family_name".to_string(),
        "givenName:given_name".to_string(),
        "mail:email".to_string(),
    ]
}

fn default_ldap_timeout() -> u64 {
    10
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            tls: false,
            skip_tls_verify: false,
            base_dn: String::new(),
            role_base_dn: String::new(),
            admin_dn: String::new(),
            admin_password: String::new(),
            attributes: default_attributes(),
            timeout_secs: default_ldap_timeout(),
        }
    }
}

impl DirectoryConfig {
    /// Parse the configured `directoryAttr:claimName` list.
    ///
    /// Later entries win on duplicate directory attributes.
    pub fn attribute_map(&self) -> Result<HashMap<String, String>, ConfigError> {
        let mut result = HashMap::with_capacity(self.attributes.len());
        for entry in &self.attributes {
            let (attr, claim) = split_mapping(entry)?;
            result.insert(attr.to_string(), claim.to_string());
        }
        Ok(result)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        if self.base_dn.is_empty() {
            return Err(ConfigError::EmptyBaseDn);
        }
        self.attribute_map()?;
        Ok(())
    }
}

/// Authorization server (challenge API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydraConfig {
    /// Admin API base URL; normalized to end in `/` by `validate`
    #[serde(default)]
    pub url: String,

    /// How long an accepted login/consent is remembered, in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// `claimName:scope` mapping entries
    #[serde(default = "default_claim_scopes")]
    pub claim_scopes: Vec<String>,

    /// Request timeout in seconds
    #[serde(default = "default_hydra_timeout")]
    pub timeout_secs: u64,
}

fn default_session_ttl() -> u64 {
    86400 // 24h
}

fn default_claim_scopes() -> Vec<String> {
    vec![
        "name:profile".to_string(),
        "family_name:profile".to_string(),
        "given_name:profile".to_string(),
        "email:email".to_string(),
        "roles:roles".to_string(),
    ]
}

fn default_hydra_timeout() -> u64 {
    10
}

impl Default for HydraConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            session_ttl_secs: default_session_ttl(),
            claim_scopes: default_claim_scopes(),
            timeout_secs: default_hydra_timeout(),
        }
    }
}

impl HydraConfig {
    /// Group claim names by the OIDC scope that authorizes disclosing them.
    ///
    /// Claim names may repeat across scopes.
    pub fn scope_claim_map(&self) -> Result<HashMap<String, Vec<String>>, ConfigError> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for entry in &self.claim_scopes {
            let (claim, scope) = split_mapping(entry)?;
            result
                .entry(scope.to_string())
                .or_default()
                .push(claim.to_string());
        }
        Ok(result)
    }

    /// Seconds the authorization server should remember an accepted request
    pub fn remember_for(&self) -> u64 {
        self.session_ttl_secs
    }

    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::EmptyHydraUrl);
        }
        // Relative challenge paths are resolved against the base URL, which
        // only works when it ends in a slash.
        if !self.url.ends_with('/') {
            self.url.push('/');
        }
        url::Url::parse(&self.url)?;
        self.scope_claim_map()?;
        Ok(())
    }
}

/// Relying-party OIDC configuration for self-service login
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OidcConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub secret: String,

    #[serde(default)]
    pub discovery_url: String,

    #[serde(default)]
    pub callback_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Split a `left:right` mapping entry, requiring exactly one separator.
fn split_mapping(entry: &str) -> Result<(&str, &str), ConfigError> {
    let mut parts = entry.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(left), Some(right), None) if !left.is_empty() && !right.is_empty() => {
            Ok((left, right))
        }
        _ => Err(ConfigError::MalformedMapping(entry.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_map_parses_default_entries() {
        let cfg = DirectoryConfig {
            attributes: vec!["name:name".to_string(), "sn:family_name".to_string()],
            ..Default::default()
        };

        let map = cfg.attribute_map().unwrap();
        let mut expected = HashMap::new();
        expected.insert("name".to_string(), "name".to_string());
        expected.insert("sn".to_string(), "family_name".to_string());
        assert_eq!(map, expected);
    }

    #[test]
    fn malformed_mapping_entries_are_rejected() {
        for entry in ["nameprofile", "a:b:c", ":scope", "claim:"] {
            let cfg = HydraConfig {
                claim_scopes: vec![entry.to_string()],
                ..Default::default()
            };
            assert!(
                cfg.scope_claim_map().is_err(),
                "entry `{entry}` should not parse"
            );
        }
    }

    #[test]
    fn scope_map_groups_claims_by_scope() {
        let cfg = HydraConfig::default();
        let map = cfg.scope_claim_map().unwrap();

        assert_eq!(
            map.get("profile"),
            Some(&vec![
                "name".to_string(),
                "family_name".to_string(),
                "given_name".to_string()
            ])
        );
        assert_eq!(map.get("email"), Some(&vec!["email".to_string()]));
    }

    #[test]
    fn directory_validation_requires_endpoint_and_base_dn() {
        let mut cfg = DirectoryConfig::default();
        assert!(cfg.validate().is_err());

        cfg.endpoint = "ldap.example.com:389".to_string();
        assert!(cfg.validate().is_err());

        cfg.base_dn = "ou=users,dc=example,dc=com".to_string();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn hydra_url_gains_trailing_slash() {
        let mut cfg = HydraConfig {
            url: "http://hydra:4445".to_string(),
            ..Default::default()
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.url, "http://hydra:4445/");

        // Already normalized URLs stay unchanged.
        cfg.validate().unwrap();
        assert_eq!(cfg.url, "http://hydra:4445/");
    }
}
