//! Directory connection capability
//!
//! The [`DirectoryConn`] trait is the seam between authorization logic and
//! the wire protocol: production code uses the ldap3-backed
//! [`LdapConnection`], tests substitute an in-memory fake.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use sesame_core::config::DirectoryConfig;

use crate::error::DirectoryError;

// LDAP result codes the client gives dedicated meaning to
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_CREDENTIALS: u32 = 49;

/// One directory entry: distinguished name plus the first value of each
/// returned attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserEntry {
    pub dn: String,
    pub attrs: HashMap<String, String>,
}

impl UserEntry {
    fn from_search_entry(entry: SearchEntry) -> Self {
        let attrs = entry
            .attrs
            .into_iter()
            .filter_map(|(name, mut values)| {
                if values.is_empty() {
                    None
                } else {
                    Some((name, values.remove(0)))
                }
            })
            .collect();
        Self {
            dn: entry.dn,
            attrs,
        }
    }
}

/// Minimal search/bind capability over one directory connection
#[async_trait]
pub trait DirectoryConn: Send {
    /// Whole-subtree search under `base_dn`
    async fn search_base(
        &mut self,
        base_dn: &str,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<UserEntry>, DirectoryError>;

    /// Simple bind as `dn`
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    /// Release the connection. Idempotent; never fails.
    async fn close(&mut self);
}

/// ldap3-backed connection
pub struct LdapConnection {
    ldap: Ldap,
}

impl LdapConnection {
    /// Dial the configured endpoint, optionally wrapping the socket in TLS.
    pub async fn connect(cfg: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let scheme = if cfg.tls { "ldaps" } else { "ldap" };
        let url = format!("{scheme}://{}", cfg.endpoint);

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(cfg.timeout_secs))
            .set_no_tls_verify(cfg.skip_tls_verify);

        debug!(endpoint = %cfg.endpoint, tls = cfg.tls, "connecting to directory");

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| DirectoryError::Connection(e.to_string()))?;
        ldap3::drive!(conn);

        Ok(Self { ldap })
    }
}

#[async_trait]
impl DirectoryConn for LdapConnection {
    async fn search_base(
        &mut self,
        base_dn: &str,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<UserEntry>, DirectoryError> {
        let attrs: Vec<&str> = attrs.iter().map(String::as_str).collect();

        let result = self
            .ldap
            .search(base_dn, Scope::Subtree, filter, attrs)
            .await
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        let (entries, _res) = result.success().map_err(|e| match &e {
            LdapError::LdapResult { result } if result.rc == RC_NO_SUCH_OBJECT => {
                DirectoryError::Search(format!(
                    "search failed (probably due to bad base DN `{base_dn}`): {e}"
                ))
            }
            _ => DirectoryError::Search(e.to_string()),
        })?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(UserEntry::from_search_entry)
            .collect())
    }

    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let result = self
            .ldap
            .simple_bind(dn, password)
            .await
            .map_err(|e| DirectoryError::Connection(e.to_string()))?;

        match result.rc {
            0 => Ok(()),
            RC_INVALID_CREDENTIALS => Err(DirectoryError::InvalidCredentials),
            rc => Err(DirectoryError::Bind(format!(
                "bind as `{dn}` failed with result code {rc}"
            ))),
        }
    }

    async fn close(&mut self) {
        let _ = self.ldap.unbind().await;
    }
}
