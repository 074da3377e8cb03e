//! Directory authorization client
//!
//! Composes user lookup, credential bind, and role verification into the
//! two operations the login/consent flows need.

use std::collections::HashMap;
use tracing::debug;

use sesame_core::config::DirectoryConfig;
use sesame_core::error::ConfigError;
use sesame_core::types::Claim;

use crate::conn::{DirectoryConn, LdapConnection, UserEntry};
use crate::error::DirectoryError;

/// Build the user search filter.
///
/// The filter text is contractual: existing directory schemas depend on it
/// bit-for-bit. The username comes from our own login form and is
/// interpolated without escaping, matching that contract.
fn user_filter(username: &str) -> String {
    format!(
        "(&(|(objectClass=organizationalPerson)(objectClass=inetOrgPerson))\
         (|(uid={u})(mail={u})(userPrincipalName={u})(sAMAccountName={u})))",
        u = username
    )
}

/// Role membership filter, matched under `ou=<appId>,<roleBaseDN>`
fn role_filter(user_dn: &str) -> String {
    format!("(member={user_dn})")
}

/// Authorization client over the configured directory.
///
/// Constructed once at startup; the attribute mapping is parsed eagerly so
/// request handlers never observe a malformed configuration.
pub struct AuthClient {
    cfg: DirectoryConfig,
    attrs: HashMap<String, String>,
}

impl AuthClient {
    pub fn new(cfg: DirectoryConfig) -> Result<Self, ConfigError> {
        let attrs = cfg.attribute_map()?;
        Ok(Self { cfg, attrs })
    }

    /// May `username` with `password` use the application `app_id`?
    ///
    /// Opens one connection and releases it on every exit path. No retries:
    /// any failure at any stage is fatal to this call.
    pub async fn is_authorized(
        &self,
        username: &str,
        password: &str,
        app_id: &str,
    ) -> Result<(), DirectoryError> {
        let mut conn = LdapConnection::connect(&self.cfg).await?;
        let result = self.authorize(&mut conn, username, password, app_id).await;
        conn.close().await;
        result
    }

    /// Harvest the configured directory attributes and application roles of
    /// `subject` as OIDC claims.
    pub async fn find_oidc_claims(
        &self,
        subject: &str,
        app_id: &str,
    ) -> Result<Claim, DirectoryError> {
        let mut conn = LdapConnection::connect(&self.cfg).await?;
        let result = self.claims(&mut conn, subject, app_id).await;
        conn.close().await;
        result
    }

    pub(crate) async fn authorize(
        &self,
        conn: &mut dyn DirectoryConn,
        username: &str,
        password: &str,
        app_id: &str,
    ) -> Result<(), DirectoryError> {
        let user = self.find_user(conn, username, &[]).await?;
        debug!(dn = %user.dn, "binding as user");
        conn.simple_bind(&user.dn, password).await?;
        self.find_roles(conn, &user.dn, app_id).await?;
        Ok(())
    }

    pub(crate) async fn claims(
        &self,
        conn: &mut dyn DirectoryConn,
        subject: &str,
        app_id: &str,
    ) -> Result<Claim, DirectoryError> {
        let wanted: Vec<String> = self.attrs.keys().cloned().collect();
        let user = self.find_user(conn, subject, &wanted).await?;

        // Attributes absent from the entry are silently omitted.
        let mut details = HashMap::with_capacity(self.attrs.len());
        for (dir_attr, claim_name) in &self.attrs {
            if let Some(value) = user.attrs.get(dir_attr) {
                details.insert(claim_name.clone(), value.clone());
            }
        }

        let roles = self.find_roles(conn, &user.dn, app_id).await?;
        Ok(Claim { details, roles })
    }

    /// Locate the user entry; anything but exactly one match is a failure.
    async fn find_user(
        &self,
        conn: &mut dyn DirectoryConn,
        username: &str,
        extra_attrs: &[String],
    ) -> Result<UserEntry, DirectoryError> {
        let filter = user_filter(username);
        let mut attrs = vec!["dn".to_string()];
        attrs.extend_from_slice(extra_attrs);

        let mut entries = conn.search_base(&self.cfg.base_dn, &filter, &attrs).await?;
        if entries.len() != 1 {
            debug!(count = entries.len(), "user search did not match exactly one entry");
            return Err(DirectoryError::UserNotFound);
        }
        Ok(entries.remove(0))
    }

    /// Role names of `user_dn` for the application, from the `cn` of each
    /// matching entry. Zero matches means the user may not use this app.
    async fn find_roles(
        &self,
        conn: &mut dyn DirectoryConn,
        user_dn: &str,
        app_id: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        let base = format!("ou={app_id},{}", self.cfg.role_base_dn);
        let attrs = vec!["cn".to_string()];

        let entries = conn.search_base(&base, &role_filter(user_dn), &attrs).await?;
        if entries.is_empty() {
            return Err(DirectoryError::Unauthorized);
        }

        Ok(entries
            .into_iter()
            .filter_map(|e| e.attrs.get("cn").cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    const USERNAME: &str = "titi";
    const USER_DN: &str = "uid=titi,ou=users,dc=example,dc=com";
    const PASSWORD: &str = "secret";

    /// Scripted in-memory connection. Dispatches on the search base:
    /// the user base DN serves `users`, everything else serves `roles`.
    struct FakeConn {
        users: Vec<UserEntry>,
        roles: Vec<UserEntry>,
        bind: Result<(), DirectoryError>,
        searches: Vec<(String, String, Vec<String>)>,
    }

    impl FakeConn {
        fn new(users: Vec<UserEntry>, roles: Vec<UserEntry>) -> Self {
            Self {
                users,
                roles,
                bind: Ok(()),
                searches: Vec::new(),
            }
        }

        fn with_bind(mut self, bind: Result<(), DirectoryError>) -> Self {
            self.bind = bind;
            self
        }
    }

    #[async_trait]
    impl DirectoryConn for FakeConn {
        async fn search_base(
            &mut self,
            base_dn: &str,
            filter: &str,
            attrs: &[String],
        ) -> Result<Vec<UserEntry>, DirectoryError> {
            self.searches
                .push((base_dn.to_string(), filter.to_string(), attrs.to_vec()));
            if base_dn == "ou=users" {
                Ok(self.users.clone())
            } else {
                Ok(self.roles.clone())
            }
        }

        async fn simple_bind(&mut self, _dn: &str, _password: &str) -> Result<(), DirectoryError> {
            match &self.bind {
                Ok(()) => Ok(()),
                Err(DirectoryError::InvalidCredentials) => Err(DirectoryError::InvalidCredentials),
                Err(e) => Err(DirectoryError::Bind(e.to_string())),
            }
        }

        async fn close(&mut self) {}
    }

    fn make_client() -> AuthClient {
        AuthClient::new(DirectoryConfig {
            base_dn: "ou=users".to_string(),
            role_base_dn: "ou=groups".to_string(),
            attributes: vec!["name:name".to_string(), "sn:family_name".to_string()],
            ..Default::default()
        })
        .unwrap()
    }

    fn user_entry(dn: &str, attrs: &[(&str, &str)]) -> UserEntry {
        UserEntry {
            dn: dn.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn user_filter_is_reproduced_verbatim() {
        assert_eq!(
            user_filter("jean"),
            "(&(|(objectClass=organizationalPerson)(objectClass=inetOrgPerson))\
             (|(uid=jean)(mail=jean)(userPrincipalName=jean)(sAMAccountName=jean)))"
        );
        assert_eq!(role_filter(USER_DN), format!("(member={USER_DN})"));
    }

    #[tokio::test]
    async fn authorize_rejects_invalid_credentials() {
        let client = make_client();
        let mut conn = FakeConn::new(vec![user_entry(USER_DN, &[])], vec![])
            .with_bind(Err(DirectoryError::InvalidCredentials));

        let err = client
            .authorize(&mut conn, USERNAME, PASSWORD, "client-id")
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidCredentials));
    }

    #[tokio::test]
    async fn authorize_rejects_unknown_user() {
        let client = make_client();
        let mut conn = FakeConn::new(vec![], vec![]);

        let err = client
            .authorize(&mut conn, USERNAME, PASSWORD, "client-id")
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::UserNotFound));
    }

    #[tokio::test]
    async fn authorize_rejects_ambiguous_user() {
        let client = make_client();
        let mut conn = FakeConn::new(
            vec![user_entry(USER_DN, &[]), user_entry("uid=titi2,ou=users", &[])],
            vec![],
        );

        let err = client
            .authorize(&mut conn, USERNAME, PASSWORD, "client-id")
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::UserNotFound));
    }

    #[tokio::test]
    async fn authorize_rejects_user_without_role() {
        let client = make_client();
        let mut conn = FakeConn::new(vec![user_entry(USER_DN, &[])], vec![]);

        let err = client
            .authorize(&mut conn, USERNAME, PASSWORD, "client-id")
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Unauthorized));
    }

    #[tokio::test]
    async fn authorize_accepts_member_with_role() {
        let client = make_client();
        let mut conn = FakeConn::new(
            vec![user_entry(USER_DN, &[])],
            vec![user_entry("cn=admin,ou=client-id,ou=groups", &[("cn", "admin")])],
        );

        client
            .authorize(&mut conn, USERNAME, PASSWORD, "client-id")
            .await
            .unwrap();

        // The role lookup must run under the application's OU.
        let (role_base, role_filter_used, role_attrs) = conn.searches.last().unwrap().clone();
        assert_eq!(role_base, "ou=client-id,ou=groups");
        assert_eq!(role_filter_used, format!("(member={USER_DN})"));
        assert_eq!(role_attrs, vec!["cn".to_string()]);
    }

    #[tokio::test]
    async fn claims_fail_for_unknown_subject() {
        let client = make_client();
        let mut conn = FakeConn::new(vec![], vec![]);

        let err = client
            .claims(&mut conn, USERNAME, "client-id")
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::UserNotFound));
    }

    #[tokio::test]
    async fn claims_map_attributes_and_roles() {
        let client = make_client();
        let mut conn = FakeConn::new(
            vec![user_entry(USER_DN, &[("name", "Titi"), ("sn", "Titi Dupont")])],
            vec![user_entry("cn=admin,ou=client-id,ou=groups", &[("cn", "admin")])],
        );

        let claim = client.claims(&mut conn, USERNAME, "client-id").await.unwrap();

        let mut expected = HashMap::new();
        expected.insert("name".to_string(), "Titi".to_string());
        expected.insert("family_name".to_string(), "Titi Dupont".to_string());
        assert_eq!(claim.details, expected);
        assert_eq!(claim.roles, vec!["admin".to_string()]);

        // The user search must request dn plus the mapped attribute names.
        let (_, _, mut requested) = conn.searches.first().unwrap().clone();
        requested.sort();
        assert_eq!(
            requested,
            vec!["dn".to_string(), "name".to_string(), "sn".to_string()]
        );
    }

    #[tokio::test]
    async fn claims_omit_absent_attributes() {
        let client = make_client();
        let mut conn = FakeConn::new(
            vec![user_entry(USER_DN, &[("name", "Titi")])],
            vec![user_entry("cn=admin,ou=client-id,ou=groups", &[("cn", "admin")])],
        );

        let claim = client.claims(&mut conn, USERNAME, "client-id").await.unwrap();
        assert_eq!(claim.details.get("name"), Some(&"Titi".to_string()));
        assert!(!claim.details.contains_key("family_name"));
    }
}
