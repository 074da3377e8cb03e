//! Relying-party OIDC client
//!
//! Self-service login against a third-party identity provider: standard
//! authorization-code flow, identity-token decoding and validation, and a
//! userinfo merge. The client is constructed once at startup (discovery is
//! fetched then) and shared immutably by request handlers; session state
//! (the `state` nonce, the signed-in subject) is owned by the caller.

mod error;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use rand::RngCore;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use sesame_core::config::OidcConfig;

pub use error::OidcError;

/// Allowance for clock drift between us and the identity provider
const CLOCK_SKEW_SECS: i64 = 10;

/// The discovery document fields the client consumes
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
}

/// Token endpoint response; only the fields the flow needs
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,

    #[serde(default)]
    pub id_token: String,
}

pub struct OidcClient {
    cfg: OidcConfig,
    discovery: DiscoveryDocument,
    authorization_endpoint: Url,
    http: reqwest::Client,
}

impl OidcClient {
    /// Build a client from an already-fetched discovery document.
    pub fn new(cfg: OidcConfig, discovery: DiscoveryDocument) -> Result<Self, OidcError> {
        let authorization_endpoint = Url::parse(&discovery.authorization_endpoint)
            .map_err(|e| OidcError::Discovery(format!("bad authorization endpoint: {e}")))?;
        Ok(Self {
            cfg,
            discovery,
            authorization_endpoint,
            http: reqwest::Client::new(),
        })
    }

    /// Fetch the provider's discovery document and build the client.
    pub async fn discover(cfg: OidcConfig) -> Result<Self, OidcError> {
        let http = reqwest::Client::new();
        let resp = http
            .get(&cfg.discovery_url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| OidcError::Discovery(e.to_string()))?;
        let discovery: DiscoveryDocument = resp.json().await?;
        debug!(issuer = %discovery.issuer, "fetched provider discovery document");
        Self::new(cfg, discovery)
    }

    /// Use the caller's state when given, otherwise generate an unguessable
    /// nonce so the authorization URL resists CSRF.
    pub fn make_state(supplied: &str) -> String {
        if !supplied.is_empty() {
            return supplied.to_string();
        }
        let mut nonce = [0u8; 64];
        rand::rng().fill_bytes(&mut nonce);
        URL_SAFE.encode(nonce)
    }

    /// The provider's authorization URL carrying `state`.
    pub fn authorization_url(&self, state: &str) -> String {
        let mut url = self.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.cfg.client_id)
            .append_pair("redirect_uri", &self.cfg.callback_url)
            .append_pair("scope", "openid")
            .append_pair("state", state);
        url.to_string()
    }

    /// Finish the flow: verify state, exchange the code, validate the
    /// identity token, and merge in the userinfo response.
    ///
    /// An empty `stored_state` means "no check"; a non-empty one must match
    /// the returned `state` exactly.
    pub async fn complete_auth(
        &self,
        code: &str,
        state: &str,
        stored_state: &str,
    ) -> Result<Map<String, Value>, OidcError> {
        if !stored_state.is_empty() && stored_state != state {
            return Err(OidcError::StateMismatch);
        }

        let token = self.exchange_code(code).await?;
        let mut claims = decode_id_token(&token.id_token)?;
        self.validate_claims(&claims)?;

        let user_info = self.fetch_user_info(&token.access_token).await?;

        // The userinfo `sub` must be present and equal to the identity
        // token's; otherwise the userinfo values must not be used.
        let token_sub = claims.get("sub").and_then(Value::as_str).unwrap_or_default();
        let info_sub = user_info
            .get("sub")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if info_sub.is_empty() || info_sub != token_sub {
            debug!(token_sub, info_sub, "userinfo subject check failed");
            return Err(OidcError::SubjectMismatch);
        }

        // Merge; userinfo values win on key collision.
        for (name, value) in user_info {
            claims.insert(name, value);
        }
        Ok(claims)
    }

    /// Exchange the authorization code for tokens (credentials in params).
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OidcError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.cfg.callback_url),
            ("client_id", &self.cfg.client_id),
            ("client_secret", &self.cfg.secret),
        ];
        let resp = self
            .http
            .post(&self.discovery.token_endpoint)
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OidcError::ExchangeFailed(format!(
                "token endpoint replied with status {status}"
            )));
        }
        let token: TokenResponse = resp.json().await?;
        if token.access_token.is_empty() {
            return Err(OidcError::ExchangeFailed(
                "no access token received from provider".to_string(),
            ));
        }
        if token.id_token.is_empty() {
            return Err(OidcError::ExchangeFailed(
                "token response did not contain an id_token".to_string(),
            ));
        }
        Ok(token)
    }

    /// Check `aud`, `iss`, and `exp` against configuration and discovery.
    pub fn validate_claims(&self, claims: &Map<String, Value>) -> Result<(), OidcError> {
        match claims.get("aud") {
            Some(Value::String(aud)) if *aud == self.cfg.client_id => {}
            Some(Value::Array(list))
                if list
                    .iter()
                    .any(|v| v.as_str() == Some(self.cfg.client_id.as_str())) => {}
            _ => {
                return Err(OidcError::TokenValidation(
                    "audience in token does not match client id".to_string(),
                ));
            }
        }

        if claims.get("iss").and_then(Value::as_str) != Some(self.discovery.issuer.as_str()) {
            return Err(OidcError::TokenValidation(
                "issuer in token does not match discovery issuer".to_string(),
            ));
        }

        let exp = claims
            .get("exp")
            .and_then(Value::as_f64)
            .map(|v| v as i64)
            .ok_or_else(|| OidcError::TokenValidation("missing exp claim".to_string()))?;
        if Utc::now().timestamp() > exp + CLOCK_SKEW_SECS {
            return Err(OidcError::TokenValidation(
                "identity token is expired".to_string(),
            ));
        }
        Ok(())
    }

    /// Fetch userinfo with the access token as a bearer credential.
    async fn fetch_user_info(&self, access_token: &str) -> Result<Map<String, Value>, OidcError> {
        let resp = self
            .http
            .get(&self.discovery.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() != 200 {
            let www_authenticate = resp
                .headers()
                .get("WWW-Authenticate")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            return Err(OidcError::UserInfo(format!(
                "non-200 response from userinfo: {status}, WWW-Authenticate={www_authenticate}"
            )));
        }
        Ok(resp.json().await?)
    }
}

/// Decode the claims segment of an identity token without verifying its
/// signature; signature trust comes from the direct TLS exchange with the
/// token endpoint.
pub fn decode_id_token(token: &str) -> Result<Map<String, Value>, OidcError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(OidcError::MalformedToken);
    }
    let payload = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| OidcError::MalformedToken)?;
    Ok(serde_json::from_slice(&payload)?)
}
