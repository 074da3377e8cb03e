//! HTTP client for the authorization server's admin API
//!
//! Stateless per call: every operation takes the challenge id it acts on
//! and trusts the caller's ordering (a successful get before an accept).

use reqwest::redirect::Policy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use sesame_core::config::HydraConfig;
use sesame_core::types::{Claim, ClientInfo};

use crate::error::HydraError;
use crate::session::{dedup_sessions, ConsentSession};

/// The two challenge kinds the authorization server issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    Login,
    Consent,
}

impl ChallengeKind {
    /// Path segment under `oauth2/auth/requests/`
    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeKind::Login => "login",
            ChallengeKind::Consent => "consent",
        }
    }
}

/// Decoded challenge state, as returned by the get endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChallengeInfo {
    #[serde(default)]
    pub challenge: String,

    #[serde(rename = "requested_scope", default)]
    pub requested_scopes: Vec<String>,

    /// The authorization server already has a decision; UI can be bypassed
    #[serde(default)]
    pub skip: bool,

    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub client: ClientInfo,
}

#[derive(Serialize)]
struct AcceptLoginBody<'a> {
    remember: bool,
    remember_for: u64,
    subject: &'a str,
}

#[derive(Serialize)]
struct AcceptConsentBody<'a> {
    grant_scope: &'a [String],
    remember: bool,
    remember_for: u64,
    session: ConsentSessionBody,
}

#[derive(Serialize)]
struct ConsentSessionBody {
    id_token: Map<String, Value>,
}

#[derive(Deserialize)]
struct RedirectBody {
    #[serde(default)]
    redirect_to: String,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
    #[serde(default)]
    debug: String,
}

/// Admin API client, configured once at startup and shared by handlers
pub struct HydraClient {
    base_url: Url,
    remember_for: u64,
    http: reqwest::Client,
}

impl HydraClient {
    /// `cfg.url` must already be validated (and end in `/`).
    pub fn new(cfg: &HydraConfig) -> Result<Self, HydraError> {
        let base_url = Url::parse(&cfg.url)?;
        // 302 is a success code on this API; never follow it.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .redirect(Policy::none())
            .build()?;
        Ok(Self {
            base_url,
            remember_for: cfg.remember_for(),
            http,
        })
    }

    /// Fetch the pending challenge state.
    pub async fn get_request(
        &self,
        kind: ChallengeKind,
        challenge: &str,
    ) -> Result<ChallengeInfo, HydraError> {
        if challenge.is_empty() {
            return Err(HydraError::ChallengeMissing);
        }
        let url = self.challenge_url(kind, "", challenge)?;
        debug!(%url, "fetching challenge");

        let resp = self.http.get(url).send().await?;
        let body = check_response(resp).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Accept a login challenge; returns the redirect target.
    pub async fn accept_login(
        &self,
        challenge: &str,
        remember: bool,
        subject: &str,
    ) -> Result<String, HydraError> {
        let body = AcceptLoginBody {
            remember,
            remember_for: self.remember_for,
            subject,
        };
        self.accept(ChallengeKind::Login, challenge, &body).await
    }

    /// Accept a consent challenge, disclosing `claims` through the id token.
    pub async fn accept_consent(
        &self,
        challenge: &str,
        remember: bool,
        grant_scope: &[String],
        claims: &Claim,
    ) -> Result<String, HydraError> {
        let body = AcceptConsentBody {
            grant_scope,
            remember,
            remember_for: self.remember_for,
            session: ConsentSessionBody {
                id_token: claims.to_id_token(),
            },
        };
        self.accept(ChallengeKind::Consent, challenge, &body).await
    }

    /// Previously granted consent sessions of `subject`, one per client.
    pub async fn list_consent_sessions(
        &self,
        subject: &str,
    ) -> Result<Vec<ConsentSession>, HydraError> {
        let path = format!(
            "oauth2/auth/sessions/consent?subject={}",
            urlencoding::encode(subject)
        );
        let resp = self.http.get(self.base_url.join(&path)?).send().await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        if status != 200 {
            return Err(remote_error(status, &body));
        }
        let sessions: Vec<ConsentSession> = serde_json::from_str(&body)?;
        Ok(dedup_sessions(sessions))
    }

    /// Revoke one relying party's consent for `subject`.
    pub async fn revoke_consent(&self, subject: &str, client: &str) -> Result<(), HydraError> {
        let path = format!(
            "oauth2/auth/sessions/consent?subject={}&client={}",
            urlencoding::encode(subject),
            urlencoding::encode(client)
        );
        self.delete(&path).await
    }

    /// Invalidate the subject's login session.
    pub async fn revoke_login(&self, subject: &str) -> Result<(), HydraError> {
        let path = format!(
            "oauth2/auth/sessions/login?subject={}",
            urlencoding::encode(subject)
        );
        self.delete(&path).await
    }

    async fn accept(
        &self,
        kind: ChallengeKind,
        challenge: &str,
        payload: &impl Serialize,
    ) -> Result<String, HydraError> {
        if challenge.is_empty() {
            return Err(HydraError::ChallengeMissing);
        }
        let url = self.challenge_url(kind, "/accept", challenge)?;
        debug!(%url, "accepting challenge");

        let resp = self.http.put(url).json(payload).send().await?;
        let body = check_response(resp).await?;
        Ok(serde_json::from_str::<RedirectBody>(&body)?.redirect_to)
    }

    async fn delete(&self, path: &str) -> Result<(), HydraError> {
        let resp = self.http.delete(self.base_url.join(path)?).send().await?;

        let status = resp.status().as_u16();
        if status == 204 || status == 201 {
            return Ok(());
        }
        let body = resp.text().await?;
        let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
        error!(
            status,
            error = %parsed.error,
            description = %parsed.error_description,
            debug = %parsed.debug,
            "authorization server sent error"
        );
        Err(HydraError::Remote {
            status,
            message: parsed.error,
        })
    }

    fn challenge_url(
        &self,
        kind: ChallengeKind,
        verb: &str,
        challenge: &str,
    ) -> Result<Url, HydraError> {
        let kind = kind.as_str();
        let path = format!("oauth2/auth/requests/{kind}{verb}?{kind}_challenge={challenge}");
        Ok(self.base_url.join(&path)?)
    }
}

async fn check_response(resp: reqwest::Response) -> Result<String, HydraError> {
    let status = resp.status().as_u16();
    let body = resp.text().await?;
    check_status(status, &body)?;
    Ok(body)
}

/// Translate a response status into the fixed error taxonomy.
///
/// Anything in [200, 302] is success; the accept endpoints reply 302 when
/// they hand back a redirect.
fn check_status(status: u16, body: &str) -> Result<(), HydraError> {
    if (200..=302).contains(&status) {
        return Ok(());
    }
    match status {
        401 => Err(HydraError::Unauthenticated),
        404 => Err(HydraError::ChallengeNotFound),
        409 => Err(HydraError::ChallengeExpired),
        _ => Err(remote_error(status, body)),
    }
}

fn remote_error(status: u16, body: &str) -> HydraError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    HydraError::Remote {
        status,
        message: parsed.error,
    }
}
