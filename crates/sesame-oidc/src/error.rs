//! Relying-party OIDC error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OidcError {
    #[error("discovery document fetch failed: {0}")]
    Discovery(String),

    #[error("state token mismatch")]
    StateMismatch,

    #[error("authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    /// The identity token does not split into exactly three segments, or a
    /// segment does not decode.
    #[error("malformed identity token")]
    MalformedToken,

    #[error("identity token validation failed: {0}")]
    TokenValidation(String),

    #[error("userinfo request failed: {0}")]
    UserInfo(String),

    /// The userinfo `sub` claim is missing or does not match the identity
    /// token's `sub`.
    #[error("userinfo subject did not match identity token subject")]
    SubjectMismatch,

    #[error("http request to identity provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("parse of identity provider response failed: {0}")]
    Json(#[from] serde_json::Error),
}
