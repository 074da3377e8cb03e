//! Challenge protocol error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HydraError {
    /// The caller supplied an empty challenge id; detected before any I/O.
    #[error("challenge missing")]
    ChallengeMissing,

    /// HTTP 404 from the authorization server
    #[error("challenge not found")]
    ChallengeNotFound,

    /// HTTP 409: the challenge has already been used
    #[error("challenge expired")]
    ChallengeExpired,

    /// HTTP 401 from the authorization server
    #[error("unauthenticated")]
    Unauthenticated,

    /// Any other non-success status, with the body's `error` message
    #[error("authorization server replied with status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("http request to authorization server failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("parse of authorization server response failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid challenge url: {0}")]
    Url(#[from] url::ParseError),
}
