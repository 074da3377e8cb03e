//! Configuration error types
//!
//! All of these are raised once at startup and are fatal to process start.
//! Per-request failures live in the error enums of the crates that produce
//! them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("empty directory endpoint")]
    EmptyEndpoint,

    #[error("empty directory user base DN")]
    EmptyBaseDn,

    #[error("empty authorization server url")]
    EmptyHydraUrl,

    #[error("invalid authorization server url: {0}")]
    InvalidHydraUrl(#[from] url::ParseError),

    #[error("malformed mapping entry `{0}` (expected exactly one `:`)")]
    MalformedMapping(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
