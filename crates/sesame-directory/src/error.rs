//! Directory error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("directory connection failed: {0}")]
    Connection(String),

    #[error("directory search failed: {0}")]
    Search(String),

    #[error("directory bind failed: {0}")]
    Bind(String),

    #[error("unknown user")]
    UserNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized for this app")]
    Unauthorized,
}
