//! Sesame Core Library
//!
//! Shared configuration and identity types for the Sesame login/consent
//! provider.

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::ConfigError;
pub use types::{Claim, ClientInfo};

/// Sesame version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
