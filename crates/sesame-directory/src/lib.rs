//! LDAP directory authorization module
//!
//! Resolves a user entry by username, verifies credentials with a simple
//! bind, checks per-application role membership, and harvests directory
//! attributes as OIDC claims.
//!
//! All directory access goes through the [`DirectoryConn`] capability trait
//! so the authorization logic can be exercised against an in-memory fake.

mod client;
mod conn;
mod error;

pub use client::AuthClient;
pub use conn::{DirectoryConn, LdapConnection, UserEntry};
pub use error::DirectoryError;
