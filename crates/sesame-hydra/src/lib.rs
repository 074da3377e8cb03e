//! Challenge protocol client
//!
//! Drives the authorization server's login/consent challenge state over its
//! admin API: fetch a pending challenge, accept it, and manage a subject's
//! consent and login sessions. Also hosts the two pure helpers of the
//! consent flow: scope-based claim filtering and consent-session dedup.

mod claims;
mod client;
mod error;
mod session;

pub use claims::filter_claims;
pub use client::{ChallengeInfo, ChallengeKind, HydraClient};
pub use error::HydraError;
pub use session::{dedup_sessions, ConsentRequestInfo, ConsentSession};
