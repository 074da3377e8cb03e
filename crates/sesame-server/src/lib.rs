//! Sesame HTTP server
//!
//! Serves the login and consent forms that complete the authorization
//! server's challenge flow, and a self-service dashboard where a subject
//! can inspect and revoke prior consent grants.

pub mod routes;
pub mod server;
pub mod sessions;
pub mod views;

pub use server::{AppState, Server};
