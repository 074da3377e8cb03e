//! HTTP route handlers

pub mod consent;
pub mod login;
pub mod selfservice;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub(crate) fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}
