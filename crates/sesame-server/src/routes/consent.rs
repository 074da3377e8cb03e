//! Consent challenge route
//!
//! Consent is granted without a form: membership in the application's role
//! OU is the consent decision, so the handler fetches the challenge,
//! harvests claims, filters them by requested scope, and accepts.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::{error, info};

use sesame_directory::DirectoryError;
use sesame_hydra::{filter_claims, ChallengeKind, HydraError};

use crate::routes::internal_error;
use crate::server::AppState;
use crate::views;

#[derive(Deserialize)]
pub struct ConsentParams {
    #[serde(default)]
    consent_challenge: String,
}

pub async fn handle(
    State(state): State<AppState>,
    Query(params): Query<ConsentParams>,
) -> Response {
    let challenge = params.consent_challenge;
    if challenge.is_empty() {
        info!("missing consent challenge");
        return (StatusCode::BAD_REQUEST, "missing consent challenge").into_response();
    }

    let resp = match state.hydra.get_request(ChallengeKind::Consent, &challenge).await {
        Ok(resp) => resp,
        Err(HydraError::ChallengeNotFound) => {
            error!(%challenge, "unknown consent challenge in the OAuth2 provider");
            return (StatusCode::BAD_REQUEST, "unknown consent challenge").into_response();
        }
        Err(HydraError::ChallengeExpired) => {
            info!(%challenge, "consent challenge has been used already in the OAuth2 provider");
            return (StatusCode::BAD_REQUEST, "consent challenge has been used already")
                .into_response();
        }
        Err(err) => {
            error!(%challenge, %err, "failed to initiate an OAuth2 consent request");
            return internal_error();
        }
    };

    let claims = match state
        .directory
        .find_oidc_claims(&resp.subject, &resp.client.id)
        .await
    {
        Ok(claims) => claims,
        Err(DirectoryError::Unauthorized) => {
            info!(%challenge, "unable to authorize during consent flow");
            return (
                StatusCode::UNAUTHORIZED,
                Html(views::message_page(&format!(
                    "user `{}` is not authorized to access this app",
                    resp.subject
                ))),
            )
                .into_response();
        }
        Err(err) => {
            error!(%challenge, %err, "error fetching claims from directory");
            return internal_error();
        }
    };

    let claims = filter_claims(&state.scope_claims, &claims, &resp.requested_scopes);

    match state
        .hydra
        .accept_consent(&challenge, !resp.skip, &resp.requested_scopes, &claims)
        .await
    {
        Ok(redirect) => {
            if resp.skip {
                info!(%challenge, "consent UI was skipped");
            }
            Redirect::to(&redirect).into_response()
        }
        Err(err) => {
            error!(%challenge, %err, "error making accept consent request");
            internal_error()
        }
    }
}
