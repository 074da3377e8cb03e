//! Login challenge routes

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{error, info};

use sesame_core::types::ClientInfo;
use sesame_directory::DirectoryError;
use sesame_hydra::{ChallengeKind, HydraError};

use crate::routes::internal_error;
use crate::server::AppState;
use crate::views;

#[derive(Deserialize)]
pub struct LoginParams {
    #[serde(default)]
    login_challenge: String,
}

/// Render the login form, or skip it when the authorization server already
/// has a decision for this subject.
pub async fn form(
    State(state): State<AppState>,
    Query(params): Query<LoginParams>,
) -> Response {
    let challenge = params.login_challenge;
    if challenge.is_empty() {
        info!("missing login challenge");
        return (StatusCode::BAD_REQUEST, "missing login challenge").into_response();
    }

    let resp = match state.hydra.get_request(ChallengeKind::Login, &challenge).await {
        Ok(resp) => resp,
        Err(HydraError::ChallengeNotFound) => {
            error!(%challenge, "unknown login challenge in the OAuth2 provider");
            return (StatusCode::BAD_REQUEST, "unknown login challenge").into_response();
        }
        Err(HydraError::ChallengeExpired) => {
            info!(%challenge, "login challenge has been used already in the OAuth2 provider");
            return (StatusCode::BAD_REQUEST, "login challenge has been used already")
                .into_response();
        }
        Err(err) => {
            error!(%challenge, %err, "failed to initiate an OAuth2 login request");
            return internal_error();
        }
    };

    if resp.skip {
        return match state.hydra.accept_login(&challenge, false, &resp.subject).await {
            Ok(redirect) => {
                info!(%challenge, "login UI was skipped");
                Redirect::to(&redirect).into_response()
            }
            Err(err) => {
                error!(%challenge, %err, "error making accept login request");
                internal_error()
            }
        };
    }

    Html(views::login_page(&challenge, &resp.client, None)).into_response()
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    challenge: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    client_name: String,
    #[serde(default)]
    rememberme: Option<String>,
}

/// Authorize the credentials against the directory, then accept the login
/// challenge.
pub async fn submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    if form.challenge.is_empty() {
        info!("missing login challenge");
        return (StatusCode::BAD_REQUEST, "missing login challenge").into_response();
    }

    let client = ClientInfo {
        id: form.client_id.clone(),
        name: form.client_name.clone(),
    };

    match state
        .directory
        .is_authorized(&form.username, &form.password, &form.client_id)
        .await
    {
        Ok(()) => {
            let remember = form.rememberme.is_some();
            // The subject accepted here is the username the user typed; it
            // may be a uid or a mail address, whichever matched the filter.
            match state
                .hydra
                .accept_login(&form.challenge, remember, &form.username)
                .await
            {
                Ok(redirect) => Redirect::to(&redirect).into_response(),
                Err(err) => {
                    error!(challenge = %form.challenge, %err, "error making accept login request");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Html(views::login_page(&form.challenge, &client, Some(&err.to_string()))),
                    )
                        .into_response()
                }
            }
        }
        Err(DirectoryError::Unauthorized) => {
            info!(challenge = %form.challenge, "unable to authorize");
            (
                StatusCode::UNAUTHORIZED,
                Html(views::login_page(
                    &form.challenge,
                    &client,
                    Some(&format!(
                        "user `{}` is not authorized to access this app",
                        form.username
                    )),
                )),
            )
                .into_response()
        }
        Err(DirectoryError::UserNotFound | DirectoryError::InvalidCredentials) => {
            info!(challenge = %form.challenge, "unable to authenticate");
            (
                StatusCode::UNAUTHORIZED,
                Html(views::login_page(
                    &form.challenge,
                    &client,
                    Some("bad username or password"),
                )),
            )
                .into_response()
        }
        Err(err) => {
            error!(challenge = %form.challenge, %err, "error trying to authenticate");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(views::login_page(&form.challenge, &client, Some(&err.to_string()))),
            )
                .into_response()
        }
    }
}
