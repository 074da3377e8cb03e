//! Self-service dashboard routes
//!
//! A subject signs in through the relying-party OIDC flow, then can inspect
//! the consent grants the authorization server holds for them, revoke a
//! relying party, or invalidate their login session entirely.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::Value;
use tracing::error;

use sesame_oidc::OidcClient;

use crate::routes::internal_error;
use crate::server::AppState;
use crate::sessions::SESSION_COOKIE;
use crate::views;

fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

fn current_user(state: &AppState, jar: &CookieJar) -> Option<String> {
    session_id(jar)
        .and_then(|id| state.sessions.load(&id))
        .and_then(|data| data.user)
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .build()
}

pub async fn dashboard(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(subject) = current_user(&state, &jar) else {
        return Html(views::dashboard_page(None, &[], None)).into_response();
    };

    match state.hydra.list_consent_sessions(&subject).await {
        Ok(sessions) => {
            Html(views::dashboard_page(Some(subject.as_str()), &sessions, None)).into_response()
        }
        Err(err) => {
            error!(%err, "while trying to get sessions from the authorization server");
            Html(views::dashboard_page(
                Some(subject.as_str()),
                &[],
                Some("error while trying to get sessions from the authorization server"),
            ))
            .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct BeginLoginParams {
    #[serde(default)]
    state: String,
}

/// Start the OIDC flow: remember the state nonce, redirect to the provider.
pub async fn begin_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<BeginLoginParams>,
) -> Response {
    let Some(oidc) = &state.oidc else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "self-service login is not configured",
        )
            .into_response();
    };

    let nonce = OidcClient::make_state(&params.state);
    let id = state
        .sessions
        .update(session_id(&jar).as_deref(), |s| {
            s.oauth_state = nonce.clone();
        });

    let url = oidc.authorization_url(&nonce);
    let jar = jar.add(session_cookie(id));
    (jar, Redirect::to(&url)).into_response()
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: String,
    #[serde(default)]
    state: String,
}

/// Finish the OIDC flow and remember the authenticated subject.
pub async fn oauth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(oidc) = &state.oidc else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "self-service login is not configured",
        )
            .into_response();
    };

    let sid = session_id(&jar);
    let stored_state = sid
        .as_deref()
        .and_then(|id| state.sessions.load(id))
        .map(|data| data.oauth_state)
        .unwrap_or_default();

    match oidc
        .complete_auth(&params.code, &params.state, &stored_state)
        .await
    {
        Ok(claims) => {
            let subject = claims
                .get("sub")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let id = state.sessions.update(sid.as_deref(), |s| {
                s.user = Some(subject.clone());
                s.oauth_state.clear();
            });
            let jar = jar.add(session_cookie(id));
            (jar, Redirect::to("/")).into_response()
        }
        Err(err) => {
            error!(%err, "cannot complete user auth");
            internal_error()
        }
    }
}

/// Revoke one relying party's consent for the signed-in subject.
pub async fn revoke(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(client_id): Path<String>,
) -> Response {
    if let Some(subject) = current_user(&state, &jar) {
        if let Err(err) = state.hydra.revoke_consent(&subject, &client_id).await {
            error!(%err, client = %client_id, "while trying to revoke consent");
            return internal_error();
        }
    }
    Redirect::to("/").into_response()
}

/// Invalidate the subject's login session, remotely and locally.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(id) = session_id(&jar) {
        if let Some(subject) = state.sessions.load(&id).and_then(|data| data.user) {
            if let Err(err) = state.hydra.revoke_login(&subject).await {
                error!(%err, "while trying to invalidate the login session");
                return internal_error();
            }
        }
        state.sessions.remove(&id);
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/")).into_response()
}
