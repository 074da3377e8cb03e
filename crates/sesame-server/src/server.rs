//! Server wiring
//!
//! Builds the shared application state from validated configuration and
//! serves the axum router. Every client is constructed once here and
//! shared immutably by the handlers.

use axum::routing::{get, post};
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use sesame_core::config::AppConfig;
use sesame_directory::AuthClient;
use sesame_hydra::HydraClient;
use sesame_oidc::OidcClient;

use crate::routes;
use crate::sessions::SessionStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub scope_claims: Arc<HashMap<String, Vec<String>>>,
    pub directory: Arc<AuthClient>,
    pub hydra: Arc<HydraClient>,
    /// Absent when self-service login has no provider configured
    pub oidc: Option<Arc<OidcClient>>,
    pub sessions: Arc<SessionStore>,
}

pub struct Server {
    config: AppConfig,
}

impl Server {
    /// `config` must have passed `AppConfig::validate`.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let directory = AuthClient::new(self.config.ldap.clone())?;
        let hydra = HydraClient::new(&self.config.hydra)?;
        let scope_claims = self.config.hydra.scope_claim_map()?;

        let oidc = if self.config.selfservice.discovery_url.is_empty() {
            warn!("self-service login disabled: no provider discovery url configured");
            None
        } else {
            Some(Arc::new(
                OidcClient::discover(self.config.selfservice.clone()).await?,
            ))
        };

        let addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );

        let state = AppState {
            config: Arc::new(self.config),
            scope_claims: Arc::new(scope_claims),
            directory: Arc::new(directory),
            hydra: Arc::new(hydra),
            oidc,
            sessions: Arc::new(SessionStore::new()),
        };

        let app = router(state);
        let listener = TcpListener::bind(&addr).await?;
        info!("sesame listening on http://{addr}");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::selfservice::dashboard))
        .route(
            "/auth/login",
            get(routes::login::form).post(routes::login::submit),
        )
        .route("/auth/consent", get(routes::consent::handle))
        .route("/selfservice/login", get(routes::selfservice::begin_login))
        .route(
            "/selfservice/callback",
            get(routes::selfservice::oauth_callback),
        )
        .route(
            "/selfservice/revoke/{client_id}",
            post(routes::selfservice::revoke),
        )
        .route("/selfservice/logout", post(routes::selfservice::logout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
