//! Server router definition.
//!
//! The following routes are supported:
//!
//! - GET: `/api/v1/health`
//! - GET: `/api/v1/auth/connect`
//! - GET: `/api/v1/auth/callback`
//! - POST: `/api/v1/slack/message/send`
//! - POST: `/api/v1/slack/message/schedule`
//! - GET: `/api/v1/slack/messages/scheduled`
//! - DELETE: `/api/v1/slack/message/cancel/:id`
//! - GET: `/api/v1/slack/channels`

use crate::{
    slack::api::SlackClient,
    slack::oauth::OAuthConfig,
    slack::router::{auth_router, slack_router},
    store::messages::MessageStore,
    tokens::TokenManager,
};
use axum::{http::StatusCode, routing::get, Router};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::{self, TraceLayer};
use tracing::Level;

/// Dependencies shared by routes across requests, and with the dispatch
/// poller.
#[derive(Clone)]
pub struct Deps {
    pub slack: Arc<SlackClient>,
    pub tokens: Arc<TokenManager>,
    pub messages: Arc<Mutex<MessageStore>>,
    pub oauth: Arc<OAuthConfig>,
}

/// Instantiate a new router with tracing.
pub fn new(deps: Deps) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
        .on_response(trace::DefaultOnResponse::new().level(Level::INFO));

    let v1 = Router::new()
        .nest("/auth", auth_router())
        .nest("/slack", slack_router())
        .layer(trace_layer)
        // Exclude the health check route from tracing.
        .route("/health", get(|| async { StatusCode::OK }));

    let api = Router::new().nest("/v1", v1);

    Router::new()
        .nest("/api", api)
        // The dashboard lives on another origin than the API, so browser
        // requests arrive cross-origin.
        .layer(CorsLayer::permissive())
        .with_state(deps)
}

#[cfg(test)]
pub(crate) mod test_deps {
    use super::*;
    use crate::slack::oauth::StateSecret;
    use crate::slack::team::TeamId;
    use crate::store::credentials::{CredentialRecord, CredentialStore};
    use crate::store::messages::ScheduledMessage;
    use url::Url;

    /// Build [Deps] over temp-file stores and a substitute Slack base URL.
    pub fn deps(
        base_url: String,
        state_secret: Option<StateSecret>,
        credentials: Vec<(TeamId, CredentialRecord)>,
        pending: Vec<ScheduledMessage>,
    ) -> (tempfile::TempDir, Deps) {
        let dir = tempfile::tempdir().unwrap();

        let mut creds = CredentialStore::load(dir.path().join("tokens.json")).unwrap();
        for (team, r) in credentials {
            creds.upsert(team, r).unwrap();
        }

        let mut msgs = MessageStore::load(dir.path().join("scheduled_messages.json")).unwrap();
        for m in pending {
            msgs.add(m).unwrap();
        }

        let slack = Arc::new(SlackClient::new(base_url));
        let oauth = Arc::new(OAuthConfig {
            client_id: "1234.5678".into(),
            client_secret: "hush".into(),
            redirect_uri: "https://localhost:5000/api/v1/auth/callback".into(),
            dashboard_url: Url::parse("http://localhost:3000/dashboard").unwrap(),
            state_secret,
        });

        let deps = Deps {
            slack: slack.clone(),
            tokens: Arc::new(TokenManager::new(slack, oauth.clone(), creds)),
            messages: Arc::new(Mutex::new(msgs)),
            oauth,
        };

        (dir, deps)
    }
}
