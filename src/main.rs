//! Courier delivers Slack messages at their appointed hour.
//!
//! A workspace is connected once over OAuth; thereafter the dashboard can
//! list its channels and send messages either immediately or at a scheduled
//! future instant. Scheduled sends survive restarts via flat-file snapshots
//! and are dispatched by a once-a-second background poller.

use dotenvy::dotenv;
use router::Deps;
use slack::api::{SlackClient, API_BASE};
use slack::oauth::{OAuthConfig, StateSecret};
use std::path::PathBuf;
use std::sync::Arc;
use std::{env, fs, net::SocketAddr};
use store::credentials::CredentialStore;
use store::messages::MessageStore;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokens::TokenManager;
use tracing::{info, warn};
use url::Url;

mod de;
mod router;
mod scheduler;
mod slack;
mod store;
mod tokens;

/// Application entrypoint. Initialises tracing, reads configuration from the
/// environment, loads the snapshot stores, starts the dispatch poller, binds
/// to 0.0.0.0, and starts the server.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let has_dotenv = dotenv().is_ok();
    if !has_dotenv {
        warn!("No .env found");
    }

    let port: u16 = env::var("PORT")
        .map(|x| x.parse().expect("Could not parse PORT to u16"))
        .unwrap_or(5000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".into()));
    fs::create_dir_all(&data_dir).expect("Could not create $DATA_DIR");

    let state_secret = env::var("STATE_SECRET").ok().map(StateSecret);
    if state_secret.is_none() {
        warn!("No $STATE_SECRET environment variable found, OAuth state disabled");
    }

    let oauth = Arc::new(OAuthConfig {
        client_id: env::var("SLACK_CLIENT_ID").expect("No $SLACK_CLIENT_ID found"),
        client_secret: env::var("SLACK_CLIENT_SECRET").expect("No $SLACK_CLIENT_SECRET found"),
        redirect_uri: env::var("SLACK_REDIRECT_URI").expect("No $SLACK_REDIRECT_URI found"),
        dashboard_url: env::var("DASHBOARD_URL")
            .map(|x| Url::parse(&x).expect("Could not parse $DASHBOARD_URL"))
            .unwrap_or_else(|_| {
                Url::parse("http://localhost:3000/dashboard").expect("Invalid dashboard URL")
            }),
        state_secret,
    });

    let credentials = CredentialStore::load(data_dir.join("tokens.json"))
        .expect("Could not load credential snapshot");
    let messages = MessageStore::load(data_dir.join("scheduled_messages.json"))
        .expect("Could not load scheduled message snapshot");

    let slack_client = Arc::new(SlackClient::new(API_BASE.into()));
    let deps = Deps {
        slack: slack_client.clone(),
        tokens: Arc::new(TokenManager::new(slack_client, oauth.clone(), credentials)),
        messages: Arc::new(Mutex::new(messages)),
        oauth,
    };

    scheduler::spawn(deps.clone());

    server_(addr, deps).await;
}

/// Initialise a server without graceful shutdown.
async fn server_(addr: SocketAddr, deps: Deps) {
    // Giving a receiver that will never resolve.
    server(addr, deps, oneshot::channel::<()>().1).await;
}

/// Initialise a server with graceful shutdown via `rx`.
async fn server(addr: SocketAddr, deps: Deps, rx: oneshot::Receiver<()>) {
    info!("Listening on {}", addr.to_string());

    let listener = TcpListener::bind(addr).await.expect("Failed to bind");

    axum::serve(listener, router::new(deps))
        .with_graceful_shutdown(async {
            rx.await.ok();
        })
        .await
        .expect("Failed to start server");
}
