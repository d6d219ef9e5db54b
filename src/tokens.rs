//! Keeps each connected workspace's access token valid.
//!
//! Slack access tokens are short-lived when rotation is enabled, so anything
//! that wants to call the API goes through [TokenManager::valid_token] rather
//! than reading the store directly. The manager owns the credential store
//! outright, behind a mutex that's held across the rotation network call;
//! concurrent callers for a workspace whose token has gone stale therefore
//! collapse into a single rotation rather than racing Slack with the same
//! refresh token twice.

use crate::slack::api::SlackClient;
use crate::slack::auth::SlackAccessToken;
use crate::slack::error::SlackError;
use crate::slack::oauth::OAuthConfig;
use crate::slack::team::TeamId;
use crate::store::credentials::{CredentialRecord, CredentialStore};
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Why no usable access token could be produced for a workspace.
#[derive(Debug)]
pub enum TokenError {
    /// The workspace was never connected, or at least no credential record
    /// survives for it. No network call is attempted.
    NotConnected(TeamId),
    /// The cached token was stale and the rotation call failed. The stored
    /// record is left untouched; a later attempt may succeed.
    Refresh(SlackError),
    /// The rotation succeeded but the renewed record couldn't be persisted.
    Store(StoreError),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            TokenError::NotConnected(t) => format!("Workspace not connected: {}", t),
            TokenError::Refresh(e) => format!("Token refresh failed: {}", e),
            TokenError::Store(e) => format!("Token refresh could not be persisted: {}", e),
        };

        write!(f, "{}", x)
    }
}

/// Owner of the credential store and the only component that mutates it after
/// startup.
pub struct TokenManager {
    client: Arc<SlackClient>,
    config: Arc<OAuthConfig>,
    store: Mutex<CredentialStore>,
}

impl TokenManager {
    pub fn new(client: Arc<SlackClient>, config: Arc<OAuthConfig>, store: CredentialStore) -> Self {
        TokenManager {
            client,
            config,
            store: Mutex::new(store),
        }
    }

    /// Record the credential bundle of a freshly connected workspace.
    pub async fn connect(&self, team: TeamId, record: CredentialRecord) -> Result<(), StoreError> {
        self.store.lock().await.upsert(team, record)
    }

    /// Produce an access token currently valid for the workspace.
    ///
    /// While the cached token has more than the safety margin left before
    /// expiry it's returned as-is with no network call and no mutation.
    /// Otherwise exactly one rotation call is made, and on success the stored
    /// record is replaced wholesale, preserving the bot identity fields.
    ///
    /// `now` is taken as a parameter so tests can drive simulated time.
    pub async fn valid_token(
        &self,
        team: &TeamId,
        now: DateTime<Utc>,
    ) -> Result<SlackAccessToken, TokenError> {
        let mut store = self.store.lock().await;

        let record = store
            .get(team)
            .ok_or_else(|| TokenError::NotConnected(team.clone()))?
            .clone();

        let now_ms = now.timestamp_millis();
        if record.is_fresh(now_ms) {
            return Ok(SlackAccessToken(record.access_token));
        }

        info!("Token expired or near expiry for team {}, refreshing", team);

        let rotated = self
            .client
            .rotate_token(&self.config, &record.refresh_token)
            .await
            .map_err(TokenError::Refresh)?;

        let renewed = CredentialRecord {
            access_token: rotated.access_token.clone(),
            refresh_token: rotated.refresh_token,
            expires_at: now_ms + rotated.expires_in * 1000,
            bot_user_id: record.bot_user_id,
            bot_id: record.bot_id,
        };

        store
            .upsert(team.clone(), renewed)
            .map_err(TokenError::Store)?;

        info!("Token refreshed for team {}", team);

        Ok(SlackAccessToken(rotated.access_token))
    }
}
