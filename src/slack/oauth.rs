//! The OAuth v2 flow that connects a workspace, and the token rotation call
//! that keeps its credential alive afterwards.
//!
//! Slack apps with token rotation enabled receive short-lived access tokens
//! alongside a refresh token; `tooling.tokens.rotate` trades the refresh
//! token for a fresh pair.
//!
//! The `state` parameter round-tripped through Slack's authorize screen is
//! signed with a shared secret so the callback can reject requests we never
//! initiated. Requests which fail verification, or which carry no state at
//! all while a secret is configured, are unauthenticated.

use super::{api::*, error::SlackError, team::TeamId};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as b64, Engine};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use url::Url;

/// The scopes requested when connecting a workspace. Write access for the
/// sends, read access for the channel picker.
const OAUTH_SCOPES: &str = "chat:write,chat:write.public,channels:read,groups:read";

/// Where users are sent to grant those scopes.
const AUTHORIZE_BASE: &str = "https://slack.com/oauth/v2/authorize";

/// Static configuration for the OAuth flow, read from the environment at
/// startup.
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Where to send the browser once a workspace is connected.
    pub dashboard_url: Url,
    pub state_secret: Option<StateSecret>,
}

/// Build the authorize URL a connecting user should be redirected to,
/// carrying a signed `state` when a secret is configured.
pub fn authorize_url(config: &OAuthConfig, state: Option<&String>) -> Url {
    let mut params = vec![
        ("client_id", config.client_id.as_str()),
        ("scope", OAUTH_SCOPES),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];

    if let Some(s) = state {
        params.push(("state", s));
    }

    // The base URL is a constant and the params are percent-encoded, so this
    // cannot fail.
    Url::parse_with_params(AUTHORIZE_BASE, params).expect("Invalid authorize URL")
}

/// A newtype wrapper around the shared secret used to sign OAuth state.
pub struct StateSecret(pub String);

type HmacSha256 = Hmac<Sha256>;

/// Mint a state value for an outgoing authorize redirect: a random nonce and
/// its signature, dot-separated.
pub fn gen_state(secret: &StateSecret) -> String {
    let nonce = uuid::Uuid::new_v4().to_string();
    match sign(secret, &nonce) {
        Some(sig) => format!("{}.{}", nonce, sig),
        // An HMAC key can be of any length, so this branch is unreachable.
        None => nonce,
    }
}

/// Check a state value returned by the callback against our secret.
pub fn is_valid_state(secret: &StateSecret, state: &str) -> bool {
    match state.split_once('.') {
        Some((nonce, sig)) => sign(secret, nonce).as_deref() == Some(sig),
        None => false,
    }
}

fn sign(secret: &StateSecret, payload: &str) -> Option<String> {
    HmacSha256::new_from_slice(secret.0.as_bytes())
        .map(|mut mac| {
            mac.update(payload.as_bytes());
            b64.encode(mac.finalize().into_bytes())
        })
        .ok()
}

/// The team block within [OAuthAccess].
#[derive(Deserialize)]
pub struct TeamInfo {
    pub id: TeamId,
    pub name: String,
}

/// The credential bundle granted by a successful code exchange.
///
/// <https://api.slack.com/methods/oauth.v2.access#examples>
#[derive(Deserialize)]
pub struct OAuthAccess {
    #[allow(dead_code)]
    #[serde(deserialize_with = "crate::de::only_true")]
    ok: bool,
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    pub bot_user_id: String,
    pub bot_id: String,
    pub team: TeamInfo,
}

/// The renewed pair granted by a rotation.
///
/// <https://api.slack.com/methods/tooling.tokens.rotate#examples>
#[derive(Deserialize)]
pub struct RotatedToken {
    #[allow(dead_code)]
    #[serde(deserialize_with = "crate::de::only_true")]
    ok: bool,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

impl SlackClient {
    /// Exchange an authorization code for a credential bundle.
    pub async fn exchange_code(
        &self,
        config: &OAuthConfig,
        code: &str,
    ) -> Result<OAuthAccess, SlackError> {
        let res: APIResult<OAuthAccess> = self
            .post_anon("/oauth.v2.access")
            .form(&[
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("code", code),
            ])
            .send()
            .await?
            .json()
            .await?;

        match res {
            APIResult::Ok(access) => Ok(access),
            APIResult::Err(res) => Err(SlackError::APIResponseError(res.error)),
        }
    }

    /// Trade a refresh token for a renewed credential pair.
    pub async fn rotate_token(
        &self,
        config: &OAuthConfig,
        refresh_token: &str,
    ) -> Result<RotatedToken, SlackError> {
        let res: APIResult<RotatedToken> = self
            .post_anon("/tooling.tokens.rotate")
            .form(&[
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?
            .json()
            .await?;

        match res {
            APIResult::Ok(rotated) => Ok(rotated),
            APIResult::Err(res) => Err(SlackError::APIResponseError(res.error)),
        }
    }
}
