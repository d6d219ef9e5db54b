//! Slack-facing subrouter definitions: the OAuth connect flow under `/auth`
//! and the message/channel operations under `/slack`.
//!
//! The following subroutes are supported:
//!
//! - GET: `/auth/connect`
//! - GET: `/auth/callback`
//! - POST: `/slack/message/send`
//! - POST: `/slack/message/schedule`
//! - GET: `/slack/messages/scheduled`
//! - DELETE: `/slack/message/cancel/:id`
//! - GET: `/slack/channels`

use crate::router::Deps;
use crate::slack::{
    channel::{Channel, ChannelId},
    error::SlackError,
    oauth::{authorize_url, gen_state, is_valid_state},
    team::TeamId,
};
use crate::store::credentials::CredentialRecord;
use crate::store::messages::ScheduledMessage;
use crate::tokens::TokenError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Instantiate the OAuth subrouter.
pub fn auth_router() -> Router<Deps> {
    Router::new()
        .route("/connect", get(connect_handler))
        .route("/callback", get(callback_handler))
}

/// Instantiate the messaging subrouter.
pub fn slack_router() -> Router<Deps> {
    Router::new()
        .route("/message/send", post(send_handler))
        .route("/message/schedule", post(schedule_handler))
        .route("/messages/scheduled", get(scheduled_handler))
        .route("/message/cancel/:id", delete(cancel_handler))
        .route("/channels", get(channels_handler))
}

/// The JSON error body every failing route responds with.
#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type Failure = (StatusCode, Json<ErrorBody>);

fn fail(code: StatusCode, error: impl Into<String>) -> Failure {
    (
        code,
        Json(ErrorBody {
            error: error.into(),
        }),
    )
}

pub fn handle_slack_err(e: &SlackError) -> Failure {
    let code = match &e {
        e if is_unauthenticated(e) => StatusCode::UNAUTHORIZED,
        SlackError::APIRequestFailed(_) => StatusCode::BAD_GATEWAY,
        SlackError::APIResponseError(_) => StatusCode::BAD_REQUEST,
    };

    let es = e.to_string();

    error!(es);
    fail(code, es)
}

/// Parse Slack's API response error to determine if the issue is that the
/// access token failed to provide authentication.
fn is_unauthenticated(res: &SlackError) -> bool {
    match res {
        SlackError::APIResponseError(e) => e == "invalid_auth",
        _ => false,
    }
}

fn handle_token_err(e: &TokenError) -> Failure {
    let code = match &e {
        // Both mean the caller can't act against this workspace right now.
        TokenError::NotConnected(_) => StatusCode::UNAUTHORIZED,
        TokenError::Refresh(_) => StatusCode::UNAUTHORIZED,
        TokenError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let es = e.to_string();

    error!(es);
    fail(code, es)
}

/// Handler for the GET subroute `/auth/connect`.
///
/// Redirects the browser to Slack's authorize screen, with a signed `state`
/// when a secret is configured.
async fn connect_handler(State(deps): State<Deps>) -> Redirect {
    let state = deps.oauth.state_secret.as_ref().map(gen_state);
    let url = authorize_url(&deps.oauth, state.as_ref());

    Redirect::to(url.as_str())
}

#[derive(Deserialize)]
struct CallbackParams {
    code: String,
    state: Option<String>,
}

/// Handler for the GET subroute `/auth/callback`.
///
/// Verifies the round-tripped `state` (when a secret is configured),
/// exchanges the authorization code for a credential bundle, stores it, and
/// bounces the browser onward to the dashboard.
async fn callback_handler(
    State(deps): State<Deps>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, Failure> {
    if let Some(secret) = &deps.oauth.state_secret {
        let valid = params
            .state
            .as_deref()
            .map(|s| is_valid_state(secret, s))
            .unwrap_or(false);

        if !valid {
            return Err(fail(StatusCode::UNAUTHORIZED, "invalid_state"));
        }
    }

    let access = deps
        .slack
        .exchange_code(&deps.oauth, &params.code)
        .await
        .map_err(|e| handle_slack_err(&e))?;

    let record = CredentialRecord {
        access_token: access.access_token,
        refresh_token: access.refresh_token,
        expires_at: Utc::now().timestamp_millis() + access.expires_in * 1000,
        bot_user_id: access.bot_user_id,
        bot_id: access.bot_id,
    };
    let bot_user_id = record.bot_user_id.clone();

    deps.tokens
        .connect(access.team.id.clone(), record)
        .await
        .map_err(|e| {
            error!("Could not persist credential: {}", e);
            fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    let mut url = deps.oauth.dashboard_url.clone();
    url.query_pairs_mut()
        .append_pair("teamId", &access.team.id.0)
        .append_pair("teamName", &access.team.name)
        .append_pair("botUserId", &bot_user_id);

    Ok(Redirect::to(url.as_str()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    team_id: TeamId,
    channel: ChannelId,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_ts: Option<String>,
}

/// Handler for the POST subroute `/message/send`. Sends immediately.
async fn send_handler(
    State(deps): State<Deps>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, Failure> {
    let team = TeamId(req.team_id.0.trim().to_owned());

    let token = deps
        .tokens
        .valid_token(&team, Utc::now())
        .await
        .map_err(|e| handle_token_err(&e))?;

    let ts = deps
        .slack
        .post_message(&req.channel, &req.message, &token)
        .await
        .map_err(|e| handle_slack_err(&e))?;

    Ok(Json(SendResponse {
        success: true,
        message_ts: ts,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleRequest {
    team_id: TeamId,
    channel: ChannelId,
    message: String,
    schedule_time: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResponse {
    success: bool,
    scheduled_id: String,
}

/// Handler for the POST subroute `/message/schedule`.
///
/// The target instant must be strictly in the future; nothing enters the
/// pending store otherwise.
async fn schedule_handler(
    State(deps): State<Deps>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>, Failure> {
    if req.schedule_time <= Utc::now() {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "Invalid or past schedule time",
        ));
    }

    let id = uuid::Uuid::new_v4().to_string();

    let msg = ScheduledMessage {
        id: id.clone(),
        team_id: TeamId(req.team_id.0.trim().to_owned()),
        channel: req.channel,
        message: req.message,
        schedule_time: req.schedule_time,
    };

    deps.messages.lock().await.add(msg).map_err(|e| {
        error!("Could not persist scheduled message: {}", e);
        fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(ScheduleResponse {
        success: true,
        scheduled_id: id,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamQuery {
    team_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduledView {
    id: String,
    channel: ChannelId,
    message: String,
    schedule_time: DateTime<Utc>,
}

/// Handler for the GET subroute `/messages/scheduled`. Lists the pending
/// messages of one workspace.
async fn scheduled_handler(
    State(deps): State<Deps>,
    Query(q): Query<TeamQuery>,
) -> Json<Vec<ScheduledView>> {
    let team = TeamId(q.team_id.trim().to_owned());

    let views = deps
        .messages
        .lock()
        .await
        .list()
        .iter()
        .filter(|m| m.team_id == team)
        .map(|m| ScheduledView {
            id: m.id.clone(),
            channel: m.channel.clone(),
            message: m.message.clone(),
            schedule_time: m.schedule_time,
        })
        .collect();

    Json(views)
}

#[derive(Serialize)]
struct CancelResponse {
    success: bool,
}

/// Handler for the DELETE subroute `/message/cancel/:id`.
///
/// The incoming ID and team are trimmed before comparison; stray whitespace
/// has been observed around IDs in transit.
async fn cancel_handler(
    State(deps): State<Deps>,
    Path(id): Path<String>,
    Query(q): Query<TeamQuery>,
) -> Result<Json<CancelResponse>, Failure> {
    let id = id.trim().to_owned();
    let team = TeamId(q.team_id.trim().to_owned());

    let mut messages = deps.messages.lock().await;

    let known = messages
        .list()
        .iter()
        .any(|m| m.id == id && m.team_id == team);
    if !known {
        return Err(fail(StatusCode::NOT_FOUND, "Scheduled message not found"));
    }

    messages.remove(&id).map_err(|e| {
        error!("Could not persist cancellation: {}", e);
        fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(CancelResponse { success: true }))
}

/// Handler for the GET subroute `/channels`. Surfaces the workspace's public
/// channels for the dashboard's picker.
async fn channels_handler(
    State(deps): State<Deps>,
    Query(q): Query<TeamQuery>,
) -> Result<Json<Vec<Channel>>, Failure> {
    let team = TeamId(q.team_id.trim().to_owned());

    let token = deps
        .tokens
        .valid_token(&team, Utc::now())
        .await
        .map_err(|e| handle_token_err(&e))?;

    let channels = deps
        .slack
        .list_channels(&token)
        .await
        .map_err(|e| handle_slack_err(&e))?;

    Ok(Json(channels))
}
