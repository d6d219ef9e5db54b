//! Type definitions and helpers for the Slack API.

use super::auth::*;
use serde::Deserialize;

/// The base URL of the Slack API.
pub const API_BASE: &str = "https://slack.com/api";

/// A reusable client over the Slack API. Holds a connection pool internally,
/// as per [reqwest::Client]. The base URL is instance state so that tests can
/// substitute a mock server.
pub struct SlackClient {
    base_url: String,
    http: reqwest::Client,
}

impl SlackClient {
    pub fn new(base_url: String) -> Self {
        SlackClient {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Create a GET request to any Slack API endpoint, handling
    /// authentication.
    pub(super) fn get(&self, path: &str, token: &SlackAccessToken) -> reqwest::RequestBuilder {
        self.http
            .get(self.base_url.to_owned() + path)
            .header(reqwest::header::AUTHORIZATION, to_auth_header_val(token))
    }

    /// Create a POST request to any Slack API endpoint, handling
    /// authentication.
    pub(super) fn post(&self, path: &str, token: &SlackAccessToken) -> reqwest::RequestBuilder {
        self.http
            .post(self.base_url.to_owned() + path)
            .header(reqwest::header::AUTHORIZATION, to_auth_header_val(token))
    }

    /// Create a POST request to an endpoint which authenticates via its
    /// parameters rather than a bearer token, namely the OAuth code exchange
    /// and token rotation.
    pub(super) fn post_anon(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.post(self.base_url.to_owned() + path)
    }
}

/// Slack's API returns a common "untagged" response, representing whether a
/// request was successful.
///
/// ```json
/// {
///     "ok": true,
///     "channels": []
/// }
/// ```
///
/// ```json
/// {
///     "ok": false,
///     "error": "invalid_auth"
/// }
/// ```
#[derive(Deserialize)]
#[serde(untagged)]
pub enum APIResult<T> {
    Ok(T),
    Err(ErrorResponse),
}

/// The universal response in case of an unsuccessful request.
// The `ok` field is checked here, and should be checked on responses too,
// primarily to ensure appropriate deserialization behaviour in case of an
// otherwise empty successful response.
//
// Ideally we'd be able to use `ok` as a tag, rather than defining `APIResult`
// as untagged. See:
//   <https://github.com/serde-rs/serde/issues/745#issuecomment-294314786>
#[derive(Deserialize)]
pub struct ErrorResponse {
    #[allow(dead_code)]
    #[serde(deserialize_with = "crate::de::only_false")]
    ok: bool,
    pub error: String,
}
