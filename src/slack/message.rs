//! Post plain-text messages to a channel, either immediately from a request
//! handler or from the dispatch poller when a scheduled send comes due.

use super::{api::*, auth::SlackAccessToken, channel::ChannelId, error::SlackError};
use serde::{Deserialize, Serialize};

/// <https://api.slack.com/methods/chat.postMessage#args>
#[derive(Serialize)]
struct MessageRequest<'a> {
    channel: &'a ChannelId,
    text: &'a str,
}

/// <https://api.slack.com/methods/chat.postMessage#examples>
#[derive(Deserialize)]
struct MessageResponse {
    #[allow(dead_code)]
    #[serde(deserialize_with = "crate::de::only_true")]
    ok: bool,
    /// Timestamp of the posted message, which doubles as its ID within the
    /// channel.
    ts: Option<String>,
}

impl SlackClient {
    /// Post a message in a channel, returning Slack's `ts` identifier for it
    /// when offered.
    pub async fn post_message(
        &self,
        channel: &ChannelId,
        text: &str,
        token: &SlackAccessToken,
    ) -> Result<Option<String>, SlackError> {
        let res: APIResult<MessageResponse> = self
            .post("/chat.postMessage", token)
            .json(&MessageRequest { channel, text })
            .send()
            .await?
            .json()
            .await?;

        match res {
            APIResult::Ok(res) => Ok(res.ts),
            APIResult::Err(res) => Err(SlackError::APIResponseError(res.error)),
        }
    }
}
