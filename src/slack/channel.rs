//! List the channels of a connected workspace so the dashboard can offer a
//! picker.

use super::{api::*, auth::SlackAccessToken, error::SlackError};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use std::fmt;

/// Channel names as are visible in the Slack UI, without the leading hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelName(pub String);

/// Format without the surrounding newtype wrapper.
impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Because channel names can change, channels are referred to by their
/// underlying ID. Message sends address channels by this ID.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelId(pub String);

/// The per-channel subset of `conversations.list` we surface to the
/// dashboard.
#[derive(Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: ChannelName,
}

/// <https://api.slack.com/methods/conversations.list#args>
#[derive(Serialize)]
struct ListRequest {
    /// Maximum supported is 1000, but a limit of 200 is "recommended".
    limit: u16,
    exclude_archived: bool,
    types: &'static str,
    cursor: Option<String>,
}

/// <https://api.slack.com/methods/conversations.list#examples>
#[derive(Deserialize)]
struct ListResponse {
    #[allow(dead_code)]
    #[serde(deserialize_with = "crate::de::only_true")]
    ok: bool,
    channels: Vec<Channel>,
    response_metadata: PaginationMeta,
}

/// The metadata attached to a [ListResponse], enabling pagination.
#[serde_as]
#[derive(Deserialize)]
struct PaginationMeta {
    #[serde_as(as = "NoneAsEmptyString")]
    next_cursor: Option<String>,
}

impl SlackClient {
    /// List every public channel in the workspace, following pagination
    /// cursors until exhausted.
    pub async fn list_channels(
        &self,
        token: &SlackAccessToken,
    ) -> Result<Vec<Channel>, SlackError> {
        let mut channels: Vec<Channel> = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let res: APIResult<ListResponse> = self
                .get("/conversations.list", token)
                .query(&ListRequest {
                    limit: 200,
                    exclude_archived: true,
                    types: "public_channel",
                    cursor,
                })
                .send()
                .await?
                .json()
                .await?;

            match res {
                APIResult::Ok(mut res) => {
                    channels.append(&mut res.channels);

                    cursor = res.response_metadata.next_cursor;
                    if cursor.is_none() {
                        break Ok(channels);
                    }
                }
                APIResult::Err(res) => break Err(SlackError::APIResponseError(res.error)),
            }
        }
    }
}
