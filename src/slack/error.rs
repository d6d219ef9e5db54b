use std::fmt;

/// Sum type representing every possible unexceptional fail state when talking
/// to Slack.
#[derive(Debug)]
pub enum SlackError {
    /// The request never completed at the transport level.
    APIRequestFailed(reqwest::Error),
    /// The request completed but Slack signalled failure, carrying its
    /// machine-readable error code, e.g. `invalid_auth` or `channel_not_found`.
    APIResponseError(String),
}

impl From<reqwest::Error> for SlackError {
    fn from(e: reqwest::Error) -> Self {
        SlackError::APIRequestFailed(e)
    }
}

impl fmt::Display for SlackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            SlackError::APIRequestFailed(e) => format!("Slack API request failed: {:?}", e),
            SlackError::APIResponseError(e) => format!("Slack API returned error: {}", e),
        };

        write!(f, "{}", x)
    }
}
