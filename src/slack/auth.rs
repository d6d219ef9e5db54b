//! Helpers around Slack's use of OAuth Bearer Authentication.

/// A newtype wrapper around Slack access tokens. These are short-lived when
/// token rotation is enabled for the app, hence the refresh machinery in
/// [crate::tokens].
#[derive(Clone)]
pub struct SlackAccessToken(pub String);

/// Convert a Slack access token to a `Bearer` `Authorization` header value.
pub fn to_auth_header_val(t: &SlackAccessToken) -> String {
    format!("Bearer {}", t.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_auth_header_val() {
        let token = SlackAccessToken("xoxe-foo".into());
        assert_eq!(to_auth_header_val(&token), "Bearer xoxe-foo");
    }
}
