//! Deserialization helpers for Slack's `ok` response flag.

use serde::de::{Deserialize, Deserializer, Error};

/// Accept only `true`, failing deserialization otherwise. Used to pick the
/// successful branch of an untagged Slack API response.
pub fn only_true<'a, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'a>,
{
    match bool::deserialize(deserializer)? {
        true => Ok(true),
        false => Err(Error::custom("expected `ok` to be true")),
    }
}

/// Accept only `false`. The mirror of [only_true], for error responses.
pub fn only_false<'a, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'a>,
{
    match bool::deserialize(deserializer)? {
        false => Ok(false),
        true => Err(Error::custom("expected `ok` to be false")),
    }
}
