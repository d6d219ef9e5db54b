//! Workspace identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Slack workspace ("team") ID, as returned by the OAuth exchange. Opaque;
/// every credential and scheduled message is keyed by one of these.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub String);

/// Format without the surrounding newtype wrapper.
impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
