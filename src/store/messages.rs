//! Pending scheduled messages, persisted to `scheduled_messages.json`.

use super::{read_snapshot, write_snapshot, StoreError};
use crate::slack::{channel::ChannelId, team::TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A user-submitted message awaiting dispatch. Destroyed either by explicit
/// cancellation or by the poller after a successful send; rescheduling is
/// cancel plus recreate, there's no update-in-place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledMessage {
    /// Unique, server-generated (UUID v4), so never contains stray
    /// whitespace. IDs arriving over HTTP are trimmed at the boundary before
    /// reaching the store's exact comparison.
    pub id: String,
    pub team_id: TeamId,
    pub channel: ChannelId,
    pub message: String,
    /// The instant at or after which the poller will attempt delivery.
    /// Serialized as an RFC 3339 string.
    pub schedule_time: DateTime<Utc>,
}

/// The ordered list of every pending message across all workspaces. The
/// store performs no validation; the scheduling handler has already checked
/// the target instant is in the future.
pub struct MessageStore {
    path: PathBuf,
    messages: Vec<ScheduledMessage>,
}

impl MessageStore {
    /// Read the snapshot at `path` into memory, starting empty when no file
    /// exists yet.
    pub fn load(path: PathBuf) -> Result<Self, StoreError> {
        let messages = read_snapshot(&path)?.unwrap_or_default();

        Ok(MessageStore { path, messages })
    }

    /// Append a message and rewrite the snapshot.
    pub fn add(&mut self, msg: ScheduledMessage) -> Result<(), StoreError> {
        self.messages.push(msg);
        write_snapshot(&self.path, &self.messages)
    }

    /// Every pending message; callers filter by workspace.
    pub fn list(&self) -> &[ScheduledMessage] {
        &self.messages
    }

    /// Remove the first message whose ID matches exactly, rewriting the
    /// snapshot only when something was removed. Returns whether a removal
    /// occurred.
    pub fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        match self.messages.iter().position(|m| m.id == id) {
            Some(i) => {
                self.messages.remove(i);
                write_snapshot(&self.path, &self.messages)?;

                Ok(true)
            }
            None => Ok(false),
        }
    }
}
