//! Per-workspace OAuth credentials, persisted to `tokens.json`.

use super::{read_snapshot, write_snapshot, StoreError};
use crate::slack::team::TeamId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// How long before a token's reported expiry we treat it as stale, to avoid
/// racing Slack's own expiry clock.
pub const REFRESH_BUFFER_MS: i64 = 2 * 60 * 1000;

/// Everything granted by the OAuth exchange for one workspace. A refresh
/// replaces the whole record; there is no partial-update state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry of the access token, epoch milliseconds.
    pub expires_at: i64,
    pub bot_user_id: String,
    pub bot_id: String,
}

impl CredentialRecord {
    /// Whether the access token can still be used as-is at `now_ms` (epoch
    /// milliseconds), with [REFRESH_BUFFER_MS] of margin.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at - REFRESH_BUFFER_MS
    }
}

/// The credential records of every connected workspace, at most one per
/// workspace. Loaded once at startup and owned by the token manager
/// thereafter.
pub struct CredentialStore {
    path: PathBuf,
    records: HashMap<TeamId, CredentialRecord>,
}

impl CredentialStore {
    /// Read the snapshot at `path` into memory, starting empty when no file
    /// exists yet.
    pub fn load(path: PathBuf) -> Result<Self, StoreError> {
        let records = read_snapshot(&path)?.unwrap_or_default();

        Ok(CredentialStore { path, records })
    }

    /// Insert or replace the record for a workspace and rewrite the snapshot.
    /// The in-memory record is updated even when the write fails, and the
    /// failure is surfaced to the caller.
    pub fn upsert(&mut self, team: TeamId, record: CredentialRecord) -> Result<(), StoreError> {
        self.records.insert(team, record);
        write_snapshot(&self.path, &self.records)
    }

    pub fn get(&self, team: &TeamId) -> Option<&CredentialRecord> {
        self.records.get(team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    fn record(expires_at: i64) -> CredentialRecord {
        CredentialRecord {
            access_token: "xoxe-access".into(),
            refresh_token: "xoxe-1-refresh".into(),
            expires_at,
            bot_user_id: "U123".into(),
            bot_id: "B456".into(),
        }
    }

    #[test]
    fn test_load_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::load(dir.path().join("tokens.json")).unwrap();

        assert!(store.get(&TeamId("T1".into())).is_none());
    }

    #[test]
    fn test_upsert_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CredentialStore::load(dir.path().join("tokens.json")).unwrap();

        store.upsert(TeamId("T1".into()), record(1000)).unwrap();

        assert_eq!(store.get(&TeamId("T1".into())), Some(&record(1000)));
        assert!(store.get(&TeamId("T2".into())).is_none());
    }

    #[test]
    fn test_upsert_replaces_whole_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CredentialStore::load(dir.path().join("tokens.json")).unwrap();

        store.upsert(TeamId("T1".into()), record(1000)).unwrap();
        store.upsert(TeamId("T1".into()), record(2000)).unwrap();

        assert_eq!(store.get(&TeamId("T1".into())), Some(&record(2000)));
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let mut store = CredentialStore::load(path.clone()).unwrap();
        store.upsert(TeamId("T1".into()), record(1000)).unwrap();
        drop(store);

        let reloaded = CredentialStore::load(path).unwrap();
        assert_eq!(reloaded.get(&TeamId("T1".into())), Some(&record(1000)));
    }

    /// The snapshot file is keyed by team with camelCase fields, so it stays
    /// readable alongside the rest of the dashboard's JSON.
    #[test]
    fn test_snapshot_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let mut store = CredentialStore::load(path.clone()).unwrap();
        store.upsert(TeamId("T1".into()), record(1000)).unwrap();

        let raw = std::fs::read_to_string(path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json["T1"]["accessToken"], "xoxe-access");
        assert_eq!(json["T1"]["expiresAt"], 1000);
        assert_eq!(json["T1"]["botUserId"], "U123");
    }

    #[test]
    fn test_is_fresh_within_buffer() {
        let r = record(10_000_000);

        assert!(r.is_fresh(10_000_000 - REFRESH_BUFFER_MS - 1));
        assert!(!r.is_fresh(10_000_000 - REFRESH_BUFFER_MS));
        assert!(!r.is_fresh(10_000_000));
    }

    quickcheck! {
        /// Freshness holds exactly when more than the buffer remains before
        /// expiry.
        fn prop_is_fresh(expires_at: u32, now: u32) -> bool {
            let (expires_at, now) = (i64::from(expires_at), i64::from(now));

            record(expires_at).is_fresh(now) == (expires_at - now > REFRESH_BUFFER_MS)
        }
    }
}
