//! Flat-file persistence for credentials and scheduled messages.
//!
//! Each store owns its collection in memory as the source of truth; the JSON
//! file beneath it is a durability snapshot, rewritten in full on every
//! mutation. There's no append log and no concurrent-writer protection; a
//! single process accesses each store through a mutex.

pub mod credentials;
pub mod messages;

use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::{fmt, fs, io};

/// A failed interaction with a snapshot file. Mutations that hit one of these
/// must surface it rather than report success, since the in-memory state and
/// the file have diverged.
#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Serde(serde_json::Error),
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serde(e)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            StoreError::Io(e) => format!("Store file access failed: {}", e),
            StoreError::Serde(e) => format!("Store (de)serialization failed: {}", e),
        };

        write!(f, "{}", x)
    }
}

/// Read a snapshot file, or `None` when it doesn't exist yet.
fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match fs::read(path) {
        Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Rewrite a snapshot file in full. Pretty-printed so the files stay
/// hand-inspectable.
fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let raw = serde_json::to_vec_pretty(value)?;
    fs::write(path, raw)?;

    Ok(())
}
