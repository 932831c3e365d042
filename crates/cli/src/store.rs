// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential storage: three fixed keys over a pluggable per-key backend.
//!
//! Operations are atomic per key only. The session triad (access token,
//! refresh token, fingerprint) is written as three sequential puts, never as
//! one transaction — a crash between writes can leave a torn state, which
//! every consumer absorbs by re-validating on read instead of assuming the
//! triad is consistent.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::RwLock;

use crate::error::SessionError;

/// Storage key for the current access token.
pub const KEY_ACCESS_TOKEN: &str = "session.access-token";
/// Storage key for the current refresh token.
pub const KEY_REFRESH_TOKEN: &str = "session.refresh-token";
/// Storage key for the fingerprint of the device that obtained the pair.
pub const KEY_DEVICE_FINGERPRINT: &str = "session.device-fingerprint";

/// Per-key credential storage.
///
/// `delete` of an absent key succeeds silently so callers can clear
/// repeatedly without tracking presence.
pub trait CredentialStore: Send + Sync {
    fn put(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn delete(&self, key: &str) -> Result<(), SessionError>;
}

/// In-memory store for tests and ephemeral tool invocations.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn put(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), SessionError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// File-backed store: one file per key under a state directory, written
/// atomically (write tmp + rename).
///
/// The directory is expected to live on OS-protected storage (the platform
/// state dir under the user's home); the store itself adds no cryptography.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl CredentialStore for FileStore {
    /// Uses a unique temp filename (PID + counter) to avoid corruption when
    /// concurrent saves race on the same `.tmp` file — a shorter write can
    /// leave trailing bytes from a longer previous write.
    fn put(&self, key: &str, value: &str) -> Result<(), SessionError> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)
                .map_err(|e| SessionError::Storage(format!("create state dir: {e}")))?;
        }

        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self.dir.join(format!("{key}.{}.{seq}.tmp", std::process::id()));
        std::fs::write(&tmp_path, value)
            .map_err(|e| SessionError::Storage(format!("write {key}: {e}")))?;
        std::fs::rename(&tmp_path, self.path_for(key))
            .map_err(|e| SessionError::Storage(format!("rename {key}: {e}")))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::Storage(format!("read {key}: {e}"))),
        }
    }

    fn delete(&self, key: &str) -> Result<(), SessionError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Storage(format!("delete {key}: {e}"))),
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
