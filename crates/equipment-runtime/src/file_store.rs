//! A [`SessionStore`] persisted as a single JSON document.
//!
//! Every mutation is written to `<file>.json.tmp` and renamed over the store
//! file, so readers never observe a half-written document. If the write
//! fails the in-memory state is rolled back and the error is returned.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use equipment_core::error::{EquipmentError, Result};
use equipment_core::models::{SessionId, UploadSession, User, UserId};

use crate::store::{NewUpload, SessionStore, StoreState};

/// JSON-file backed store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: StoreState,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty when the file does not exist.
    ///
    /// The file itself is only created by the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let content =
                std::fs::read_to_string(&path).map_err(|source| EquipmentError::FileRead {
                    path: path.clone(),
                    source,
                })?;
            serde_json::from_str(&content)?
        } else {
            StoreState::default()
        };

        tracing::debug!(
            path = %path.display(),
            users = state.users.len(),
            sessions = state.sessions.len(),
            "store opened"
        );
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    // ── Private helpers ───────────────────────────────────────────────────

    /// Apply `op` and persist the result, restoring the previous state when
    /// either step fails.
    fn transact<T>(&mut self, op: impl FnOnce(&mut StoreState) -> Result<T>) -> Result<T> {
        let snapshot = self.state.clone();
        let outcome = op(&mut self.state).and_then(|value| self.save().map(|()| value));
        if outcome.is_err() {
            self.state = snapshot;
        }
        outcome
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl SessionStore for JsonFileStore {
    fn register_user(
        &mut self,
        username: &str,
        email: &str,
        created_at: DateTime<Utc>,
    ) -> Result<User> {
        self.transact(|state| state.register_user(username, email, created_at))
    }

    fn find_user(&self, username: &str) -> Option<User> {
        self.state.find_user(username).cloned()
    }

    fn user(&self, id: UserId) -> Option<User> {
        self.state.user(id).cloned()
    }

    fn delete_user(&mut self, id: UserId) -> Result<usize> {
        self.transact(|state| state.delete_user(id))
    }

    fn commit_upload(&mut self, upload: NewUpload) -> Result<UploadSession> {
        self.transact(|state| state.commit_upload(upload))
    }

    fn sessions_of(&self, user: UserId) -> Vec<UploadSession> {
        self.state.sessions_of(user).cloned().collect()
    }

    fn session(&self, user: UserId, id: SessionId) -> Result<UploadSession> {
        self.state.session(user, id).cloned()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
