//! Upload service: ingestion, persistence and history behind one facade.
//!
//! An upload is resolved to its user, ingested in full, and only then
//! committed. A schema or ingestion failure returns before the store is
//! touched, so a rejected file leaves no trace.

use std::path::Path;

use chrono::{DateTime, Utc};
use equipment_core::error::{EquipmentError, Result};
use equipment_core::models::{SessionId, UploadSession, User};
use equipment_data::analysis::ingest;

use crate::history::recent_sessions;
use crate::store::{NewUpload, SessionStore};

/// Facade over a [`SessionStore`] used by every front end.
#[derive(Debug)]
pub struct UploadService<S> {
    store: S,
}

impl<S: SessionStore> UploadService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ── Users ─────────────────────────────────────────────────────────────

    pub fn register(&mut self, username: &str, email: &str) -> Result<User> {
        let user = self.store.register_user(username, email, Utc::now())?;
        tracing::info!(user = %user.username, id = %user.id, "user registered");
        Ok(user)
    }

    /// Delete `username` and every session they own.
    pub fn delete_user(&mut self, username: &str) -> Result<usize> {
        let user = self.resolve_user(username)?;
        let removed = self.store.delete_user(user.id)?;
        tracing::info!(user = %user.username, sessions = removed, "user deleted");
        Ok(removed)
    }

    // ── Uploads ───────────────────────────────────────────────────────────

    /// Ingest `bytes` and record the result for `username`, stamped now.
    pub fn upload(
        &mut self,
        username: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<UploadSession> {
        self.upload_at(username, file_name, bytes, Utc::now())
    }

    /// [`UploadService::upload`] with an explicit creation time.
    pub fn upload_at(
        &mut self,
        username: &str,
        file_name: &str,
        bytes: &[u8],
        created_at: DateTime<Utc>,
    ) -> Result<UploadSession> {
        let user = self.resolve_user(username)?;

        let (summary, items) = match ingest(bytes) {
            Ok(aggregation) => aggregation.into_parts(),
            Err(e) => {
                log_failure(&e, &user.username, file_name);
                return Err(e);
            }
        };

        let committed = self.store.commit_upload(NewUpload {
            user_id: user.id,
            file_name: file_name.to_string(),
            created_at,
            summary,
            items,
        });
        let session = match committed {
            Ok(session) => session,
            Err(e) => {
                log_failure(&e, &user.username, file_name);
                return Err(e);
            }
        };

        tracing::info!(
            user = %user.username,
            session = %session.id,
            rows = session.summary.total_count,
            "upload committed"
        );
        Ok(session)
    }

    /// Upload a CSV file from disk under its own file name.
    pub fn upload_path(
        &mut self,
        username: &str,
        path: &Path,
        file_name: Option<&str>,
    ) -> Result<UploadSession> {
        let bytes = std::fs::read(path).map_err(|source| EquipmentError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let name = match file_name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        };
        self.upload(username, &name, &bytes)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Up to five of `username`'s newest sessions, newest first.
    pub fn history(&self, username: &str) -> Result<Vec<UploadSession>> {
        let user = self.resolve_user(username)?;
        let sessions = recent_sessions(&self.store, user.id);
        tracing::debug!(user = %user.username, sessions = sessions.len(), "history listed");
        Ok(sessions)
    }

    /// One of `username`'s sessions by id.
    pub fn session(&self, username: &str, id: SessionId) -> Result<UploadSession> {
        let user = self.resolve_user(username)?;
        self.store.session(user.id, id)
    }

    fn resolve_user(&self, username: &str) -> Result<User> {
        self.store
            .find_user(username)
            .ok_or_else(|| EquipmentError::UnknownUser(username.to_string()))
    }
}

/// Rejections log at warn, anything else at error.
fn log_failure(error: &EquipmentError, user: &str, file_name: &str) {
    if error.is_rejection() {
        tracing::warn!(user, file = file_name, error = %error, "upload rejected");
    } else {
        tracing::error!(user, file = file_name, error = %error, "upload failed");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
