//! Users and their upload sessions.
//!
//! [`SessionStore`] is the seam between the upload service and persistence.
//! [`StoreState`] holds the records and enforces every rule (unique
//! usernames, ownership, cascade on delete); [`MemoryStore`] keeps it in
//! memory and [`crate::file_store::JsonFileStore`] mirrors it to disk.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use equipment_core::error::{EquipmentError, Result};
use equipment_core::models::{
    EquipmentItem, SessionId, SessionSummary, UploadSession, User, UserId,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 150;

// ── NewUpload ─────────────────────────────────────────────────────────────────

/// Everything needed to commit one successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUpload {
    pub user_id: UserId,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub summary: SessionSummary,
    pub items: Vec<EquipmentItem>,
}

// ── SessionStore ──────────────────────────────────────────────────────────────

/// Storage of users and upload sessions.
///
/// Every mutating call either applies completely or leaves the store as it
/// was.
pub trait SessionStore {
    /// Create a user. Names are unique and compared exactly.
    fn register_user(
        &mut self,
        username: &str,
        email: &str,
        created_at: DateTime<Utc>,
    ) -> Result<User>;

    fn find_user(&self, username: &str) -> Option<User>;

    fn user(&self, id: UserId) -> Option<User>;

    /// Remove a user together with all of their sessions.
    ///
    /// Returns the number of sessions removed.
    fn delete_user(&mut self, id: UserId) -> Result<usize>;

    /// Persist a session and all of its items as one unit.
    fn commit_upload(&mut self, upload: NewUpload) -> Result<UploadSession>;

    /// All sessions owned by `user`, in commit order.
    fn sessions_of(&self, user: UserId) -> Vec<UploadSession>;

    /// One session, only if `user` owns it.
    fn session(&self, user: UserId, id: SessionId) -> Result<UploadSession>;
}

// ── StoreState ────────────────────────────────────────────────────────────────

/// The complete store contents, serialisable as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    /// Highest user id handed out so far.
    #[serde(default)]
    pub last_user_id: u64,
    /// Highest session id handed out so far.
    #[serde(default)]
    pub last_session_id: u64,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub sessions: Vec<UploadSession>,
}

impl StoreState {
    pub fn register_user(
        &mut self,
        username: &str,
        email: &str,
        created_at: DateTime<Utc>,
    ) -> Result<User> {
        validate_username(username)?;
        if self.users.iter().any(|u| u.username == username) {
            return Err(EquipmentError::DuplicateUser(username.to_string()));
        }

        self.last_user_id += 1;
        let user = User {
            id: UserId(self.last_user_id),
            username: username.to_string(),
            email: email.trim().to_string(),
            created_at,
        };
        self.users.push(user.clone());
        Ok(user)
    }

    pub fn find_user(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn delete_user(&mut self, id: UserId) -> Result<usize> {
        let position = self
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| EquipmentError::UnknownUser(id.to_string()))?;
        self.users.remove(position);

        let before = self.sessions.len();
        self.sessions.retain(|s| s.user_id != id);
        Ok(before - self.sessions.len())
    }

    pub fn commit_upload(&mut self, upload: NewUpload) -> Result<UploadSession> {
        if self.user(upload.user_id).is_none() {
            return Err(EquipmentError::UnknownUser(upload.user_id.to_string()));
        }
        let summary = &upload.summary;
        let averages = [summary.avg_flowrate, summary.avg_pressure, summary.avg_temperature];
        if averages.iter().any(|avg| !avg.is_finite()) {
            return Err(EquipmentError::Other(anyhow::anyhow!(
                "averages of {} are not finite numbers",
                upload.file_name
            )));
        }

        let session = UploadSession {
            id: SessionId(self.last_session_id + 1),
            user_id: upload.user_id,
            created_at: upload.created_at,
            file_name: upload.file_name,
            summary: upload.summary,
            equipment_items: upload.items,
        };
        if !session.is_consistent() {
            return Err(EquipmentError::Other(anyhow::anyhow!(
                "summary of {} does not match its {} items",
                session.file_name,
                session.equipment_items.len()
            )));
        }

        self.last_session_id += 1;
        self.sessions.push(session.clone());
        Ok(session)
    }

    pub fn sessions_of(&self, user: UserId) -> impl Iterator<Item = &UploadSession> {
        self.sessions.iter().filter(move |s| s.user_id == user)
    }

    pub fn session(&self, user: UserId, id: SessionId) -> Result<&UploadSession> {
        self.sessions
            .iter()
            .find(|s| s.id == id && s.user_id == user)
            .ok_or(EquipmentError::SessionNotFound { user, session: id })
    }
}

/// Reject empty names and anything outside letters, digits and `@.+-_`.
pub fn validate_username(username: &str) -> Result<()> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("regex is valid"));

    if username.trim().is_empty() {
        return Err(EquipmentError::InvalidUsername("username is required".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN || !pattern.is_match(username) {
        return Err(EquipmentError::InvalidUsername(username.to_string()));
    }
    Ok(())
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// A [`SessionStore`] that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: StoreState,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }
}

impl SessionStore for MemoryStore {
    fn register_user(
        &mut self,
        username: &str,
        email: &str,
        created_at: DateTime<Utc>,
    ) -> Result<User> {
        self.state.register_user(username, email, created_at)
    }

    fn find_user(&self, username: &str) -> Option<User> {
        self.state.find_user(username).cloned()
    }

    fn user(&self, id: UserId) -> Option<User> {
        self.state.user(id).cloned()
    }

    fn delete_user(&mut self, id: UserId) -> Result<usize> {
        self.state.delete_user(id)
    }

    fn commit_upload(&mut self, upload: NewUpload) -> Result<UploadSession> {
        self.state.commit_upload(upload)
    }

    fn sessions_of(&self, user: UserId) -> Vec<UploadSession> {
        self.state.sessions_of(user).cloned().collect()
    }

    fn session(&self, user: UserId, id: SessionId) -> Result<UploadSession> {
        self.state.session(user, id).cloned()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use equipment_core::models::EquipmentDistribution;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap()
    }

    fn upload_for(user: UserId, kinds: &[&str]) -> NewUpload {
        let items: Vec<EquipmentItem> = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| EquipmentItem {
                name: format!("{kind}-{i}"),
                equipment_type: kind.to_string(),
                flowrate: 10.0,
                pressure: 5.0,
                temperature: 300.0,
            })
            .collect();
        NewUpload {
            user_id: user,
            file_name: "plant.csv".to_string(),
            created_at: at(0),
            summary: SessionSummary {
                total_count: items.len() as u64,
                avg_flowrate: 10.0,
                avg_pressure: 5.0,
                avg_temperature: 300.0,
                equipment_distribution: kinds.iter().copied().collect::<EquipmentDistribution>(),
            },
            items,
        }
    }

    #[test]
    fn test_register_assigns_increasing_ids() {
        let mut store = MemoryStore::new();
        let alice = store.register_user("alice", "a@example.com", at(0)).unwrap();
        let bob = store.register_user("bob", "", at(1)).unwrap();
        assert_eq!(alice.id, UserId(1));
        assert_eq!(bob.id, UserId(2));
        assert_eq!(store.find_user("bob"), Some(bob));
        assert_eq!(store.user(UserId(1)).unwrap().email, "a@example.com");
    }

    #[test]
    fn test_register_duplicate_username() {
        let mut store = MemoryStore::new();
        store.register_user("alice", "", at(0)).unwrap();
        let err = store.register_user("alice", "", at(1)).unwrap_err();
        assert!(matches!(err, EquipmentError::DuplicateUser(ref name) if name == "alice"));
        assert_eq!(store.state().users.len(), 1);
    }

    #[test]
    fn test_usernames_are_case_sensitive() {
        let mut store = MemoryStore::new();
        store.register_user("alice", "", at(0)).unwrap();
        assert!(store.register_user("Alice", "", at(1)).is_ok());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("jane.doe+ops@plant-1").is_ok());
        assert!(validate_username("operator_7").is_ok());
        assert!(matches!(validate_username(""), Err(EquipmentError::InvalidUsername(_))));
        assert!(matches!(validate_username("   "), Err(EquipmentError::InvalidUsername(_))));
        assert!(validate_username("two words").is_err());
        assert!(validate_username("semi;colon").is_err());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN)).is_ok());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_commit_upload_requires_known_user() {
        let mut store = MemoryStore::new();
        let err = store.commit_upload(upload_for(UserId(9), &["Pump"])).unwrap_err();
        assert!(matches!(err, EquipmentError::UnknownUser(_)));
        assert!(store.state().sessions.is_empty());
        assert_eq!(store.state().last_session_id, 0);
    }

    #[test]
    fn test_commit_upload_rejects_inconsistent_summary() {
        let mut store = MemoryStore::new();
        let user = store.register_user("alice", "", at(0)).unwrap();
        let mut upload = upload_for(user.id, &["Pump", "Valve"]);
        upload.items.pop();
        assert!(store.commit_upload(upload).is_err());
        assert!(store.sessions_of(user.id).is_empty());
    }

    #[test]
    fn test_commit_upload_keeps_items() {
        let mut store = MemoryStore::new();
        let user = store.register_user("alice", "", at(0)).unwrap();
        let session = store.commit_upload(upload_for(user.id, &["Pump", "Valve", "Pump"])).unwrap();

        assert_eq!(session.id, SessionId(1));
        assert_eq!(session.equipment_items.len(), 3);
        assert_eq!(session.summary.equipment_distribution.get("Pump"), Some(2));
        assert_eq!(store.session(user.id, session.id).unwrap(), session);
    }

    #[test]
    fn test_session_is_scoped_to_owner() {
        let mut store = MemoryStore::new();
        let alice = store.register_user("alice", "", at(0)).unwrap();
        let bob = store.register_user("bob", "", at(0)).unwrap();
        let session = store.commit_upload(upload_for(alice.id, &["Pump"])).unwrap();

        let err = store.session(bob.id, session.id).unwrap_err();
        assert!(matches!(err, EquipmentError::SessionNotFound { .. }));
        assert!(store.sessions_of(bob.id).is_empty());
        assert_eq!(store.sessions_of(alice.id).len(), 1);
    }

    #[test]
    fn test_delete_user_cascades() {
        let mut store = MemoryStore::new();
        let alice = store.register_user("alice", "", at(0)).unwrap();
        let bob = store.register_user("bob", "", at(0)).unwrap();
        for _ in 0..3 {
            store.commit_upload(upload_for(alice.id, &["Pump"])).unwrap();
        }
        store.commit_upload(upload_for(bob.id, &["Valve"])).unwrap();

        assert_eq!(store.delete_user(alice.id).unwrap(), 3);
        assert!(store.user(alice.id).is_none());
        assert!(store.sessions_of(alice.id).is_empty());
        assert_eq!(store.sessions_of(bob.id).len(), 1);
        assert!(matches!(
            store.delete_user(alice.id),
            Err(EquipmentError::UnknownUser(_))
        ));
    }

    #[test]
    fn test_session_ids_are_not_reused_after_delete() {
        let mut store = MemoryStore::new();
        let alice = store.register_user("alice", "", at(0)).unwrap();
        let first = store.commit_upload(upload_for(alice.id, &["Pump"])).unwrap();
        store.delete_user(alice.id).unwrap();

        let bob = store.register_user("bob", "", at(0)).unwrap();
        let second = store.commit_upload(upload_for(bob.id, &["Pump"])).unwrap();
        assert!(second.id > first.id);
        assert!(bob.id > alice.id);
    }

    #[test]
    fn test_commit_upload_rejects_non_finite_averages() {
        let mut store = MemoryStore::new();
        let user = store.register_user("alice", "", at(0)).unwrap();
        let mut upload = upload_for(user.id, &["Pump"]);
        upload.summary.avg_flowrate = f64::INFINITY;
        assert!(store.commit_upload(upload).is_err());

        let mut upload = upload_for(user.id, &["Pump"]);
        upload.summary.avg_temperature = f64::NAN;
        assert!(store.commit_upload(upload).is_err());

        assert!(store.sessions_of(user.id).is_empty());
        assert_eq!(store.state().last_session_id, 0);
    }
}
