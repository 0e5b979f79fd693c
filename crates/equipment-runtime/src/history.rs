//! Per-user upload history.

use std::cmp::Ordering;

use equipment_core::models::{UploadSession, UserId};

use crate::store::SessionStore;

/// Number of sessions a history listing returns at most.
pub const HISTORY_LIMIT: usize = 5;

/// The newest sessions owned by `user`, newest first.
///
/// Sessions sharing a `created_at` are ordered by descending id, i.e. the
/// later commit first. Sessions of other users are never included.
pub fn recent_sessions<S: SessionStore + ?Sized>(store: &S, user: UserId) -> Vec<UploadSession> {
    newest_first(store.sessions_of(user), HISTORY_LIMIT)
}

/// Sort `sessions` newest first and keep at most `limit`.
pub fn newest_first(mut sessions: Vec<UploadSession>, limit: usize) -> Vec<UploadSession> {
    sessions.sort_by(compare_newest_first);
    sessions.truncate(limit);
    sessions
}

fn compare_newest_first(a: &UploadSession, b: &UploadSession) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}
