use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Session store for a single process. Rotation holds the shard lock of the
/// session entry, which makes check-and-swap atomic per session.
#[derive(Debug, Default)]
pub struct MemoryAuthSessionStore {
    sessions: DashMap<SessionId, SessionRecord>,
}

impl MemoryAuthSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self, session_id: SessionId) -> Option<SessionRecord> {
        self.sessions.get(&session_id).map(|r| r.value().clone())
    }

    pub fn active_sessions(&self, user_id: UserId) -> usize {
        let now = Utc::now();
        self.sessions
            .iter()
            .filter(|r| r.user_id == user_id && r.expires_at > now)
            .count()
    }
}

#[async_trait::async_trait]
impl AuthSessionStore for MemoryAuthSessionStore {
    async fn create_session(&self, record: SessionRecord) -> Result<(), AuthError> {
        let now = Utc::now();
        self.sessions.retain(|_, r| r.expires_at > now);
        self.sessions.insert(record.session_id, record);
        Ok(())
    }

    async fn rotate_if_current(
        &self,
        session_id: SessionId,
        presented_hash: &str,
        next_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RotateOutcome, AuthError> {
        let now = Utc::now();
        let outcome = match self.sessions.entry(session_id) {
            Entry::Vacant(_) => RotateOutcome::Missing,
            Entry::Occupied(mut entry) => {
                if entry.get().expires_at <= now {
                    entry.remove();
                    RotateOutcome::Missing
                } else if entry.get().token_hash != presented_hash {
                    entry.remove();
                    RotateOutcome::Stale
                } else {
                    let record = entry.get_mut();
                    record.token_hash = next_hash.to_owned();
                    record.expires_at = expires_at;
                    RotateOutcome::Rotated
                }
            }
        };
        Ok(outcome)
    }

    async fn revoke_session(&self, session_id: SessionId) -> Result<(), AuthError> {
        self.sessions.remove(&session_id);
        Ok(())
    }

    async fn revoke_user_sessions(&self, user_id: UserId) -> Result<(), AuthError> {
        self.sessions.retain(|_, record| record.user_id != user_id);
        Ok(())
    }
}
