use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

/// Persisted half of a login session. `token_hash` is the fingerprint of the
/// only refresh token id currently allowed to rotate the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub token_hash: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateOutcome {
    /// The presented fingerprint was current and has been replaced.
    Rotated,
    /// The presented fingerprint was already rotated away. The session is revoked.
    Stale,
    /// No live session under that id.
    Missing,
}

#[async_trait::async_trait]
pub trait AuthSessionStore: Send + Sync {
    async fn create_session(&self, record: SessionRecord) -> Result<(), AuthError>;

    /// Atomically swap `presented_hash` for `next_hash` if it is still current.
    /// Two concurrent calls with the same presented hash can never both see
    /// `Rotated`.
    async fn rotate_if_current(
        &self,
        session_id: SessionId,
        presented_hash: &str,
        next_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RotateOutcome, AuthError>;

    async fn revoke_session(&self, session_id: SessionId) -> Result<(), AuthError>;

    async fn revoke_user_sessions(&self, user_id: UserId) -> Result<(), AuthError>;
}
