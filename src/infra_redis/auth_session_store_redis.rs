use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{
    AsyncCommands, FromRedisValue, RedisError, RedisResult, RedisWrite, Script, ToRedisArgs, Value,
};

const SESSION_ROTATE: &str = include_str!("session_rotate.lua");

/// Sessions live in a hash per session id, expiring with the refresh token.
/// A set per user indexes that user's session ids for bulk revocation.
pub struct RedisAuthSessionStore {
    conn: ConnectionManager,
    prefix: String,
    rotate: Script,
}

impl RedisAuthSessionStore {
    pub fn new(conn: redis::aio::ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisAuthSessionStore {
            conn,
            prefix: prefix.into(),
            rotate: Script::new(SESSION_ROTATE),
        }
    }

    fn session_key(&self, session_id: SessionId) -> String {
        format!("{}:session:{}", self.prefix, session_id)
    }

    fn user_key_prefix(&self) -> String {
        format!("{}:user:", self.prefix)
    }

    fn user_key(&self, user_id: UserId) -> String {
        format!("{}{}", self.user_key_prefix(), user_id)
    }
}

impl ToRedisArgs for UserId {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.to_string().as_bytes())
    }
}

impl FromRedisValue for UserId {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        let s: String = redis::from_redis_value(v)?;
        let user_id = s.parse::<UserId>().map_err(|e| {
            RedisError::from((
                redis::ErrorKind::TypeError,
                "invalid UserId string",
                e.to_string(),
            ))
        })?;
        Ok(user_id)
    }
}

fn store_err(e: RedisError) -> AuthError {
    AuthError::Store(e.to_string())
}

#[async_trait::async_trait]
impl AuthSessionStore for RedisAuthSessionStore {
    async fn create_session(&self, record: SessionRecord) -> Result<(), AuthError> {
        let key = self.session_key(record.session_id);
        let user_key = self.user_key(record.user_id);
        let exp = record.expires_at.timestamp();

        let fields = [
            ("user", record.user_id.to_string()),
            ("token", record.token_hash),
            ("exp", exp.to_string()),
            ("created", record.created_at.timestamp().to_string()),
            ("ua", record.user_agent.unwrap_or_default()),
            ("ip", record.ip_address.unwrap_or_default()),
        ];

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(&key, &fields)
            .ignore()
            .expire_at(&key, exp)
            .ignore()
            .sadd(&user_key, record.session_id.to_string())
            .ignore()
            .expire_at(&user_key, exp)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn rotate_if_current(
        &self,
        session_id: SessionId,
        presented_hash: &str,
        next_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RotateOutcome, AuthError> {
        let mut conn = self.conn.clone();
        let status: i64 = self
            .rotate
            .key(self.session_key(session_id))
            .arg(presented_hash)
            .arg(next_hash)
            .arg(expires_at.timestamp())
            .arg(self.user_key_prefix())
            .arg(session_id.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        match status {
            1 => Ok(RotateOutcome::Rotated),
            0 => Ok(RotateOutcome::Stale),
            -1 => Ok(RotateOutcome::Missing),
            other => Err(AuthError::Store(format!(
                "unknown rotate script status: {other}"
            ))),
        }
    }

    async fn revoke_session(&self, session_id: SessionId) -> Result<(), AuthError> {
        let key = self.session_key(session_id);
        let mut conn = self.conn.clone();
        let user: Option<UserId> = conn.hget(&key, "user").await.map_err(store_err)?;

        let mut pipe = redis::pipe();
        pipe.atomic().del(&key).ignore();
        if let Some(user_id) = user {
            pipe.srem(self.user_key(user_id), session_id.to_string())
                .ignore();
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(store_err)?;
        Ok(())
    }

    async fn revoke_user_sessions(&self, user_id: UserId) -> Result<(), AuthError> {
        let user_key = self.user_key(user_id);
        let mut conn = self.conn.clone();
        let session_ids: Vec<String> = conn.smembers(&user_key).await.map_err(store_err)?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        for sid in &session_ids {
            pipe.del(format!("{}:session:{}", self.prefix, sid)).ignore();
        }
        pipe.del(&user_key).ignore();
        let _: () = pipe.query_async(&mut conn).await.map_err(store_err)?;
        Ok(())
    }
}
