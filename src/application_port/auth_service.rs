use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account inactive")]
    AccountInactive,
    #[error("user already exists")]
    UserExists,
    #[error("user not found")]
    UserNotFound,
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("weak password: {0}")]
    WeakPassword(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("session expired or revoked")]
    SessionExpired,
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Collapses verification failures into the outcome a request sees.
    pub fn into_unauthenticated(self) -> AuthError {
        match self {
            AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::SessionExpired
            | AuthError::UserNotFound => AuthError::Unauthenticated,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

/// Snapshot of identity and grants taken when the access token is minted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenClaims {
    pub subject_id: UserId,
    pub role_id: RoleId,
    pub role_name: RoleName,
    pub permissions: PermissionSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenClaims {
    pub subject_id: UserId,
    pub session_id: SessionId,
    pub token_id: TokenId,
}

#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: RefreshToken,
    pub session_id: SessionId,
    pub token_id: TokenId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// Authenticated caller attached to a request after the access token verifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub role_name: RoleName,
    pub permissions: PermissionSet,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role_name.is_admin()
    }

    pub fn has_all(&self, required: &[PermissionCode]) -> bool {
        required.iter().all(|code| self.permissions.contains(code))
    }

    pub fn require_permissions(&self, required: &[PermissionCode]) -> Result<(), AuthError> {
        if self.has_all(required) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

impl From<AccessTokenClaims> for AuthContext {
    fn from(claims: AccessTokenClaims) -> Self {
        AuthContext {
            user_id: claims.subject_id,
            role_id: claims.role_id,
            role_name: claims.role_name,
            permissions: claims.permissions,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: UserProfile,
    pub session_id: SessionId,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

/// Signs and verifies the two token kinds. Pure computation, no I/O.
pub trait TokenCodec: Send + Sync {
    fn issue_access_token(
        &self,
        claims: &AccessTokenClaims,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError>;
    fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, AuthError>;
    /// Starts a new session: fresh session id and token id.
    fn issue_refresh_token(&self, user: UserId) -> Result<IssuedRefreshToken, AuthError>;
    /// Continues `session`: fresh token id, same session id.
    fn rotate_refresh_token(
        &self,
        user: UserId,
        session: SessionId,
    ) -> Result<IssuedRefreshToken, AuthError>;
    fn verify_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, AuthError>;
    /// Keyed digest of a token id; the session store only ever sees this.
    fn fingerprint(&self, token_id: &TokenId) -> Result<String, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(
        &self,
        request: LoginInput,
        context: SessionContext,
    ) -> Result<LoginResult, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<LoginResult, AuthError>;
    async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError>;
    /// Verifies an access token. Never refreshes.
    async fn authenticate(&self, access_token: &str) -> Result<AuthContext, AuthError>;
    async fn current_user(&self, user_id: UserId) -> Result<UserProfile, AuthError>;
    async fn change_password(
        &self,
        user_id: UserId,
        request: ChangePasswordInput,
    ) -> Result<(), AuthError>;
    async fn register(&self, request: RegisterInput) -> Result<UserProfile, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: &str, permissions: &[PermissionCode]) -> AuthContext {
        AuthContext {
            user_id: UserId::new(),
            role_id: RoleId(format!("role-{role}")),
            role_name: RoleName(role.to_string()),
            permissions: permissions.iter().copied().collect(),
        }
    }

    #[test]
    fn permission_check_requires_a_superset() {
        let editor = context(
            "editor",
            &[PermissionCode::ReportsRead, PermissionCode::ReportsWrite],
        );
        assert!(editor.require_permissions(&[]).is_ok());
        assert!(
            editor
                .require_permissions(&[PermissionCode::ReportsRead, PermissionCode::ReportsWrite])
                .is_ok()
        );
        assert!(matches!(
            editor.require_permissions(&[PermissionCode::ReportsRead, PermissionCode::UsersWrite]),
            Err(AuthError::Forbidden)
        ));
    }

    #[test]
    fn only_the_admin_role_is_admin() {
        assert!(context("admin", &[]).is_admin());
        assert!(!context("reader", &PermissionCode::ALL).is_admin());
    }

    #[test]
    fn verification_failures_collapse_to_unauthenticated() {
        assert!(matches!(
            AuthError::TokenExpired.into_unauthenticated(),
            AuthError::Unauthenticated
        ));
        assert!(matches!(
            AuthError::TokenInvalid.into_unauthenticated(),
            AuthError::Unauthenticated
        ));
        assert!(matches!(
            AuthError::Forbidden.into_unauthenticated(),
            AuthError::Forbidden
        ));
    }
}
