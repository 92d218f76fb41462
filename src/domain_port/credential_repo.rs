use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub status: UserStatus,
    pub role_id: RoleId,
    pub role_name: RoleName,
    pub permissions: PermissionSet,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.user_id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role_id: self.role_id.clone(),
            role_name: self.role_name.clone(),
            permissions: self.permissions.clone(),
        }
    }

    pub fn access_claims(&self) -> AccessTokenClaims {
        AccessTokenClaims {
            subject_id: self.user_id,
            role_id: self.role_id.clone(),
            role_name: self.role_name.clone(),
            permissions: self.permissions.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCredential {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role_name: RoleName,
}

#[async_trait::async_trait]
pub trait CredentialRepo: Send + Sync {
    /// Lookup is case-insensitive on email.
    async fn get_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, AuthError>;

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<CredentialRecord>, AuthError>;

    /// Fails with `UserExists` on a duplicate email and `UnknownRole` when the
    /// role is not defined.
    async fn create(&self, credential: NewCredential) -> Result<CredentialRecord, AuthError>;

    async fn update_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), AuthError>;
}
