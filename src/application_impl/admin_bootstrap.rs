use crate::application_impl::{normalize_email, validate_password};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;

#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Creates the configured administrator unless an account with that email
/// already exists. Existing accounts are left untouched.
pub async fn ensure_admin_account(
    repo: &dyn CredentialRepo,
    hasher: &dyn CredentialHasher,
    admin: &AdminAccount,
) -> Result<UserId, AuthError> {
    let email = normalize_email(&admin.email);
    if let Some(existing) = repo.get_by_email(&email).await? {
        debug!(user_id = %existing.user_id, "admin account already present");
        return Ok(existing.user_id);
    }

    validate_password(&admin.password)?;
    let password_hash = hasher.hash_password(&admin.password).await?;
    let rec = repo
        .create(NewCredential {
            user_id: UserId::new(),
            email,
            first_name: admin.first_name.clone(),
            last_name: admin.last_name.clone(),
            password_hash,
            role_name: RoleName(RoleName::ADMIN.to_string()),
        })
        .await?;

    info!(user_id = %rec.user_id, "admin account created");
    Ok(rec.user_id)
}
