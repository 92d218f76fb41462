use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Default)]
pub struct MemoryCredentialRepo {
    users: DashMap<UserId, CredentialRecord>,
    emails: DashMap<String, UserId>,
}

impl MemoryCredentialRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, user_id: UserId, status: UserStatus) -> Result<(), AuthError> {
        let mut rec = self.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        rec.status = status;
        Ok(())
    }

    /// Changes the role in place; issued access tokens keep their old snapshot.
    pub fn set_role(&self, user_id: UserId, role_name: &str) -> Result<(), AuthError> {
        let role = role_definition(role_name)
            .ok_or_else(|| AuthError::UnknownRole(role_name.to_string()))?;
        let mut rec = self.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        rec.role_id = role.role_id();
        rec.role_name = role.role_name();
        rec.permissions = role.permission_set();
        Ok(())
    }
}

#[async_trait::async_trait]
impl CredentialRepo for MemoryCredentialRepo {
    async fn get_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, AuthError> {
        let key = email.trim().to_lowercase();
        let Some(user_id) = self.emails.get(&key).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|r| r.value().clone()))
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<CredentialRecord>, AuthError> {
        Ok(self.users.get(&user_id).map(|r| r.value().clone()))
    }

    async fn create(&self, credential: NewCredential) -> Result<CredentialRecord, AuthError> {
        let role = role_definition(&credential.role_name.0)
            .ok_or_else(|| AuthError::UnknownRole(credential.role_name.0.clone()))?;
        let email = credential.email.trim().to_lowercase();

        match self.emails.entry(email.clone()) {
            Entry::Occupied(_) => Err(AuthError::UserExists),
            Entry::Vacant(slot) => {
                let record = CredentialRecord {
                    user_id: credential.user_id,
                    email,
                    first_name: credential.first_name,
                    last_name: credential.last_name,
                    password_hash: credential.password_hash,
                    status: UserStatus::Active,
                    role_id: role.role_id(),
                    role_name: role.role_name(),
                    permissions: role.permission_set(),
                    created_at: Utc::now(),
                };
                self.users.insert(record.user_id, record.clone());
                slot.insert(record.user_id);
                Ok(record)
            }
        }
    }

    async fn update_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let mut rec = self.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        rec.password_hash = password_hash.to_owned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_credential(email: &str, role: &str) -> NewCredential {
        NewCredential {
            user_id: UserId::new(),
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role_name: RoleName(role.to_string()),
        }
    }

    #[tokio::test]
    async fn email_lookup_ignores_case() {
        let repo = MemoryCredentialRepo::new();
        let created = repo
            .create(new_credential("Ada@Example.org", "editor"))
            .await
            .unwrap();
        assert_eq!(created.email, "ada@example.org");
        assert!(created.permissions.contains(&PermissionCode::ReportsWrite));

        let found = repo.get_by_email("ADA@example.ORG").await.unwrap().unwrap();
        assert_eq!(found.user_id, created.user_id);
    }

    #[tokio::test]
    async fn rejects_duplicates_and_unknown_roles() {
        let repo = MemoryCredentialRepo::new();
        repo.create(new_credential("a@example.org", "reader"))
            .await
            .unwrap();
        assert!(matches!(
            repo.create(new_credential("A@example.org", "reader")).await,
            Err(AuthError::UserExists)
        ));
        assert!(matches!(
            repo.create(new_credential("b@example.org", "owner")).await,
            Err(AuthError::UnknownRole(_))
        ));
    }

    #[tokio::test]
    async fn role_changes_replace_the_permission_set() {
        let repo = MemoryCredentialRepo::new();
        let rec = repo
            .create(new_credential("a@example.org", "reader"))
            .await
            .unwrap();
        repo.set_role(rec.user_id, "admin").unwrap();
        let rec = repo.get_by_id(rec.user_id).await.unwrap().unwrap();
        assert!(rec.role_name.is_admin());
        assert!(rec.permissions.contains(&PermissionCode::SystemSettings));
    }
}
