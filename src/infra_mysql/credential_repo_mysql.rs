use super::util::is_dup_key;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

const SELECT_USER: &str = r#"
SELECT u.id, u.email, u.first_name, u.last_name, u.password_hash, u.status,
       u.created_at, r.id AS role_id, r.name AS role_name
FROM app_user u
JOIN role r ON r.id = u.role_id
"#;

pub struct MySqlCredentialRepo {
    pool: MySqlPool,
}

impl MySqlCredentialRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlCredentialRepo { pool }
    }

    #[inline]
    fn uid_as_bytes(id: &UserId) -> &[u8] {
        id.0.as_bytes()
    }

    #[inline]
    fn uid_from_bytes(id: &[u8]) -> Result<UserId, AuthError> {
        Ok(UserId(
            Uuid::from_slice(id).map_err(|e| AuthError::Store(e.to_string()))?,
        ))
    }

    async fn permissions_for(&self, role_id: &str) -> Result<PermissionSet, AuthError> {
        let codes: Vec<String> = sqlx::query_scalar(
            r#"
SELECT permission_code
FROM role_permission
WHERE role_id = ?
"#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(codes
            .iter()
            .filter_map(|code| match code.parse::<PermissionCode>() {
                Ok(code) => Some(code),
                Err(e) => {
                    warn!(role_id, "skipping permission: {}", e);
                    None
                }
            })
            .collect())
    }

    async fn row_to_record(&self, row: MySqlRow) -> Result<CredentialRecord, AuthError> {
        let store = |e: sqlx::Error| AuthError::Store(e.to_string());

        let user_id_bytes: Vec<u8> = row.try_get("id").map_err(store)?;
        let status: String = row.try_get("status").map_err(store)?;
        let role_id: String = row.try_get("role_id").map_err(store)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(store)?;
        let permissions = self.permissions_for(&role_id).await?;

        Ok(CredentialRecord {
            user_id: Self::uid_from_bytes(&user_id_bytes)?,
            email: row.try_get("email").map_err(store)?,
            first_name: row.try_get("first_name").map_err(store)?,
            last_name: row.try_get("last_name").map_err(store)?,
            password_hash: row.try_get("password_hash").map_err(store)?,
            status: status.parse().map_err(AuthError::Store)?,
            role_id: RoleId(role_id),
            role_name: RoleName(row.try_get("role_name").map_err(store)?),
            permissions,
            created_at,
        })
    }

    async fn to_record(&self, row_opt: Option<MySqlRow>) -> Result<Option<CredentialRecord>, AuthError> {
        match row_opt {
            Some(row) => Ok(Some(self.row_to_record(row).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl CredentialRepo for MySqlCredentialRepo {
    async fn get_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, AuthError> {
        let sql = format!("{SELECT_USER} WHERE u.email = ?");
        let row_opt: Option<MySqlRow> = sqlx::query(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        self.to_record(row_opt).await
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<CredentialRecord>, AuthError> {
        let sql = format!("{SELECT_USER} WHERE u.id = ?");
        let row_opt: Option<MySqlRow> = sqlx::query(&sql)
            .bind(Self::uid_as_bytes(&user_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        self.to_record(row_opt).await
    }

    async fn create(&self, credential: NewCredential) -> Result<CredentialRecord, AuthError> {
        let role_id: Option<String> = sqlx::query_scalar("SELECT id FROM role WHERE name = ?")
            .bind(&credential.role_name.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let role_id = role_id.ok_or_else(|| AuthError::UnknownRole(credential.role_name.0.clone()))?;

        sqlx::query(
            r#"
INSERT INTO app_user (id, email, first_name, last_name, password_hash, status, role_id)
VALUES (?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(Self::uid_as_bytes(&credential.user_id))
        .bind(credential.email.trim().to_lowercase())
        .bind(&credential.first_name)
        .bind(&credential.last_name)
        .bind(&credential.password_hash)
        .bind(UserStatus::Active.as_str())
        .bind(&role_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::UserExists
            } else {
                AuthError::Store(e.to_string())
            }
        })?;

        self.get_by_id(credential.user_id)
            .await?
            .ok_or_else(|| AuthError::Store("inserted user not found".to_string()))
    }

    async fn update_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE app_user SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Self::uid_as_bytes(&user_id))
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }
}
