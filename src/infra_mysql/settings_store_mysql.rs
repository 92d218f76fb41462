use crate::application_port::SettingsError;
use crate::domain_model::SystemSettings;
use crate::domain_port::SettingsStore;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

/// Single-row table keyed by `id = 1`.
pub struct MySqlSettingsStore {
    pool: MySqlPool,
}

impl MySqlSettingsStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlSettingsStore { pool }
    }

    fn row_to_settings(row: MySqlRow) -> Result<SystemSettings, SettingsError> {
        let store = |e: sqlx::Error| SettingsError::Store(e.to_string());
        Ok(SystemSettings {
            maintenance_enabled: row.try_get("maintenance_enabled").map_err(store)?,
            maintenance_message: row.try_get("maintenance_message").map_err(store)?,
            maintenance_scheduled_at: row
                .try_get::<Option<DateTime<Utc>>, _>("maintenance_scheduled_at")
                .map_err(store)?,
            updated_at: row
                .try_get::<Option<DateTime<Utc>>, _>("updated_at")
                .map_err(store)?,
        })
    }
}

#[async_trait::async_trait]
impl SettingsStore for MySqlSettingsStore {
    async fn load(&self) -> Result<Option<SystemSettings>, SettingsError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT maintenance_enabled, maintenance_message, maintenance_scheduled_at, updated_at
FROM system_settings
WHERE id = 1
"#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SettingsError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_settings).transpose()
    }

    async fn save(&self, settings: &SystemSettings) -> Result<(), SettingsError> {
        sqlx::query(
            r#"
INSERT INTO system_settings
    (id, maintenance_enabled, maintenance_message, maintenance_scheduled_at, updated_at)
VALUES (1, ?, ?, ?, ?)
ON DUPLICATE KEY UPDATE
    maintenance_enabled = VALUES(maintenance_enabled),
    maintenance_message = VALUES(maintenance_message),
    maintenance_scheduled_at = VALUES(maintenance_scheduled_at),
    updated_at = VALUES(updated_at)
"#,
        )
        .bind(settings.maintenance_enabled)
        .bind(&settings.maintenance_message)
        .bind(settings.maintenance_scheduled_at)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| SettingsError::Store(e.to_string()))?;
        Ok(())
    }
}
