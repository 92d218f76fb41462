use crate::domain_model::{MaintenanceUpdate, SystemSettings};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Invalid(String),
    #[error("store error: {0}")]
    Store(String),
}

#[async_trait::async_trait]
pub trait SettingsService: Send + Sync {
    async fn get_settings(&self) -> Result<SystemSettings, SettingsError>;
    async fn update_maintenance(
        &self,
        update: MaintenanceUpdate,
    ) -> Result<SystemSettings, SettingsError>;
}
