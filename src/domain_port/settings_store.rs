use crate::application_port::SettingsError;
use crate::domain_model::SystemSettings;

#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    /// `None` until settings have been saved once.
    async fn load(&self) -> Result<Option<SystemSettings>, SettingsError>;

    async fn save(&self, settings: &SystemSettings) -> Result<(), SettingsError>;
}
