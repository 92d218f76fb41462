use crate::application_port::SettingsError;
use crate::domain_model::SystemSettings;
use crate::domain_port::SettingsStore;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<Option<SystemSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Option<SystemSettings>, SettingsError> {
        Ok(self.settings.read().await.clone())
    }

    async fn save(&self, settings: &SystemSettings) -> Result<(), SettingsError> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }
}
