use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const MAX_MESSAGE_LEN: usize = 500;

/// Read-through cache over a `SettingsStore`. Updates go through this service
/// and replace the cached value immediately.
pub struct CachedSettingsService {
    store: Arc<dyn SettingsStore>,
    ttl: Duration,
    cache: RwLock<Option<(SystemSettings, Instant)>>,
}

impl CachedSettingsService {
    pub fn new(store: Arc<dyn SettingsStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            cache: RwLock::new(None),
        }
    }

    async fn load_or_init(&self) -> Result<SystemSettings, SettingsError> {
        if let Some(settings) = self.store.load().await? {
            return Ok(settings);
        }
        info!("creating default system settings");
        let settings = SystemSettings {
            updated_at: Some(Utc::now()),
            ..SystemSettings::default()
        };
        self.store.save(&settings).await?;
        Ok(settings)
    }
}

#[async_trait::async_trait]
impl SettingsService for CachedSettingsService {
    async fn get_settings(&self) -> Result<SystemSettings, SettingsError> {
        if let Some((settings, loaded_at)) = self.cache.read().await.as_ref() {
            if loaded_at.elapsed() < self.ttl {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_or_init().await?;
        *self.cache.write().await = Some((settings.clone(), Instant::now()));
        Ok(settings)
    }

    async fn update_maintenance(
        &self,
        update: MaintenanceUpdate,
    ) -> Result<SystemSettings, SettingsError> {
        let message = update
            .maintenance_message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        if message.as_ref().is_some_and(|m| m.chars().count() > MAX_MESSAGE_LEN) {
            return Err(SettingsError::Invalid(format!(
                "maintenance message exceeds {MAX_MESSAGE_LEN} characters"
            )));
        }

        let mut settings = self.load_or_init().await?;
        settings.maintenance_enabled = update.maintenance_enabled;
        settings.maintenance_message = message;
        settings.maintenance_scheduled_at = update.maintenance_scheduled_at;
        settings.updated_at = Some(Utc::now());

        self.store.save(&settings).await?;
        *self.cache.write().await = Some((settings.clone(), Instant::now()));

        info!(
            maintenance_enabled = settings.maintenance_enabled,
            scheduled_at = ?settings.maintenance_scheduled_at,
            "maintenance settings updated"
        );
        Ok(settings)
    }
}
