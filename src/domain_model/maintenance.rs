use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAINTENANCE_MESSAGE: &str =
    "The site is currently under maintenance. Please try again later.";

/// Process-wide system settings consulted by the maintenance gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSettings {
    pub maintenance_enabled: bool,
    pub maintenance_message: Option<String>,
    pub maintenance_scheduled_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SystemSettings {
    pub fn effective_message(&self) -> &str {
        self.maintenance_message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_MAINTENANCE_MESSAGE)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceUpdate {
    pub maintenance_enabled: bool,
    pub maintenance_message: Option<String>,
    pub maintenance_scheduled_at: Option<DateTime<Utc>>,
}
