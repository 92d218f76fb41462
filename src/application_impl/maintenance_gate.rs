use crate::application_port::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceNotice {
    pub message: String,
    pub maintenance_scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Pass,
    Blocked(MaintenanceNotice),
}

/// Decides whether `caller` may proceed. Must run after authentication since
/// administrators always pass. A failing settings lookup lets the request through.
pub async fn check_maintenance(
    settings_service: &dyn SettingsService,
    caller: Option<&AuthContext>,
) -> GateDecision {
    let settings = match settings_service.get_settings().await {
        Ok(settings) => settings,
        Err(e) => {
            error!("maintenance gate could not read settings, passing request: {}", e);
            return GateDecision::Pass;
        }
    };

    if !settings.maintenance_enabled {
        return GateDecision::Pass;
    }

    if let Some(ctx) = caller.filter(|ctx| ctx.is_admin()) {
        debug!(user_id = %ctx.user_id, "admin passes maintenance mode");
        return GateDecision::Pass;
    }

    info!(
        user_id = ?caller.map(|ctx| ctx.user_id),
        scheduled_at = ?settings.maintenance_scheduled_at,
        "request blocked by maintenance mode"
    );
    GateDecision::Blocked(MaintenanceNotice {
        message: settings.effective_message().to_string(),
        maintenance_scheduled_at: settings.maintenance_scheduled_at,
    })
}
