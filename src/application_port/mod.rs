mod auth_service;
mod settings_service;

pub use auth_service::*;
pub use settings_service::*;
