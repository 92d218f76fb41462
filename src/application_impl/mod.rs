mod admin_bootstrap;
mod auth_service_impl;
mod credential_hasher_argon2;
mod maintenance_gate;
mod settings_service_impl;
pub(crate) mod token_codec_jwt;

pub use admin_bootstrap::*;
pub use auth_service_impl::*;
pub use credential_hasher_argon2::*;
pub use maintenance_gate::*;
pub use settings_service_impl::*;
pub use token_codec_jwt::*;
