use crate::application_impl::expiry_after;
use crate::domain_model::parse_std_duration;
use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use config::{Config, Environment as EnvSource, File};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub admin: Admin,
    pub auth: Auth,
    pub http: Http,
    pub log: Log,
    pub storage: Storage,
}

/// Deployment environment. Cookies are only marked `Secure` outside of
/// local development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// String that never shows up in logs.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Deserialize)]
pub struct Admin {
    pub email: String,
    pub password: Secret,
    #[serde(default = "default_admin_first_name")]
    pub first_name: String,
    #[serde(default = "default_admin_last_name")]
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub access_secret: Secret,
    pub refresh_secret: Secret,
    #[serde(default = "default_access_ttl")]
    pub access_ttl: String,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl: String,
    pub session_backend: String, // "memory" or "redis"
    pub redis_dsn: Option<String>,
    #[serde(default = "default_redis_prefix")]
    pub redis_prefix: String,
    #[serde(default = "default_password_time_cost")]
    pub password_time_cost: u32,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub backend_url: String,
    pub frontend_url: String,
    pub cookie_domain: Option<String>,
    pub environment: Environment,
    pub tls: Option<Tls>,
}

#[derive(Debug, Deserialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    pub backend: String, // "memory" or "mysql"
    pub mysql_dsn: Option<String>,
    #[serde(default = "default_settings_cache_ttl")]
    pub settings_cache_ttl: String,
}

fn default_admin_first_name() -> String {
    "Admin".to_string()
}

fn default_admin_last_name() -> String {
    "Account".to_string()
}

fn default_access_ttl() -> String {
    "15m".to_string()
}

fn default_refresh_ttl() -> String {
    "7d".to_string()
}

fn default_redis_prefix() -> String {
    "osintreport:auth".to_string()
}

fn default_password_time_cost() -> u32 {
    3
}

fn default_settings_cache_ttl() -> String {
    "30s".to_string()
}

impl Settings {
    pub fn access_ttl(&self) -> Result<Duration> {
        token_ttl("auth.access_ttl", &self.auth.access_ttl)
    }

    pub fn refresh_ttl(&self) -> Result<Duration> {
        token_ttl("auth.refresh_ttl", &self.auth.refresh_ttl)
    }

    pub fn settings_cache_ttl(&self) -> Result<Duration> {
        parse_std_duration(&self.storage.settings_cache_ttl)
            .map_err(|e| anyhow!("storage.settings_cache_ttl: {e}"))
    }

    /// Startup checks. Any error here is a misconfiguration and must abort.
    pub fn validate(&self) -> Result<()> {
        let access = self.auth.access_secret.expose();
        let refresh = self.auth.refresh_secret.expose();
        if access.len() < MIN_SECRET_LEN {
            bail!("auth.access_secret must be at least {MIN_SECRET_LEN} bytes");
        }
        if refresh.len() < MIN_SECRET_LEN {
            bail!("auth.refresh_secret must be at least {MIN_SECRET_LEN} bytes");
        }
        if access == refresh {
            bail!("auth.access_secret and auth.refresh_secret must differ");
        }

        self.access_ttl()?;
        self.refresh_ttl()?;
        self.settings_cache_ttl()?;

        match self.auth.session_backend.as_str() {
            "memory" => {}
            "redis" if self.auth.redis_dsn.is_some() => {}
            "redis" => bail!("auth.redis_dsn is required for the redis session backend"),
            other => bail!("unknown session backend: {other}"),
        }
        match self.storage.backend.as_str() {
            "memory" => {}
            "mysql" if self.storage.mysql_dsn.is_some() => {}
            "mysql" => bail!("storage.mysql_dsn is required for the mysql backend"),
            other => bail!("unknown storage backend: {other}"),
        }
        Ok(())
    }
}

/// A token lifetime must parse and keep `now + ttl` within the calendar range.
fn token_ttl(key: &str, raw: &str) -> Result<Duration> {
    let ttl = parse_std_duration(raw).map_err(|e| anyhow!("{key}: {e}"))?;
    expiry_after(Utc::now(), ttl).map_err(|_| anyhow!("{key}: {raw:?} is too long"))?;
    Ok(ttl)
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Loads the TOML file, then overlays `OSINT__SECTION__KEY` environment
/// variables.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            EnvSource::with_prefix("OSINT")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
