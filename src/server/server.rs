use crate::api::v1::{CookieConfig, CookiePolicy};
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::anyhow;
use sqlx::{MySql, Pool};
use std::sync::Arc;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub settings_service: Arc<dyn SettingsService>,
    pub cookie_policy: Arc<CookiePolicy>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        settings_service: Arc<dyn SettingsService>,
        cookie_policy: Arc<CookiePolicy>,
    ) -> Self {
        Self {
            auth_service,
            settings_service,
            cookie_policy,
            pool: None,
        }
    }

    /// Builds every service from validated settings and makes sure the
    /// configured administrator exists.
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let access_ttl = settings.access_ttl()?;
        let refresh_ttl = settings.refresh_ttl()?;

        let (credential_repo, settings_store, pool): (
            Arc<dyn CredentialRepo>,
            Arc<dyn SettingsStore>,
            Option<Pool<MySql>>,
        ) = match settings.storage.backend.as_str() {
            "memory" => {
                warn!("using in-memory storage, all accounts are lost on restart");
                (
                    Arc::new(MemoryCredentialRepo::new()),
                    Arc::new(MemorySettingsStore::new()),
                    None,
                )
            }
            "mysql" => {
                let dsn = settings
                    .storage
                    .mysql_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("storage.mysql_dsn is not set"))?;
                let pool = Pool::<MySql>::connect(dsn).await?;
                (
                    Arc::new(MySqlCredentialRepo::new(pool.clone())),
                    Arc::new(MySqlSettingsStore::new(pool.clone())),
                    Some(pool),
                )
            }
            other => return Err(anyhow!("Unknown storage backend: {}", other)),
        };

        let session_store: Arc<dyn AuthSessionStore> = match settings.auth.session_backend.as_str()
        {
            "memory" => Arc::new(MemoryAuthSessionStore::new()),
            "redis" => {
                let dsn = settings
                    .auth
                    .redis_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("auth.redis_dsn is not set"))?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisAuthSessionStore::new(
                    redis_manager,
                    settings.auth.redis_prefix.clone(),
                ))
            }
            other => return Err(anyhow!("Unknown session backend: {}", other)),
        };

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(
            Argon2PasswordHasher::new(settings.auth.password_time_cost).map_err(|e| anyhow!(e))?,
        );
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.http.backend_url.clone(),
            audience: settings.http.frontend_url.clone(),
            access_ttl,
            refresh_ttl,
            access_secret: settings.auth.access_secret.expose().as_bytes().to_vec(),
            refresh_secret: settings.auth.refresh_secret.expose().as_bytes().to_vec(),
        }));

        let admin = AdminAccount {
            email: settings.admin.email.clone(),
            password: settings.admin.password.expose().to_string(),
            first_name: settings.admin.first_name.clone(),
            last_name: settings.admin.last_name.clone(),
        };
        ensure_admin_account(credential_repo.as_ref(), credential_hasher.as_ref(), &admin)
            .await
            .map_err(|e| anyhow!("admin bootstrap failed: {}", e))?;

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            credential_repo,
            credential_hasher,
            token_codec,
            session_store,
        ));
        let settings_service: Arc<dyn SettingsService> = Arc::new(CachedSettingsService::new(
            settings_store,
            settings.settings_cache_ttl()?,
        ));
        let cookie_policy = Arc::new(CookiePolicy::new(&CookieConfig {
            domain: settings.http.cookie_domain.as_deref(),
            environment: settings.http.environment,
            access_ttl,
            refresh_ttl,
        }));
        debug!(?cookie_policy);

        info!("server started");

        Ok(Self {
            pool,
            ..Self::new(auth_service, settings_service, cookie_policy)
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
