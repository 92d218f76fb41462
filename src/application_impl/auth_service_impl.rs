use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;

const MIN_PASSWORD_LEN: usize = 12;
const DEFAULT_ROLE: &str = "reader";

pub struct RealAuthService {
    credential_repo: Arc<dyn CredentialRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn AuthSessionStore>,
}

impl RealAuthService {
    pub fn new(
        credential_repo: Arc<dyn CredentialRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn AuthSessionStore>,
    ) -> Self {
        Self {
            credential_repo,
            credential_hasher,
            token_codec,
            session_store,
        }
    }

    /// Access token from the current role of `rec`, so a refresh picks up
    /// privilege changes made since the last one.
    fn tokens_for(
        &self,
        rec: &CredentialRecord,
        refresh: IssuedRefreshToken,
    ) -> Result<AuthTokens, AuthError> {
        let (access_token, access_exp) = self.token_codec.issue_access_token(&rec.access_claims())?;
        Ok(AuthTokens {
            access_token,
            refresh_token: refresh.token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh.expires_at,
        })
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword("must be at least 12 characters long"));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(AuthError::WeakPassword("must contain an uppercase letter"));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(AuthError::WeakPassword("must contain a lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword("must contain a digit"));
    }
    if !password.chars().any(|c| c.is_ascii_punctuation()) {
        return Err(AuthError::WeakPassword("must contain a special character"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AuthError::InvalidInput(format!("invalid email: {email}"))),
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(
        &self,
        request: LoginInput,
        context: SessionContext,
    ) -> Result<LoginResult, AuthError> {
        let LoginInput { email, password } = request;
        let email = normalize_email(&email);

        let Some(rec) = self.credential_repo.get_by_email(&email).await? else {
            info!(%email, "login rejected: unknown account");
            return Err(AuthError::InvalidCredentials);
        };

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            info!(user_id = %rec.user_id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !rec.is_active() {
            info!(user_id = %rec.user_id, "login rejected: account inactive");
            return Err(AuthError::AccountInactive);
        }

        let refresh = self.token_codec.issue_refresh_token(rec.user_id)?;
        let token_hash = self.token_codec.fingerprint(&refresh.token_id)?;
        let session_id = refresh.session_id;

        self.session_store
            .create_session(SessionRecord {
                session_id,
                user_id: rec.user_id,
                token_hash,
                user_agent: context.user_agent,
                ip_address: context.ip_address,
                created_at: Utc::now(),
                expires_at: refresh.expires_at,
            })
            .await?;

        let tokens = self.tokens_for(&rec, refresh)?;
        info!(user_id = %rec.user_id, %session_id, "login succeeded");

        Ok(LoginResult {
            user: rec.profile(),
            session_id,
            tokens,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<LoginResult, AuthError> {
        let claims = self.token_codec.verify_refresh_token(refresh_token)?;
        let session_id = claims.session_id;

        let rec = match self.credential_repo.get_by_id(claims.subject_id).await? {
            Some(rec) if rec.is_active() => rec,
            Some(_) => {
                self.session_store.revoke_session(session_id).await?;
                return Err(AuthError::AccountInactive);
            }
            None => {
                self.session_store.revoke_session(session_id).await?;
                return Err(AuthError::UserNotFound);
            }
        };

        let next = self
            .token_codec
            .rotate_refresh_token(rec.user_id, session_id)?;
        let presented_hash = self.token_codec.fingerprint(&claims.token_id)?;
        let next_hash = self.token_codec.fingerprint(&next.token_id)?;

        match self
            .session_store
            .rotate_if_current(session_id, &presented_hash, &next_hash, next.expires_at)
            .await?
        {
            RotateOutcome::Rotated => {}
            RotateOutcome::Stale => {
                warn!(user_id = %rec.user_id, %session_id, "refresh token reuse detected, session revoked");
                return Err(AuthError::TokenInvalid);
            }
            RotateOutcome::Missing => return Err(AuthError::SessionExpired),
        }

        let tokens = self.tokens_for(&rec, next)?;
        debug!(user_id = %rec.user_id, %session_id, "session refreshed");

        Ok(LoginResult {
            user: rec.profile(),
            session_id,
            tokens,
        })
    }

    async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        let Some(token) = refresh_token else {
            return Ok(());
        };
        match self.token_codec.verify_refresh_token(token) {
            Ok(claims) => {
                self.session_store.revoke_session(claims.session_id).await?;
                info!(user_id = %claims.subject_id, session_id = %claims.session_id, "logged out");
            }
            Err(e) => debug!("ignoring refresh token on logout: {}", e),
        }
        Ok(())
    }

    async fn authenticate(&self, access_token: &str) -> Result<AuthContext, AuthError> {
        let claims = self.token_codec.verify_access_token(access_token)?;
        Ok(AuthContext::from(claims))
    }

    async fn current_user(&self, user_id: UserId) -> Result<UserProfile, AuthError> {
        self.credential_repo
            .get_by_id(user_id)
            .await?
            .map(|rec| rec.profile())
            .ok_or(AuthError::UserNotFound)
    }

    async fn change_password(
        &self,
        user_id: UserId,
        request: ChangePasswordInput,
    ) -> Result<(), AuthError> {
        let rec = self
            .credential_repo
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let ok = self
            .credential_hasher
            .verify_password(&request.current_password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }
        validate_password(&request.new_password)?;

        let hash = self
            .credential_hasher
            .hash_password(&request.new_password)
            .await?;
        self.credential_repo
            .update_password_hash(user_id, &hash)
            .await?;
        self.session_store.revoke_user_sessions(user_id).await?;

        info!(%user_id, "password changed, sessions revoked");
        Ok(())
    }

    async fn register(&self, request: RegisterInput) -> Result<UserProfile, AuthError> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;
        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(AuthError::InvalidInput("name must not be empty".to_string()));
        }

        let role_name = request.role.unwrap_or_else(|| DEFAULT_ROLE.to_string());
        if role_definition(&role_name).is_none() {
            return Err(AuthError::UnknownRole(role_name));
        }
        validate_password(&request.password)?;

        if self.credential_repo.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserExists);
        }

        let password_hash = self.credential_hasher.hash_password(&request.password).await?;
        let rec = self
            .credential_repo
            .create(NewCredential {
                user_id: UserId::new(),
                email,
                first_name,
                last_name,
                password_hash,
                role_name: RoleName(role_name),
            })
            .await?;

        info!(user_id = %rec.user_id, role = %rec.role_name, "user registered");
        Ok(rec.profile())
    }
}
