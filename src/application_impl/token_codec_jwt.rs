use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, KeyInit, Mac};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;

/// Access and refresh tokens are signed with distinct secrets and share the
/// issuer/audience binding.
#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessClaims {
    sub: String,
    role_id: String,
    role_name: String,
    permissions: Vec<PermissionCode>,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshClaims {
    sub: String,
    session_id: String,
    jti: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
}

fn sign<T: Serialize>(claims: &T, secret: &[u8]) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))
}

fn validation(cfg: &JwtConfig) -> Validation {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    v.leeway = 0;
    v.set_audience(&[cfg.audience.as_str()]);
    v.set_issuer(&[cfg.issuer.as_str()]);
    v.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
    v
}

fn verify<T: for<'de> Deserialize<'de>>(
    token: &str,
    secret: &[u8],
    cfg: &JwtConfig,
) -> Result<T, AuthError> {
    let data = decode::<T>(token, &DecodingKey::from_secret(secret), &validation(cfg)).map_err(
        |e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        },
    )?;
    Ok(data.claims)
}

/// `issued_at + ttl`, or an error when the sum is past the representable range.
pub fn expiry_after(
    issued_at: DateTime<Utc>,
    ttl: Duration,
) -> Result<DateTime<Utc>, AuthError> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| issued_at.checked_add_signed(ttl))
        .ok_or_else(|| AuthError::InternalError(format!("token lifetime out of range: {ttl:?}")))
}

fn encode_access(
    claims: &AccessTokenClaims,
    issued_at: DateTime<Utc>,
    cfg: &JwtConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let exp_dt = expiry_after(issued_at, cfg.access_ttl)?;
    let claims = AccessClaims {
        sub: claims.subject_id.to_string(),
        role_id: claims.role_id.0.clone(),
        role_name: claims.role_name.0.clone(),
        permissions: claims.permissions.iter().copied().collect(),
        exp: exp_dt.timestamp(),
        iat: issued_at.timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
    };
    let token = sign(&claims, &cfg.access_secret)?;
    Ok((token, exp_dt))
}

fn encode_refresh(
    user: UserId,
    session_id: SessionId,
    token_id: TokenId,
    issued_at: DateTime<Utc>,
    cfg: &JwtConfig,
) -> Result<IssuedRefreshToken, AuthError> {
    let exp_dt = expiry_after(issued_at, cfg.refresh_ttl)?;
    let claims = RefreshClaims {
        sub: user.to_string(),
        session_id: session_id.to_string(),
        jti: token_id.to_string(),
        exp: exp_dt.timestamp(),
        iat: issued_at.timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
    };
    let token = sign(&claims, &cfg.refresh_secret)?;
    Ok(IssuedRefreshToken {
        token: RefreshToken(token),
        session_id,
        token_id,
        expires_at: exp_dt,
    })
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.cfg
    }

    /// Mints an access token as if it had been issued at `issued_at`.
    pub fn issue_access_token_at(
        &self,
        claims: &AccessTokenClaims,
        issued_at: DateTime<Utc>,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_access(claims, issued_at, &self.cfg)?;
        Ok((AccessToken(token), exp_dt))
    }

    pub fn issue_refresh_token_at(
        &self,
        user: UserId,
        session: SessionId,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedRefreshToken, AuthError> {
        encode_refresh(user, session, TokenId::new(), issued_at, &self.cfg)
    }

    #[inline]
    fn parse_user_id(sub: &str) -> Result<UserId, AuthError> {
        sub.parse::<UserId>().map_err(|_| AuthError::TokenInvalid)
    }
}

impl TokenCodec for JwtHs256Codec {
    fn issue_access_token(
        &self,
        claims: &AccessTokenClaims,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        self.issue_access_token_at(claims, Utc::now())
    }

    fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let claims: AccessClaims = verify(token, &self.cfg.access_secret, &self.cfg)?;
        Ok(AccessTokenClaims {
            subject_id: Self::parse_user_id(&claims.sub)?,
            role_id: RoleId(claims.role_id),
            role_name: RoleName(claims.role_name),
            permissions: claims.permissions.into_iter().collect(),
        })
    }

    fn issue_refresh_token(&self, user: UserId) -> Result<IssuedRefreshToken, AuthError> {
        self.issue_refresh_token_at(user, SessionId::new(), Utc::now())
    }

    fn rotate_refresh_token(
        &self,
        user: UserId,
        session: SessionId,
    ) -> Result<IssuedRefreshToken, AuthError> {
        self.issue_refresh_token_at(user, session, Utc::now())
    }

    fn verify_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, AuthError> {
        let claims: RefreshClaims = verify(token, &self.cfg.refresh_secret, &self.cfg)?;
        Ok(RefreshTokenClaims {
            subject_id: Self::parse_user_id(&claims.sub)?,
            session_id: claims
                .session_id
                .parse()
                .map_err(|_| AuthError::TokenInvalid)?,
            token_id: claims.jti.parse().map_err(|_| AuthError::TokenInvalid)?,
        })
    }

    fn fingerprint(&self, token_id: &TokenId) -> Result<String, AuthError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.cfg.refresh_secret)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        mac.update(token_id.to_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    pub(crate) fn test_config() -> JwtConfig {
        JwtConfig {
            issuer: "http://localhost:4000".to_string(),
            audience: "http://localhost:5173".to_string(),
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            access_secret: b"access-secret-access-secret-0123456789".to_vec(),
            refresh_secret: b"refresh-secret-refresh-secret-0123456789".to_vec(),
        }
    }

    fn claims() -> AccessTokenClaims {
        AccessTokenClaims {
            subject_id: UserId::new(),
            role_id: RoleId("role-editor".to_string()),
            role_name: RoleName("editor".to_string()),
            permissions: [PermissionCode::ReportsWrite, PermissionCode::ReportsRead]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn access_token_round_trips() {
        let codec = JwtHs256Codec::new(test_config());
        let claims = claims();
        let (token, exp) = codec.issue_access_token(&claims).unwrap();
        assert!(exp > Utc::now());
        assert_eq!(codec.verify_access_token(&token.0).unwrap(), claims);
    }

    #[test]
    fn refresh_token_round_trips() {
        let codec = JwtHs256Codec::new(test_config());
        let user = UserId::new();
        let issued = codec.issue_refresh_token(user).unwrap();
        let claims = codec.verify_refresh_token(&issued.token.0).unwrap();
        assert_eq!(
            claims,
            RefreshTokenClaims {
                subject_id: user,
                session_id: issued.session_id,
                token_id: issued.token_id,
            }
        );
        let expected = Utc::now() + codec.config().refresh_ttl;
        assert!((expected - issued.expires_at).num_seconds().abs() <= 5);
    }

    #[test]
    fn secrets_are_isolated() {
        let codec = JwtHs256Codec::new(test_config());
        let (access, _) = codec.issue_access_token(&claims()).unwrap();
        let refresh = codec.issue_refresh_token(UserId::new()).unwrap();

        assert!(matches!(
            codec.verify_refresh_token(&access.0),
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            codec.verify_access_token(&refresh.token.0),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn issuer_and_audience_are_bound() {
        let codec = JwtHs256Codec::new(test_config());
        let (access, _) = codec.issue_access_token(&claims()).unwrap();
        let refresh = codec.issue_refresh_token(UserId::new()).unwrap();

        let other_issuer = JwtHs256Codec::new(JwtConfig {
            issuer: "https://api.other.example".to_string(),
            ..test_config()
        });
        assert!(matches!(
            other_issuer.verify_access_token(&access.0),
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            other_issuer.verify_refresh_token(&refresh.token.0),
            Err(AuthError::TokenInvalid)
        ));

        let other_audience = JwtHs256Codec::new(JwtConfig {
            audience: "https://app.other.example".to_string(),
            ..test_config()
        });
        assert!(matches!(
            other_audience.verify_access_token(&access.0),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn oversized_lifetimes_fail_instead_of_overflowing() {
        let codec = JwtHs256Codec::new(JwtConfig {
            access_ttl: parse_std_duration("999999999d").unwrap(),
            refresh_ttl: parse_std_duration("999999999d").unwrap(),
            ..test_config()
        });
        assert!(matches!(
            codec.issue_refresh_token(UserId::new()),
            Err(AuthError::InternalError(_))
        ));
        assert!(matches!(
            codec.issue_access_token(&claims()),
            Err(AuthError::InternalError(_))
        ));
    }

    #[test]
    fn expired_tokens_are_reported_distinctly() {
        let codec = JwtHs256Codec::new(test_config());
        let long_ago = Utc::now() - chrono::Duration::hours(1);
        let (access, _) = codec.issue_access_token_at(&claims(), long_ago).unwrap();
        assert!(matches!(
            codec.verify_access_token(&access.0),
            Err(AuthError::TokenExpired)
        ));

        let refresh = codec
            .issue_refresh_token_at(UserId::new(), SessionId::new(), long_ago - chrono::Duration::days(8))
            .unwrap();
        assert!(matches!(
            codec.verify_refresh_token(&refresh.token.0),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let codec = JwtHs256Codec::new(test_config());
        for token in ["", "not-a-jwt", "a.b.c"] {
            assert!(matches!(
                codec.verify_access_token(token),
                Err(AuthError::TokenInvalid)
            ));
        }
    }

    #[test]
    fn refresh_tokens_never_repeat_ids() {
        let codec = JwtHs256Codec::new(test_config());
        let user = UserId::new();
        let mut sessions = HashSet::new();
        let mut jtis = HashSet::new();
        for _ in 0..100 {
            let issued = codec.issue_refresh_token(user).unwrap();
            assert!(sessions.insert(issued.session_id));
            assert!(jtis.insert(issued.token_id));
        }
    }

    #[test]
    fn rotation_keeps_the_session() {
        let codec = JwtHs256Codec::new(test_config());
        let user = UserId::new();
        let first = codec.issue_refresh_token(user).unwrap();
        let second = codec.rotate_refresh_token(user, first.session_id).unwrap();
        assert_eq!(second.session_id, first.session_id);
        assert!(second.token_id != first.token_id);
    }

    #[test]
    fn fingerprint_is_stable_and_keyed() {
        let codec = JwtHs256Codec::new(test_config());
        let jti = TokenId::new();
        let a = codec.fingerprint(&jti).unwrap();
        assert_eq!(a, codec.fingerprint(&jti).unwrap());
        assert_eq!(a.len(), 64);
        assert!(a != codec.fingerprint(&TokenId::new()).unwrap());

        let other = JwtHs256Codec::new(JwtConfig {
            refresh_secret: b"another-refresh-secret-0123456789abcdef".to_vec(),
            ..test_config()
        });
        assert!(a != other.fingerprint(&jti).unwrap());
    }
}
