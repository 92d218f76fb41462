use super::cookie::ACCESS_TOKEN_COOKIE;
use super::error::*;
use crate::application_impl::{GateDecision, check_maintenance};
use crate::application_port::*;
use crate::domain_model::PermissionCode;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, Rejection, http, reject};

pub fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Bearer header first, then the access-token cookie.
fn access_token() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_str())
        .and(warp::cookie::optional::<String>(ACCESS_TOKEN_COOKIE))
        .map(|header: Option<String>, cookie: Option<String>| {
            header
                .as_deref()
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .or(cookie.filter(|c| !c.is_empty()))
        })
}

/// Resolves the caller or rejects with `Unauthenticated`. Expired and
/// tampered tokens are indistinguishable to the client.
pub fn with_auth(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (AuthContext,), Error = Rejection> + Clone {
    access_token().and_then(move |token: Option<String>| {
        let auth_service = auth_service.clone();
        async move {
            let Some(token) = token else {
                return Err(reject::custom(ApiErrorCode::Unauthenticated));
            };
            auth_service
                .authenticate(&token)
                .await
                .map_err(AuthError::into_unauthenticated)
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)
        }
    })
}

/// Passes the caller through unless maintenance mode is on and the caller is
/// not an administrator.
pub fn with_maintenance<F>(
    authenticated: F,
    settings_service: Arc<dyn SettingsService>,
) -> impl Filter<Extract = (AuthContext,), Error = Rejection> + Clone
where
    F: Filter<Extract = (AuthContext,), Error = Rejection> + Clone,
{
    authenticated
        .and(with(settings_service))
        .and_then(
            |ctx: AuthContext, settings_service: Arc<dyn SettingsService>| async move {
                match check_maintenance(settings_service.as_ref(), Some(&ctx)).await {
                    GateDecision::Pass => Ok(ctx),
                    GateDecision::Blocked(notice) => Err(reject::custom(MaintenanceBlocked(notice))),
                }
            },
        )
}

/// Rejects with `Forbidden` unless the caller holds every code in `required`.
pub fn with_permissions<F>(
    authenticated: F,
    required: &'static [PermissionCode],
) -> impl Filter<Extract = (AuthContext,), Error = Rejection> + Clone
where
    F: Filter<Extract = (AuthContext,), Error = Rejection> + Clone,
{
    authenticated.and_then(move |ctx: AuthContext| async move {
        ctx.require_permissions(required)
            .map(|()| ctx)
            .map_err(ApiErrorCode::from)
            .map_err(reject::custom)
    })
}
