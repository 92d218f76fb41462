use super::cookie::CookiePolicy;
use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::header::{HeaderValue, SET_COOKIE};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{self, Reply, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// `with_header` would overwrite, so each cookie is appended.
fn with_cookies(reply: impl Reply, cookies: impl IntoIterator<Item = String>) -> Response {
    let mut response = reply.into_response();
    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!("dropping unrepresentable cookie header: {}", e),
        }
    }
    response
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(HealthResponse { status: "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// First hop of `X-Forwarded-For` when present, else the peer address.
fn client_ip(forwarded_for: Option<String>, remote: Option<SocketAddr>) -> Option<String> {
    forwarded_for
        .as_deref()
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
}

pub async fn login(
    body: LoginRequest,
    user_agent: Option<String>,
    forwarded_for: Option<String>,
    remote: Option<SocketAddr>,
    auth_service: Arc<dyn AuthService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<Response, warp::Rejection> {
    let session = SessionContext {
        user_agent,
        ip_address: client_ip(forwarded_for, remote),
    };
    let login_input = LoginInput {
        email: body.email,
        password: body.password,
    };
    let login_result = auth_service
        .login(login_input, session)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let cookies = cookie_policy.session_cookies(&login_result.tokens);
    let login_response = LoginResponse {
        user: login_result.user,
        access_token_expires_at: login_result.tokens.access_token_expires_at,
        refresh_token_expires_at: login_result.tokens.refresh_token_expires_at,
    };
    Ok(with_cookies(
        warp::reply::json(&ApiResponse::ok(login_response)),
        cookies,
    ))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub user: UserProfile,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

pub async fn refresh(
    refresh_cookie: Option<String>,
    auth_service: Arc<dyn AuthService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<Response, warp::Rejection> {
    let refresh_token = refresh_cookie
        .filter(|t| !t.is_empty())
        .ok_or(ApiErrorCode::Unauthenticated)
        .map_err(reject::custom)?;

    let refreshed = auth_service
        .refresh(&refresh_token)
        .await
        .map_err(AuthError::into_unauthenticated)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let cookies = cookie_policy.session_cookies(&refreshed.tokens);
    let response = RefreshResponse {
        user: refreshed.user,
        access_token_expires_at: refreshed.tokens.access_token_expires_at,
        refresh_token_expires_at: refreshed.tokens.refresh_token_expires_at,
    };
    Ok(with_cookies(
        warp::reply::json(&ApiResponse::ok(response)),
        cookies,
    ))
}

/// Always clears both cookies. A failure to revoke server-side is logged only.
pub async fn logout(
    refresh_cookie: Option<String>,
    auth_service: Arc<dyn AuthService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<Response, warp::Rejection> {
    if let Err(e) = auth_service
        .logout(refresh_cookie.as_deref().filter(|t| !t.is_empty()))
        .await
    {
        warn!("logout could not revoke session: {}", e);
    }
    Ok(with_cookies(
        warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT),
        cookie_policy.cleared_cookies(),
    ))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserProfile,
}

pub async fn me(
    ctx: AuthContext,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = auth_service
        .current_user(ctx.user_id)
        .await
        .map_err(AuthError::into_unauthenticated)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(warp::reply::json(&ApiResponse::ok(MeResponse { user })))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Every session of the user is revoked, so the caller's cookies go too.
pub async fn change_password(
    ctx: AuthContext,
    body: ChangePasswordRequest,
    auth_service: Arc<dyn AuthService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<Response, warp::Rejection> {
    let input = ChangePasswordInput {
        current_password: body.current_password,
        new_password: body.new_password,
    };
    auth_service
        .change_password(ctx.user_id, input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(with_cookies(
        warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT),
        cookie_policy.cleared_cookies(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
}

pub async fn register(
    ctx: AuthContext,
    body: RegisterRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = RegisterInput {
        email: body.email,
        password: body.password,
        first_name: body.first_name,
        last_name: body.last_name,
        role: body.role,
    };
    let user = auth_service
        .register(input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    info!(created_by = %ctx.user_id, user_id = %user.id, "user registered");

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::ok(user)),
        StatusCode::CREATED,
    ))
}

#[derive(Debug, Serialize)]
pub struct MaintenanceStatus {
    pub maintenance_enabled: bool,
    pub maintenance_message: String,
    pub maintenance_scheduled_at: Option<DateTime<Utc>>,
}

impl From<SystemSettings> for MaintenanceStatus {
    fn from(settings: SystemSettings) -> Self {
        MaintenanceStatus {
            maintenance_enabled: settings.maintenance_enabled,
            maintenance_message: settings.effective_message().to_string(),
            maintenance_scheduled_at: settings.maintenance_scheduled_at,
        }
    }
}

pub async fn maintenance_status(
    settings_service: Arc<dyn SettingsService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let settings = settings_service
        .get_settings()
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(warp::reply::json(&ApiResponse::ok(MaintenanceStatus::from(
        settings,
    ))))
}

pub async fn update_maintenance(
    ctx: AuthContext,
    body: MaintenanceUpdate,
    settings_service: Arc<dyn SettingsService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let enabled = body.maintenance_enabled;
    let settings = settings_service
        .update_maintenance(body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    info!(user_id = %ctx.user_id, enabled, "maintenance mode updated");

    Ok(warp::reply::json(&ApiResponse::ok(MaintenanceStatus::from(
        settings,
    ))))
}
