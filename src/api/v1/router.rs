use super::cookie::REFRESH_TOKEN_COOKIE;
use super::filter::*;
use super::handler;
use crate::domain_model::PermissionCode;
use crate::server::Server;
use std::sync::Arc;
use warp::Filter;

const USERS_WRITE: &[PermissionCode] = &[PermissionCode::UsersWrite];
const SYSTEM_SETTINGS: &[PermissionCode] = &[PermissionCode::SystemSettings];

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Paths are matched before methods, and authentication before the body is parsed.
pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let authenticated = with_auth(server.auth_service.clone());
    let gated = with_maintenance(authenticated.clone(), server.settings_service.clone());

    let health = warp::path!("health")
        .and(warp::get())
        .and_then(handler::health);

    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(warp::header::optional::<String>("user-agent"))
        .and(warp::header::optional::<String>("x-forwarded-for"))
        .and(warp::addr::remote())
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_policy.clone()))
        .and_then(handler::login);

    let refresh = warp::path!("auth" / "refresh")
        .and(warp::post())
        .and(warp::cookie::optional::<String>(REFRESH_TOKEN_COOKIE))
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_policy.clone()))
        .and_then(handler::refresh);

    let logout = warp::path!("auth" / "logout")
        .and(warp::post())
        .and(warp::cookie::optional::<String>(REFRESH_TOKEN_COOKIE))
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_policy.clone()))
        .and_then(handler::logout);

    let me = warp::path!("auth" / "me")
        .and(warp::get())
        .and(gated.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::me);

    let change_password = warp::path!("auth" / "password")
        .and(warp::patch())
        .and(gated.clone())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_policy.clone()))
        .and_then(handler::change_password);

    let register = warp::path!("auth" / "register")
        .and(warp::post())
        .and(with_permissions(gated.clone(), USERS_WRITE))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let maintenance_status = warp::path!("settings" / "maintenance")
        .and(warp::get())
        .and(with(server.settings_service.clone()))
        .and_then(handler::maintenance_status);

    let update_maintenance = warp::path!("settings" / "maintenance")
        .and(warp::put())
        .and(with_permissions(authenticated, SYSTEM_SETTINGS))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(server.settings_service.clone()))
        .and_then(handler::update_maintenance);

    health
        .or(login)
        .or(refresh)
        .or(logout)
        .or(me)
        .or(change_password)
        .or(register)
        .or(maintenance_status)
        .or(update_maintenance)
}
