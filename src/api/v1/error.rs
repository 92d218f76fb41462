use crate::api::v1::handler::ApiResponse;
use crate::application_impl::MaintenanceNotice;
use crate::application_port::*;
use crate::logger::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::{Rejection, Reply, reject};

/// Every rejection ends up here. 5xx responses never carry internal detail.
pub async fn recover_error(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(MaintenanceBlocked(notice)) = err.find::<MaintenanceBlocked>() {
        let body = ApiResponse {
            success: false,
            data: Some(notice),
            error: Some(ApiError {
                code: ApiErrorCode::MaintenanceBlocked,
                message: notice.message.clone(),
            }),
        };
        return Ok(warp::reply::with_status(
            warp::reply::json(&body),
            StatusCode::SERVICE_UNAVAILABLE,
        ));
    }

    let code = if let Some(code) = err.find::<ApiErrorCode>() {
        *code
    } else if err.is_not_found() {
        ApiErrorCode::NotFound
    } else if err.find::<BodyDeserializeError>().is_some()
        || err.find::<reject::UnsupportedMediaType>().is_some()
        || err.find::<reject::PayloadTooLarge>().is_some()
        || err.find::<reject::InvalidHeader>().is_some()
    {
        ApiErrorCode::BadRequest
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::MethodNotAllowed
    } else {
        error!("unhandled rejection: {:?}", err);
        ApiErrorCode::InternalError
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code, code.to_string()));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("Account is inactive")]
    AccountInactive,
    #[error("Not found")]
    NotFound,
    #[error("Resource already exists")]
    Conflict,
    #[error("Bad request")]
    BadRequest,
    #[error("Password does not meet the password policy")]
    WeakPassword,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Service under maintenance")]
    MaintenanceBlocked,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        error!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials | ApiErrorCode::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            ApiErrorCode::Forbidden | ApiErrorCode::AccountInactive => StatusCode::FORBIDDEN,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::Conflict => StatusCode::CONFLICT,
            ApiErrorCode::BadRequest | ApiErrorCode::WeakPassword => StatusCode::BAD_REQUEST,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::MaintenanceBlocked => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

/// Rejection raised by the maintenance gate. Carries the notice shown to the caller.
#[derive(Debug)]
pub struct MaintenanceBlocked(pub MaintenanceNotice);

impl reject::Reject for MaintenanceBlocked {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::AccountInactive => ApiErrorCode::AccountInactive,
            AuthError::UserExists => ApiErrorCode::Conflict,
            AuthError::UserNotFound => ApiErrorCode::NotFound,
            AuthError::UnknownRole(role) => {
                debug!("unknown role requested: {}", role);
                ApiErrorCode::BadRequest
            }
            AuthError::WeakPassword(reason) => {
                debug!("password rejected: {}", reason);
                ApiErrorCode::WeakPassword
            }
            AuthError::InvalidInput(reason) => {
                debug!("invalid input: {}", reason);
                ApiErrorCode::BadRequest
            }
            AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::SessionExpired
            | AuthError::Unauthenticated => ApiErrorCode::Unauthenticated,
            AuthError::Forbidden => ApiErrorCode::Forbidden,
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<SettingsError> for ApiErrorCode {
    fn from(error: SettingsError) -> Self {
        match error {
            SettingsError::Invalid(reason) => {
                debug!("invalid settings update: {}", reason);
                ApiErrorCode::BadRequest
            }
            SettingsError::Store(e) => ApiErrorCode::internal(e),
        }
    }
}
