mod cookie;
mod error;
mod filter;
mod handler;
mod router;

#[cfg(test)]
mod tests;

pub use cookie::*;
pub use error::{ApiError, ApiErrorCode, MaintenanceBlocked, recover_error};
pub use filter::{with_auth, with_maintenance, with_permissions};
pub use handler::ApiResponse;
pub use router::routes;

use crate::server::Server;
use std::sync::Arc;
use warp::Filter;

/// All v1 routes under `/api/v1`, with rejections turned into JSON envelopes.
pub fn api(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone {
    warp::path("api")
        .and(warp::path("v1"))
        .and(routes(server))
        .recover(recover_error)
}
