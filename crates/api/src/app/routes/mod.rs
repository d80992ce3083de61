use axum::Router;

use crate::app::errors::{ApiError, ApiResult};

pub mod auth;
pub mod companies;
pub mod organizations;
pub mod parties;
pub mod platform;
pub mod products;
pub mod settings;
pub mod stock;
pub mod system;
pub mod users;
pub mod vouchers;

/// Endpoints under the API prefix reachable without a bearer token.
pub fn public() -> Router {
    Router::new()
        .nest("/auth", auth::public())
        .nest("/platform", platform::public())
        .nest("/organizations", organizations::public())
}

/// Authenticated endpoints; the auth middleware is layered on by the caller.
pub fn protected() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/platform", platform::router())
        .nest("/organizations", organizations::router())
        .nest("/settings", settings::router())
        .nest("/users", users::router())
        .nest("/companies", companies::router())
        .nest("/vendors", parties::vendors())
        .nest("/customers", parties::customers())
        .nest("/products", products::router())
        .nest("/stock", stock::router())
        .nest("/vouchers", vouchers::router())
}

/// Parse a path identifier; malformed ids are a client error.
pub(crate) fn parse_id<T: core::str::FromStr>(raw: &str, what: &str) -> ApiResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid {what} ID")))
}
