//! HTTP application wiring.
//!
//! - `services.rs`: stores, token codec, outbox and account directory
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: `{"detail"}` error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::{Path, Request, State},
    http::Uri,
    response::{IntoResponse, Response},
    routing::{any, get},
};
use tower::ServiceExt;

use tritiq_core::OrganizationId;

use crate::config::Settings;
use crate::middleware::{self, OrgPathHint};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use errors::ApiError;
use services::AppServices;

/// Build services from settings, seed the platform admin and return the
/// full router (entrypoint used by `main.rs`).
pub async fn build_app(settings: &Settings) -> anyhow::Result<Router> {
    let services = Arc::new(AppServices::build(settings).await?);
    if let Some(admin) = &settings.bootstrap_admin {
        services.bootstrap_platform_admin(admin).await?;
    }
    Ok(router(services, &settings.api_prefix))
}

/// Router over existing services.
///
/// Tenant routes are also reachable as `{prefix}/org/{organization_id}/...`,
/// which selects the organization like the `X-Organization-ID` header.
pub fn router(services: Arc<AppServices>, api_prefix: &str) -> Router {
    let auth_state = middleware::AuthState {
        services: services.clone(),
    };

    // Protected routes: require a bearer token; tenant resolved per request.
    let protected = routes::protected().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));
    let api = routes::public().merge(protected);

    let inner = Router::new()
        .route("/", get(routes::system::root))
        .route("/health", get(routes::system::health))
        .nest(api_prefix, api)
        .fallback(not_found)
        .layer(Extension(services));

    let scoped = OrgScoped {
        router: inner.clone(),
        prefix: api_prefix.to_string(),
    };
    inner.route(
        &format!("{api_prefix}/org/:organization_id/*rest"),
        any(forward_org_scoped).with_state(scoped),
    )
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

#[derive(Clone)]
struct OrgScoped {
    router: Router,
    prefix: String,
}

/// Re-dispatch `{prefix}/org/{id}/{rest}` as `{prefix}/{rest}` with the
/// organization attached as a hint for the auth middleware.
async fn forward_org_scoped(
    State(scoped): State<OrgScoped>,
    Path((organization_id, rest)): Path<(String, String)>,
    mut req: Request,
) -> Response {
    let Ok(organization_id) = organization_id.parse::<OrganizationId>() else {
        return ApiError::bad_request("Invalid organization ID").into_response();
    };
    let query = req
        .uri()
        .query()
        .map(|q| format!("?{q}"))
        .unwrap_or_default();
    let target = format!("{}/{}{}", scoped.prefix, rest.trim_start_matches('/'), query);
    let Ok(uri) = target.parse::<Uri>() else {
        return ApiError::not_found("Not Found").into_response();
    };

    *req.uri_mut() = uri;
    req.extensions_mut().insert(OrgPathHint(organization_id));
    match scoped.router.oneshot(req).await {
        Ok(res) => res,
        Err(never) => match never {},
    }
}
