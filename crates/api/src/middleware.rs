use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::Instrument;

use tritiq_auth::{Principal, require_active, validate_organization_access};
use tritiq_core::OrganizationId;
use tritiq_observability::audit::{AuditAction, AuditEvent, record};
use tritiq_organizations::is_reserved_subdomain;

use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;
use crate::context::{self, PrincipalContext, RequestContext, TenantContext};

pub const ORGANIZATION_HEADER: &str = "x-organization-id";

#[derive(Clone)]
pub struct AuthState {
    pub services: Arc<AppServices>,
}

/// Organization named by an `/org/{id}/...` path, set by the forwarding route.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OrgPathHint(pub OrganizationId);

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> ApiResult<Response> {
    let services = state.services;
    let path_hint = req.extensions().get::<OrgPathHint>().map(|h| h.0);

    let principal = authenticate(&services, req.headers()).await?;
    require_active(&principal)?;

    let hint = match subdomain_hint(&services, req.headers()).await? {
        Some(org) => Some(org),
        None => match header_hint(req.headers())? {
            Some(org) => Some(org),
            None => path_hint,
        },
    };
    let organization_id = effective_organization(&services, &principal, hint).await?;

    tracing::debug!(
        account = %principal.account_uuid(),
        organization_id = ?organization_id,
        "request authenticated"
    );

    let ctx = RequestContext {
        tenant: TenantContext::new(organization_id),
        principal: PrincipalContext::new(principal),
    };
    req.extensions_mut().insert(ctx.tenant);
    req.extensions_mut().insert(ctx.principal.clone());

    let span = tracing::info_span!(
        "request",
        organization_id = ?ctx.tenant.organization_id(),
        user_id = %ctx.principal.account_uuid(),
    );
    Ok(context::scope(ctx, next.run(req)).instrument(span).await)
}

async fn authenticate(services: &AppServices, headers: &HeaderMap) -> ApiResult<Principal> {
    let token = extract_bearer(headers)?;
    let claims = services.tokens.validate(token, Utc::now()).map_err(|e| {
        record(AuditAction::TokenRejected, AuditEvent::default().detail(&e.to_string()));
        ApiError::from(e)
    })?;
    services
        .resolve_principal(&claims)
        .await?
        .ok_or_else(ApiError::invalid_credentials)
}

/// Organization accounts are pinned to their own organization; platform
/// accounts act on whichever existing organization the request names.
async fn effective_organization(
    services: &AppServices,
    principal: &Principal,
    hint: Option<OrganizationId>,
) -> ApiResult<Option<OrganizationId>> {
    let Some(requested) = hint else {
        return Ok(principal.organization_id());
    };
    let exists = if principal.is_platform() {
        services.organizations.get(&requested).await?.is_some()
    } else {
        true
    };
    validate_organization_access(principal, requested, exists).inspect_err(|_| {
        record(
            AuditAction::TenantAccessDenied,
            AuditEvent::default()
                .actor(&principal.email)
                .organization(requested),
        );
    })?;
    Ok(Some(requested))
}

fn extract_bearer(headers: &HeaderMap) -> ApiResult<&str> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let header = header
        .to_str()
        .map_err(|_| ApiError::invalid_credentials())?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(ApiError::invalid_credentials)?
        .trim();
    if token.is_empty() {
        return Err(ApiError::invalid_credentials());
    }

    Ok(token)
}

fn header_hint(headers: &HeaderMap) -> ApiResult<Option<OrganizationId>> {
    let Some(value) = headers.get(ORGANIZATION_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .map(Some)
        .ok_or_else(|| ApiError::bad_request("Invalid organization ID"))
}

/// `acme.example.com` selects the operational organization `acme`.
async fn subdomain_hint(
    services: &AppServices,
    headers: &HeaderMap,
) -> ApiResult<Option<OrganizationId>> {
    let Some(label) = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .and_then(tenant_label)
    else {
        return Ok(None);
    };
    Ok(services
        .organization_by_subdomain(label)
        .await?
        .filter(|o| o.is_operational())
        .map(|o| o.id))
}

fn tenant_label(host: &str) -> Option<&str> {
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    if host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
        return None;
    }
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 3 {
        return None;
    }
    let label = labels[0];
    (!label.is_empty() && !is_reserved_subdomain(label)).then_some(label)
}
