//! Platform settings: organization lifecycle and seat limits.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    routing::{post, put},
};
use chrono::Utc;

use tritiq_auth::{Role, require_super_admin};
use tritiq_core::OrganizationId;
use tritiq_observability::audit::{AuditAction, AuditEvent, record};
use tritiq_organizations::Organization;

use crate::app::dto::{self, MessageResponse};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::{organizations, parse_id};
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/organizations/:id/suspend", post(suspend))
        .route("/organizations/:id/activate", post(activate))
        .route("/organizations/:id/max-users", put(set_max_users))
        .route("/reset/organization", post(reset_current_organization))
        .route("/reset/entity", post(reset_entity))
}

async fn load(
    services: &AppServices,
    principal: &PrincipalContext,
    raw_id: &str,
) -> ApiResult<Organization> {
    require_super_admin(principal)?;
    let id: OrganizationId = parse_id(raw_id, "organization")?;
    services.organization(id).await
}

async fn save_status(services: &AppServices, organization: Organization) -> ApiResult<()> {
    record(
        AuditAction::OrganizationStatusChanged,
        AuditEvent::default()
            .organization(organization.id)
            .detail(organization.status.as_str()),
    );
    services
        .organizations
        .upsert(organization.id, organization)
        .await?;
    Ok(())
}

pub async fn suspend(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let mut organization = load(&services, &principal, &id).await?;
    organization.suspend(Utc::now())?;
    let message = format!("Organization {} suspended", organization.name);
    save_status(&services, organization).await?;
    Ok(Json(dto::message(message)))
}

pub async fn activate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let mut organization = load(&services, &principal, &id).await?;
    organization.activate(Utc::now())?;
    let message = format!("Organization {} activated", organization.name);
    save_status(&services, organization).await?;
    Ok(Json(dto::message(message)))
}

pub async fn set_max_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::MaxUsersRequest>,
) -> ApiResult<Json<Organization>> {
    let mut organization = load(&services, &principal, &id).await?;
    organization.set_max_users(body.max_users, Utc::now())?;
    services
        .organizations
        .upsert(organization.id, organization.clone())
        .await?;
    Ok(Json(organization))
}

/// Reset the organization selected for this request (super admin).
pub async fn reset_current_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ResetConfirmQuery>,
) -> ApiResult<Json<dto::ResetOrganizationResponse>> {
    require_super_admin(&principal)?;
    if !query.confirm {
        return Err(ApiError::bad_request(dto::RESET_CONFIRMATION_REQUIRED));
    }
    let org = tenant.require(&principal)?;
    let organization = services.organization(org).await?;
    let reset_details = organizations::reset_organization(&services, organization.id).await?;
    Ok(Json(dto::ResetOrganizationResponse {
        message: "Organization data reset successfully".to_string(),
        organization_id: organization.id,
        reset_details,
    }))
}

/// Reset one organization by id: super admins any, organization admins their own.
pub async fn reset_entity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ResetEntityQuery>,
) -> ApiResult<Json<dto::ResetEntityResponse>> {
    if !query.confirm {
        return Err(ApiError::bad_request(dto::RESET_CONFIRMATION_REQUIRED));
    }
    let id: OrganizationId = parse_id(&query.entity_id, "organization")?;
    let organization = services.organization(id).await?;
    if principal.is_platform() {
        require_super_admin(&principal)?;
    } else if principal.organization_id() != Some(id) || principal.role != Role::OrgAdmin {
        return Err(ApiError::forbidden("Insufficient permissions"));
    }

    let reset_details = organizations::reset_organization(&services, organization.id).await?;
    Ok(Json(dto::ResetEntityResponse {
        message: "Entity data reset successfully".to_string(),
        entity_id: organization.id,
        organization_name: organization.name,
        reset_details,
    }))
}
