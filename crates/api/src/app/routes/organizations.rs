use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

use tritiq_auth::{
    NewUser, Role, User, check_password_policy, generate_temporary_password, hash_password,
    require_admin, require_super_admin, validate_organization_access,
};
use tritiq_core::OrganizationId;
use tritiq_infra::EmailNotification;
use tritiq_observability::audit::{AuditAction, AuditEvent, record};
use tritiq_organizations::{NewOrganization, Organization, OrganizationUpdate, validate_subdomain};

use crate::app::dto::{self, MessageResponse, UserResponse};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::authz::{self, ORGANIZATION_READ};
use crate::context::{PrincipalContext, TenantContext};

pub fn public() -> Router {
    Router::new().route("/subdomain/:subdomain", get(get_by_subdomain))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_organization).get(list_organizations))
        .route("/license/create", post(create_license))
        .route("/current", get(current_organization))
        .route("/reset-data", post(reset_data))
        .route(
            "/:id",
            get(get_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
        .route("/:id/users", get(list_organization_users))
}

/// Reject names and emails already used anywhere on the platform.
async fn ensure_unique(services: &AppServices, name: &str, admin_email: &str) -> ApiResult<()> {
    if services.organization_name_taken(name, None).await? {
        return Err(ApiError::bad_request("Organization name already exists"));
    }
    if services.email_in_use(admin_email, None).await?
        || services.username_in_use(admin_email, None).await?
    {
        return Err(ApiError::bad_request("Email already exists in the system"));
    }
    Ok(())
}

async fn store_new_tenant(
    services: &AppServices,
    principal: &PrincipalContext,
    organization: &Organization,
    admin: &User,
) -> ApiResult<()> {
    services
        .organizations
        .upsert(organization.id, organization.clone())
        .await?;
    services.save_user(admin, None).await?;
    record(
        AuditAction::OrganizationCreated,
        AuditEvent::default()
            .organization(organization.id)
            .subject(&organization.subdomain),
    );
    record(
        AuditAction::UserCreated,
        AuditEvent::default()
            .organization(organization.id)
            .subject(&admin.email),
    );
    Ok(())
}

/// Provision a trial organization with an admin on a temporary password.
pub async fn create_license(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::LicenseRequest>,
) -> ApiResult<(StatusCode, Json<dto::LicenseResponse>)> {
    require_super_admin(&principal)?;
    let now = Utc::now();
    let name = body.organization_name.trim().to_string();
    let _unique = services.claim_unique().await;
    ensure_unique(&services, &name, &body.superadmin_email).await?;

    let subdomain = services.free_subdomain(&name).await?;
    let profile = NewOrganization {
        name: name.clone(),
        primary_email: body.superadmin_email.clone(),
        primary_phone: body.primary_phone,
        address1: body.address,
        city: body.city,
        state: body.state,
        country: body.country,
        pin_code: body.pin_code,
        ..NewOrganization::default()
    };
    let organization = Organization::create(profile, subdomain, now)?;

    let temp_password = generate_temporary_password();
    let admin_email = tritiq_auth::normalize_email(&body.superadmin_email);
    let mut admin = User::create(
        organization.id,
        NewUser {
            email: admin_email.clone(),
            username: admin_email.clone(),
            password: temp_password.clone(),
            full_name: Some(format!("{} Administrator", organization.name)),
            role: Role::OrgAdmin,
            department: None,
            designation: None,
            employee_id: None,
            phone: None,
        },
        hash_password(&temp_password)?,
        now,
    )?;
    admin.must_change_password = true;

    store_new_tenant(&services, &principal, &organization, &admin).await?;
    services
        .outbox
        .queue(EmailNotification::new(
            Some(organization.id),
            &admin.email,
            format!("Your {} license is ready", organization.name),
            format!(
                "Organization: {}\nSubdomain: {}\nLogin email: {}\nTemporary password: {}\n\
                 You will be asked to change this password after signing in.",
                organization.name, organization.subdomain, admin.email, temp_password
            ),
            now,
        ))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(dto::LicenseResponse {
            message: "Organization license created successfully".to_string(),
            organization_id: organization.id,
            organization_name: organization.name,
            subdomain: organization.subdomain,
            superadmin_email: admin.email,
            temp_password,
        }),
    ))
}

pub async fn create_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateOrganizationRequest>,
) -> ApiResult<(StatusCode, Json<Organization>)> {
    require_super_admin(&principal)?;
    let now = Utc::now();

    let subdomain = validate_subdomain(&body.subdomain).map_err(ApiError::bad_request)?;
    let _unique = services.claim_unique().await;
    if services.organization_by_subdomain(&subdomain).await?.is_some() {
        return Err(ApiError::bad_request("Subdomain already exists"));
    }
    ensure_unique(&services, body.profile.name.trim(), &body.admin_email).await?;
    if let Some(username) = &body.admin_username {
        if services.username_in_use(username, None).await? {
            return Err(ApiError::bad_request("Username already taken"));
        }
    }
    check_password_policy(&body.admin_password)?;

    let organization = Organization::create(body.profile, subdomain, now)?;
    let admin_email = tritiq_auth::normalize_email(&body.admin_email);
    let admin = User::create(
        organization.id,
        NewUser {
            username: body.admin_username.unwrap_or_else(|| admin_email.clone()),
            email: admin_email,
            password: body.admin_password.clone(),
            full_name: body.admin_full_name,
            role: Role::OrgAdmin,
            department: None,
            designation: None,
            employee_id: None,
            phone: None,
        },
        hash_password(&body.admin_password)?,
        now,
    )?;

    store_new_tenant(&services, &principal, &organization, &admin).await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

pub async fn list_organizations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::OrganizationListQuery>,
) -> ApiResult<Json<Vec<Organization>>> {
    require_super_admin(&principal)?;
    let all: Vec<Organization> = services
        .organizations
        .list()
        .await?
        .into_iter()
        .filter(|o| query.status.is_none_or(|s| o.status == s))
        .collect();
    Ok(Json(query.page().apply(all)))
}

pub async fn current_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<Organization>> {
    authz::require(&principal, &ORGANIZATION_READ)?;
    let org = tenant.require(&principal)?;
    Ok(Json(services.organization(org).await?))
}

/// Look up an organization the principal may see.
async fn accessible(
    services: &AppServices,
    principal: &PrincipalContext,
    raw_id: &str,
) -> ApiResult<Organization> {
    let id: OrganizationId = parse_id(raw_id, "organization")?;
    let organization = services.organizations.get(&id).await?;
    validate_organization_access(principal, id, organization.is_some())?;
    organization.ok_or_else(|| ApiError::not_found("Organization not found"))
}

pub async fn get_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Organization>> {
    Ok(Json(accessible(&services, &principal, &id).await?))
}

pub async fn update_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(update): Json<OrganizationUpdate>,
) -> ApiResult<Json<Organization>> {
    let mut organization = accessible(&services, &principal, &id).await?;
    if principal.is_platform() {
        require_super_admin(&principal)?;
    } else {
        require_admin(&principal)?;
        if update.touches_platform_fields() {
            return Err(ApiError::forbidden(
                "Only super admins can change status, plan or user limits",
            ));
        }
    }
    let _unique = services.claim_unique().await;
    if let Some(name) = &update.name {
        if services
            .organization_name_taken(name, Some(organization.id))
            .await?
        {
            return Err(ApiError::bad_request("Organization name already exists"));
        }
    }

    let previous_status = organization.status;
    organization.apply_update(update, Utc::now())?;
    services
        .organizations
        .upsert(organization.id, organization.clone())
        .await?;
    if organization.status != previous_status {
        record(
            AuditAction::OrganizationStatusChanged,
            AuditEvent::default()
                .organization(organization.id)
                .detail(organization.status.as_str()),
        );
    }
    Ok(Json(organization))
}

pub async fn delete_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    require_super_admin(&principal)?;
    let organization = accessible(&services, &principal, &id).await?;
    if services.count_users(organization.id).await? > 0 {
        return Err(ApiError::bad_request(
            "Cannot delete organization with existing users",
        ));
    }
    services.reset_tenant_data(organization.id).await?;
    services.organizations.remove(&organization.id).await?;
    record(
        AuditAction::OrganizationDeleted,
        AuditEvent::default()
            .organization(organization.id),
    );
    Ok(Json(dto::message("Organization deleted successfully")))
}

pub async fn list_organization_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::UserListQuery>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let organization = accessible(&services, &principal, &id).await?;
    if !principal.is_platform() {
        require_admin(&principal)?;
    }
    let users: Vec<UserResponse> = services
        .users
        .list(organization.id)
        .await?
        .iter()
        .filter(|u| !query.active_only || u.is_active)
        .map(UserResponse::from)
        .collect();
    Ok(Json(query.page().apply(users)))
}

/// Public lookup used by tenant login pages.
pub async fn get_by_subdomain(
    Extension(services): Extension<Arc<AppServices>>,
    Path(subdomain): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let organization = services
        .organization_by_subdomain(&subdomain)
        .await?
        .filter(Organization::is_operational)
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;
    Ok(Json(serde_json::json!({
        "id": organization.id,
        "name": organization.name,
        "subdomain": organization.subdomain,
        "status": organization.status,
    })))
}

/// Clear the business data of one organization and reopen company setup.
pub(crate) async fn reset_organization(
    services: &AppServices,
    org: OrganizationId,
) -> ApiResult<BTreeMap<&'static str, u64>> {
    let deleted = services.reset_tenant_data(org).await?;
    if let Some(mut organization) = services.organizations.get(&org).await? {
        organization.mark_company_details(false, Utc::now());
        services.organizations.upsert(org, organization).await?;
    }
    record(AuditAction::DataReset, AuditEvent::default().organization(org));
    Ok(deleted)
}

/// Wipe business data: organization admins reset their own organization,
/// super admins one organization, or all of them with `all=true`.
pub async fn reset_data(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ResetDataQuery>,
) -> ApiResult<Json<dto::ResetDataResponse>> {
    let targets: Vec<OrganizationId> = if principal.is_platform() {
        require_super_admin(&principal)?;
        match query.organization_id.or(tenant.organization_id()) {
            Some(org) => vec![services.organization(org).await?.id],
            None if query.all => services
                .organizations
                .list()
                .await?
                .into_iter()
                .map(|o| o.id)
                .collect(),
            None => {
                return Err(ApiError::bad_request(
                    "Specify organization_id, or set all=true to reset every organization",
                ));
            }
        }
    } else {
        require_admin(&principal)?;
        vec![tenant.require(&principal)?]
    };
    if !query.confirm {
        return Err(ApiError::bad_request(dto::RESET_CONFIRMATION_REQUIRED));
    }

    let mut deleted: BTreeMap<&'static str, u64> = BTreeMap::new();
    for org in &targets {
        for (collection, count) in reset_organization(&services, *org).await? {
            *deleted.entry(collection).or_default() += count;
        }
    }

    Ok(Json(dto::ResetDataResponse {
        message: "Organization data reset successfully".to_string(),
        organizations_reset: targets.len(),
        deleted,
    }))
}
