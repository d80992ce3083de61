use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;

use tritiq_auth::{
    NewUser, User, UserUpdate, check_password_policy, ensure_can_assign_role, hash_password,
    require_admin,
};
use tritiq_core::UserId;
use tritiq_observability::audit::{AuditAction, AuditEvent, record};

use crate::app::dto::{self, MessageResponse, UserResponse};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::parse_id;
use crate::app::services::{AppServices, found};
use crate::authz::require_admin_or_self;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(me))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::UserListQuery>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    require_admin(&principal)?;
    let org = tenant.require(&principal)?;
    let users: Vec<UserResponse> = services
        .users
        .list(org)
        .await?
        .iter()
        .filter(|u| !query.active_only || u.is_active)
        .map(UserResponse::from)
        .collect();
    Ok(Json(query.page().apply(users)))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<UserResponse>> {
    let (Some(org), Some(id)) = (principal.organization_id(), principal.user_id()) else {
        return Err(ApiError::bad_request("Platform accounts have no organization profile"));
    };
    let user = services
        .users
        .get(org, &id)
        .await?
        .ok_or_else(ApiError::invalid_credentials)?;
    Ok(Json(UserResponse::from(&user)))
}

async fn load(
    services: &AppServices,
    tenant: &TenantContext,
    principal: &PrincipalContext,
    raw_id: &str,
) -> ApiResult<User> {
    let org = tenant.require(principal)?;
    let id: UserId = parse_id(raw_id, "user")?;
    found(services.users.get(org, &id).await?, org, "User")
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let user = load(&services, &tenant, &principal, &id).await?;
    require_admin_or_self(&principal, user.id)?;
    Ok(Json(UserResponse::from(&user)))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    require_admin(&principal)?;
    ensure_can_assign_role(&principal, body.role)?;
    let org = tenant.require(&principal)?;
    let organization = services.organization(org).await?;

    let _unique = services.claim_unique().await;
    if services.email_in_use(&body.email, None).await? {
        return Err(ApiError::bad_request("Email already registered"));
    }
    if services.username_in_use(&body.username, None).await? {
        return Err(ApiError::bad_request("Username already taken"));
    }
    if services.count_users(org).await? >= organization.max_users as usize {
        return Err(ApiError::bad_request(format!(
            "Maximum number of users ({}) reached for this organization",
            organization.max_users
        )));
    }
    check_password_policy(&body.password)?;

    let hash = hash_password(&body.password)?;
    let user = User::create(org, body, hash, Utc::now())?;
    services.save_user(&user, None).await?;
    record(
        AuditAction::UserCreated,
        AuditEvent::default().subject(&user.email),
    );
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Admins edit anything; users edit only their own identity fields.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Json<UserResponse>> {
    let previous = load(&services, &tenant, &principal, &id).await?;
    require_admin_or_self(&principal, previous.id)?;
    if !principal.is_admin() && update.touches_admin_fields() {
        return Err(ApiError::forbidden("Cannot update administrative fields"));
    }
    if let Some(role) = update.role {
        ensure_can_assign_role(&principal, role)?;
    }
    let _unique = services.claim_unique().await;
    if let Some(email) = &update.email {
        if services.email_in_use(email, Some(previous.id)).await? {
            return Err(ApiError::bad_request("Email already registered"));
        }
    }
    if let Some(username) = &update.username {
        if services.username_in_use(username, Some(previous.id)).await? {
            return Err(ApiError::bad_request("Username already taken"));
        }
    }

    let mut user = previous.clone();
    user.apply_update(update, Utc::now())?;
    services.save_user(&user, Some(&previous)).await?;
    Ok(Json(UserResponse::from(&user)))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    require_admin(&principal)?;
    let user = load(&services, &tenant, &principal, &id).await?;
    if principal.user_id() == Some(user.id) {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }
    services.delete_user(&user).await?;
    record(
        AuditAction::UserDeleted,
        AuditEvent::default()
            .organization(user.organization_id)
            .subject(&user.email),
    );
    Ok(Json(dto::message("User deleted successfully")))
}
