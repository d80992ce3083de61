use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    routing::{get, post},
};
use chrono::Utc;

use tritiq_auth::{UserType, require_platform};
use tritiq_core::PlatformUserId;
use tritiq_observability::audit::{AuditAction, AuditEvent, record};

use crate::app::dto::{self, LoginResponse, MessageResponse, PlatformUserResponse};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::auth::{ACCOUNT_LOCKED, Attempt, attempt, login_failed};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn public() -> Router {
    Router::new().route("/login", post(login))
}

pub fn router() -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let now = Utc::now();
    let Some(mut account) = services.find_platform_user_by_email(&body.username).await? else {
        return Err(login_failed(&body.username, "unknown platform account"));
    };

    let first_login = match attempt(
        &services,
        &mut account.login,
        &account.password_hash,
        &body.password,
        now,
    ) {
        Attempt::Locked => return Err(ApiError::unauthorized(ACCOUNT_LOCKED)),
        Attempt::Rejected { locked_now } => {
            services.platform_users.upsert(account.id, account.clone()).await?;
            if locked_now {
                record(
                    AuditAction::AccountLocked,
                    AuditEvent::default().subject(&account.email),
                );
            }
            return Err(login_failed(&body.username, "wrong password"));
        }
        Attempt::Accepted { first_login } => first_login,
    };
    if !account.is_active {
        return Err(ApiError::unauthorized("User account is inactive"));
    }

    services.platform_users.upsert(account.id, account.clone()).await?;
    record(
        AuditAction::LoginSucceeded,
        AuditEvent::default().subject(&account.email).detail("platform"),
    );

    let principal = services.platform_principal(&account);
    let access_token = services.issue_token(*account.id.as_uuid(), &account.email, None, principal.role)?;
    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        user_type: UserType::Platform,
        organization_id: None,
        organization_name: None,
        user_role: principal.role,
        must_change_password: false,
        force_password_reset: account.force_password_reset,
        company_details_completed: true,
        is_first_login: first_login,
    }))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<PlatformUserResponse>> {
    require_platform(&principal)?;
    let id = PlatformUserId::from_uuid(principal.account_uuid());
    let account = services
        .platform_users
        .get(&id)
        .await?
        .ok_or_else(ApiError::invalid_credentials)?;
    let mut response = PlatformUserResponse::from(&account);
    response.role = principal.role;
    Ok(Json(response))
}

pub async fn logout(
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<MessageResponse>> {
    require_platform(&principal)?;
    Ok(Json(dto::message("Successfully logged out")))
}
