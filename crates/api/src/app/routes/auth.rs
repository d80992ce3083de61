use std::sync::Arc;

use axum::{Extension, Json, Router, routing::post};
use chrono::{DateTime, Utc};

use tritiq_auth::{
    LoginState, OtpPurpose, User, check_password_policy, hash_password, verify_password,
};
use tritiq_infra::EmailNotification;
use tritiq_observability::audit::{AuditAction, AuditEvent, record};
use tritiq_organizations::Organization;

use crate::app::dto::{self, LoginResponse, MessageResponse};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub const INCORRECT_CREDENTIALS: &str = "Incorrect email/username or password";
pub const ACCOUNT_LOCKED: &str =
    "Account is temporarily locked due to too many failed login attempts. Try again later.";

pub fn public() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/login/email", post(login_email))
        .route("/otp/request", post(request_otp))
        .route("/otp/verify", post(verify_otp))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset", post(reset_password))
}

pub fn router() -> Router {
    Router::new()
        .route("/test-token", post(test_token))
        .route("/logout", post(logout))
        .route("/password/change", post(change_password))
}

/// Outcome of checking a password against an account's login state.
pub(crate) enum Attempt {
    Accepted { first_login: bool },
    Locked,
    Rejected { locked_now: bool },
}

/// Apply the lockout policy around a password check, updating `state`.
pub(crate) fn attempt(
    services: &AppServices,
    state: &mut LoginState,
    password_hash: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Attempt {
    if services.lockout.is_locked(state, now) {
        return Attempt::Locked;
    }
    if !verify_password(password, password_hash) {
        let locked_now = services.lockout.record_failure(state, now);
        return Attempt::Rejected { locked_now };
    }
    let first_login = state.is_first_login();
    services.lockout.record_success(state, now);
    Attempt::Accepted { first_login }
}

pub(crate) fn login_failed(identifier: &str, reason: &'static str) -> ApiError {
    record(
        AuditAction::LoginFailed,
        AuditEvent::default().subject(identifier).detail(reason),
    );
    ApiError::unauthorized(INCORRECT_CREDENTIALS)
}

async fn sign_in(
    services: &AppServices,
    user: Option<User>,
    identifier: &str,
    password: &str,
) -> ApiResult<LoginResponse> {
    let Some(mut user) = user else {
        return Err(login_failed(identifier, "unknown account"));
    };
    let now = Utc::now();

    let outcome = attempt(services, &mut user.login, &user.password_hash, password, now);
    let first_login = match outcome {
        Attempt::Locked => {
            return Err(ApiError::unauthorized(ACCOUNT_LOCKED));
        }
        Attempt::Rejected { locked_now } => {
            services
                .users
                .upsert(user.organization_id, user.id, user.clone())
                .await?;
            if locked_now {
                record(
                    AuditAction::AccountLocked,
                    AuditEvent::default()
                        .organization(user.organization_id)
                        .subject(&user.email),
                );
            }
            return Err(login_failed(identifier, "wrong password"));
        }
        Attempt::Accepted { first_login } => first_login,
    };

    if !user.is_active {
        return Err(ApiError::unauthorized("User account is inactive"));
    }
    let organization = services.organization(user.organization_id).await?;
    if !organization.is_operational() {
        return Err(ApiError::unauthorized("Organization is not active"));
    }

    services
        .users
        .upsert(user.organization_id, user.id, user.clone())
        .await?;
    record(
        AuditAction::LoginSucceeded,
        AuditEvent::default()
            .organization(user.organization_id)
            .subject(&user.email),
    );
    user_token(services, &user, &organization, first_login)
}

fn user_token(
    services: &AppServices,
    user: &User,
    organization: &Organization,
    is_first_login: bool,
) -> ApiResult<LoginResponse> {
    let access_token = services.issue_token(
        *user.id.as_uuid(),
        &user.email,
        Some(user.organization_id),
        user.role,
    )?;
    Ok(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        user_type: tritiq_auth::UserType::Organization,
        organization_id: Some(organization.id),
        organization_name: Some(organization.name.clone()),
        user_role: user.role,
        must_change_password: user.must_change_password,
        force_password_reset: user.force_password_reset,
        company_details_completed: organization.company_details_completed,
        is_first_login,
    })
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = services.find_user_by_login(&body.username).await?;
    Ok(Json(sign_in(&services, user, &body.username, &body.password).await?))
}

/// Email login, optionally confined to the organization of `subdomain`.
pub async fn login_email(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::EmailLoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let mut user = services.find_user_by_email(&body.email).await?;
    if let Some(subdomain) = body.subdomain.as_deref().filter(|s| !s.trim().is_empty()) {
        let organization = services.organization_by_subdomain(subdomain).await?;
        let in_org = match (&user, organization) {
            (Some(u), Some(o)) => u.organization_id == o.id,
            _ => false,
        };
        if !in_org {
            user = None;
        }
    }
    Ok(Json(sign_in(&services, user, &body.email, &body.password).await?))
}

pub async fn test_token(
    Extension(principal): Extension<PrincipalContext>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "id": principal.account_uuid(),
        "email": principal.email,
        "role": principal.role,
        "user_type": principal.user_type(),
        "organization_id": principal.organization_id(),
        "is_active": principal.is_active,
    }))
}

pub async fn logout() -> Json<MessageResponse> {
    Json(dto::message("Successfully logged out"))
}

const OTP_SENT: &str = "If the email is registered, an OTP has been sent";

async fn send_otp(
    services: &AppServices,
    purpose: OtpPurpose,
    email: &str,
    subject: &str,
) -> ApiResult<()> {
    let Some(user) = services.find_user_by_email(email).await? else {
        tracing::debug!("otp requested for unknown email");
        return Ok(());
    };
    let now = Utc::now();
    let otp = services.issue_otp(purpose, &user.email, now).await?;
    let body = format!(
        "Your one-time code is {}. It expires in {} minutes.",
        otp.code,
        tritiq_auth::otp::OTP_VALIDITY_MINUTES
    );
    services
        .outbox
        .queue(EmailNotification::new(
            Some(user.organization_id),
            &user.email,
            subject,
            body,
            now,
        ))
        .await?;
    record(
        AuditAction::OtpIssued,
        AuditEvent::default()
            .organization(user.organization_id)
            .subject(&user.email),
    );
    Ok(())
}

pub async fn request_otp(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::OtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    send_otp(&services, OtpPurpose::Login, &body.email, "Your login code").await?;
    Ok(Json(dto::message(OTP_SENT)))
}

/// Passwordless login; the account must choose a new password afterwards.
pub async fn verify_otp(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::OtpVerifyRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let now = Utc::now();
    let invalid = || ApiError::unauthorized("Invalid or expired OTP");
    let Some(mut user) = services.find_user_by_email(&body.email).await? else {
        return Err(invalid());
    };
    if !services
        .verify_otp(OtpPurpose::Login, &user.email, &body.otp, now)
        .await?
    {
        record(
            AuditAction::LoginFailed,
            AuditEvent::default().subject(&user.email).detail("bad otp"),
        );
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::unauthorized("User account is inactive"));
    }
    let organization = services.organization(user.organization_id).await?;
    if !organization.is_operational() {
        return Err(ApiError::unauthorized("Organization is not active"));
    }

    let first_login = user.login.is_first_login();
    services.lockout.record_success(&mut user.login, now);
    user.must_change_password = true;
    services
        .users
        .upsert(user.organization_id, user.id, user.clone())
        .await?;
    record(
        AuditAction::LoginSucceeded,
        AuditEvent::default()
            .organization(user.organization_id)
            .subject(&user.email)
            .detail("otp"),
    );
    Ok(Json(user_token(&services, &user, &organization, first_login)?))
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::PasswordChangeRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let now = Utc::now();
    let current_incorrect = || ApiError::bad_request("Current password is incorrect");

    if principal.is_platform() {
        let id = tritiq_core::PlatformUserId::from_uuid(principal.account_uuid());
        let mut account = services
            .platform_users
            .get(&id)
            .await?
            .ok_or_else(ApiError::invalid_credentials)?;
        if !verify_password(&body.current_password, &account.password_hash) {
            return Err(current_incorrect());
        }
        check_password_policy(&body.new_password)?;
        account.password_hash = hash_password(&body.new_password)?;
        account.force_password_reset = false;
        account.updated_at = Some(now);
        services.platform_users.upsert(account.id, account).await?;
    } else {
        let (Some(org), Some(user_id)) = (principal.organization_id(), principal.user_id()) else {
            return Err(ApiError::invalid_credentials());
        };
        let mut user = services
            .users
            .get(org, &user_id)
            .await?
            .ok_or_else(ApiError::invalid_credentials)?;
        if !verify_password(&body.current_password, &user.password_hash) {
            return Err(current_incorrect());
        }
        check_password_policy(&body.new_password)?;
        user.set_password(hash_password(&body.new_password)?, now);
        services.users.upsert(org, user.id, user).await?;
    }

    record(AuditAction::PasswordChanged, AuditEvent::default());
    Ok(Json(dto::message("Password changed successfully")))
}

pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::OtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    send_otp(&services, OtpPurpose::PasswordReset, &body.email, "Password reset code").await?;
    Ok(Json(dto::message(OTP_SENT)))
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::PasswordResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let now = Utc::now();
    let invalid = || ApiError::bad_request("Invalid or expired OTP");
    let Some(mut user) = services.find_user_by_email(&body.email).await? else {
        return Err(invalid());
    };
    check_password_policy(&body.new_password)?;
    if !services
        .verify_otp(OtpPurpose::PasswordReset, &user.email, &body.otp, now)
        .await?
    {
        return Err(invalid());
    }

    user.set_password(hash_password(&body.new_password)?, now);
    user.login = LoginState {
        last_login: user.login.last_login,
        ..LoginState::default()
    };
    services
        .users
        .upsert(user.organization_id, user.id, user.clone())
        .await?;
    record(
        AuditAction::PasswordReset,
        AuditEvent::default()
            .organization(user.organization_id)
            .subject(&user.email),
    );
    Ok(Json(dto::message("Password has been reset successfully")))
}
