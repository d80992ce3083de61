//! Error responses: every failure renders as `{"detail": "..."}`.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use tritiq_auth::{AuthzError, PasswordError, TokenError};
use tritiq_core::DomainError;
use tritiq_infra::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    /// The generic 401 for any token problem.
    pub fn invalid_credentials() -> Self {
        Self::unauthorized("Could not validate credentials")
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl core::fmt::Display for ApiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.detail)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut res = (self.status, Json(json!({ "detail": self.detail }))).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let status = match &err {
            DomainError::Validation(_)
            | DomainError::InvariantViolation(_)
            | DomainError::InvalidId(_)
            | DomainError::Conflict(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
        };
        Self::new(status, err.detail())
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        let status = match &err {
            AuthzError::Inactive
            | AuthzError::NoOrganization
            | AuthzError::PlatformMustSelectOrganization => StatusCode::BAD_REQUEST,
            AuthzError::OrganizationNotFound => StatusCode::NOT_FOUND,
            AuthzError::AdminRequired
            | AuthzError::PlatformRequired
            | AuthzError::SuperAdminRequired
            | AuthzError::OrganizationDenied(_)
            | AuthzError::Forbidden(_)
            | AuthzError::RoleEscalation(_) => StatusCode::FORBIDDEN,
        };
        Self::new(status, err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "storage failure");
        Self::internal()
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Policy => Self::bad_request(err.to_string()),
            PasswordError::Hash(msg) => {
                tracing::error!(error = %msg, "password hashing failed");
                Self::internal()
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encode(msg) => {
                tracing::error!(error = %msg, "token encoding failed");
                Self::internal()
            }
            _ => Self::invalid_credentials(),
        }
    }
}
