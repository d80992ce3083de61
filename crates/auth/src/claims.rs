use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use tritiq_core::OrganizationId;

use crate::Role;

/// Which account table the token subject lives in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Platform,
    Organization,
}

/// Bearer token claims.
///
/// Platform accounts carry no `organization_id`; organization accounts
/// always do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account identifier (a `UserId` or `PlatformUserId`).
    pub sub: Uuid,

    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,

    pub user_type: UserType,

    pub role: Role,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,
}

impl Claims {
    pub fn new(
        sub: Uuid,
        email: impl Into<String>,
        organization_id: Option<OrganizationId>,
        role: Role,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let user_type = if organization_id.is_some() {
            UserType::Organization
        } else {
            UserType::Platform
        };
        // Whole seconds, so the claims survive the numeric encoding unchanged.
        let iat = DateTime::from_timestamp(issued_at.timestamp(), 0).unwrap_or(issued_at);
        Self {
            sub,
            email: email.into(),
            organization_id,
            user_type,
            role,
            iat,
            exp: iat + ttl,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("user_type does not match organization_id")]
    InconsistentAccount,
}

/// Deterministically validate token claims.
///
/// Signature verification happens in [`crate::token`]; this only checks the
/// time window and the account shape.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    match (claims.user_type, claims.organization_id) {
        (UserType::Platform, None) | (UserType::Organization, Some(_)) => Ok(()),
        _ => Err(TokenValidationError::InconsistentAccount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn claims(org: Option<OrganizationId>) -> Claims {
        Claims::new(
            Uuid::now_v7(),
            "a@example.com",
            org,
            Role::StandardUser,
            at(1_000),
            Duration::minutes(30),
        )
    }

    #[test]
    fn user_type_follows_organization() {
        assert_eq!(claims(None).user_type, UserType::Platform);
        assert_eq!(
            claims(Some(OrganizationId::new())).user_type,
            UserType::Organization
        );
    }

    #[test]
    fn time_window_is_enforced() {
        let c = claims(Some(OrganizationId::new()));
        assert_eq!(validate_claims(&c, at(999)), Err(TokenValidationError::NotYetValid));
        assert!(validate_claims(&c, at(1_000)).is_ok());
        assert_eq!(
            validate_claims(&c, at(1_000 + 30 * 60)),
            Err(TokenValidationError::Expired)
        );

        let mut broken = c.clone();
        broken.exp = broken.iat;
        assert_eq!(
            validate_claims(&broken, at(1_000)),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn organization_token_without_org_is_rejected() {
        let mut c = claims(Some(OrganizationId::new()));
        c.organization_id = None;
        assert_eq!(
            validate_claims(&c, at(1_001)),
            Err(TokenValidationError::InconsistentAccount)
        );
    }

    #[test]
    fn timestamps_serialize_as_seconds() {
        let c = claims(None);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["iat"], 1_000);
        assert_eq!(json["exp"], 1_000 + 30 * 60);
        assert_eq!(json["user_type"], "platform");
        assert!(json.get("organization_id").is_none());
    }
}
