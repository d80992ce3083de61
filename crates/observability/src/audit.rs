//! Structured audit trail.
//!
//! Audit events go through `tracing` under the `audit` target so they can be
//! routed separately with `RUST_LOG=audit=info`. Inside a request scope the
//! acting account and organization are filled in for every event.

use std::future::Future;

use serde::Serialize;

tokio::task_local! {
    static REQUEST_SCOPE: RequestScope;
}

/// Who is acting in the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestScope {
    pub actor: Option<String>,
    pub user_id: Option<String>,
    pub organization_id: Option<String>,
}

/// Run `fut` with `scope` visible to every audit event it records.
pub async fn in_request<F: Future>(scope: RequestScope, fut: F) -> F::Output {
    REQUEST_SCOPE.scope(scope, fut).await
}

/// Scope of the current request, `None` outside one.
pub fn current_scope() -> Option<RequestScope> {
    REQUEST_SCOPE.try_with(Clone::clone).ok()
}

/// Security-relevant actions worth a durable trail.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    LoginSucceeded,
    LoginFailed,
    AccountLocked,
    TokenRejected,
    TenantAccessDenied,
    PasswordChanged,
    PasswordReset,
    OtpIssued,
    UserCreated,
    UserDeleted,
    OrganizationCreated,
    OrganizationDeleted,
    OrganizationStatusChanged,
    DataReset,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSucceeded => "login_succeeded",
            Self::LoginFailed => "login_failed",
            Self::AccountLocked => "account_locked",
            Self::TokenRejected => "token_rejected",
            Self::TenantAccessDenied => "tenant_access_denied",
            Self::PasswordChanged => "password_changed",
            Self::PasswordReset => "password_reset",
            Self::OtpIssued => "otp_issued",
            Self::UserCreated => "user_created",
            Self::UserDeleted => "user_deleted",
            Self::OrganizationCreated => "organization_created",
            Self::OrganizationDeleted => "organization_deleted",
            Self::OrganizationStatusChanged => "organization_status_changed",
            Self::DataReset => "data_reset",
        }
    }

    fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::LoginFailed | Self::AccountLocked | Self::TokenRejected | Self::TenantAccessDenied
        )
    }
}

/// One audit record. Optional fields are omitted from the log line.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditEvent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<&'a str>,
}

impl<'a> AuditEvent<'a> {
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn organization(mut self, organization_id: impl ToString) -> Self {
        self.organization_id = Some(organization_id.to_string());
        self
    }

    pub fn subject(mut self, subject: impl ToString) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn detail(mut self, detail: &'a str) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Fill fields left unset from the current request scope.
    pub fn with_request_scope(mut self) -> Self {
        if let Some(scope) = current_scope() {
            self.actor = self.actor.or(scope.actor);
            self.user_id = self.user_id.or(scope.user_id);
            self.organization_id = self.organization_id.or(scope.organization_id);
        }
        self
    }
}

/// Emit an audit event. Failures log at `warn`, everything else at `info`.
pub fn record(action: AuditAction, event: AuditEvent<'_>) {
    let event = event.with_request_scope();
    let payload = serde_json::to_string(&event).unwrap_or_default();
    if action.is_failure() {
        ::tracing::warn!(target: "audit", action = action.as_str(), event = %payload, "audit");
    } else {
        ::tracing::info!(target: "audit", action = action.as_str(), event = %payload, "audit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_omitted() {
        let event = AuditEvent::default().actor("a@x.test").detail("bad password");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"actor": "a@x.test", "detail": "bad password"}));
    }

    #[test]
    fn action_names_match_serde() {
        for action in [AuditAction::LoginFailed, AuditAction::DataReset, AuditAction::TokenRejected] {
            assert_eq!(serde_json::to_value(action).unwrap(), serde_json::json!(action.as_str()));
        }
        record(AuditAction::LoginSucceeded, AuditEvent::default().subject("u1"));
    }

    fn acme_scope() -> RequestScope {
        RequestScope {
            actor: Some("clerk@acme.test".into()),
            user_id: Some("u-42".into()),
            organization_id: Some("org-7".into()),
        }
    }

    #[tokio::test]
    async fn events_inside_a_request_carry_its_scope() {
        let event = in_request(acme_scope(), async {
            tokio::task::yield_now().await;
            AuditEvent::default().subject("vendor-1").with_request_scope()
        })
        .await;
        assert_eq!(event.actor.as_deref(), Some("clerk@acme.test"));
        assert_eq!(event.user_id.as_deref(), Some("u-42"));
        assert_eq!(event.organization_id.as_deref(), Some("org-7"));
    }

    #[tokio::test]
    async fn explicit_fields_win_over_scope() {
        let event = in_request(acme_scope(), async {
            AuditEvent::default().organization("org-9").with_request_scope()
        })
        .await;
        assert_eq!(event.organization_id.as_deref(), Some("org-9"));
        assert_eq!(event.actor.as_deref(), Some("clerk@acme.test"));
    }

    #[test]
    fn outside_a_request_nothing_is_filled() {
        assert_eq!(current_scope(), None);
        let event = AuditEvent::default().with_request_scope();
        assert!(event.actor.is_none() && event.organization_id.is_none());
    }
}
