//! Request-scoped tenant and principal context.
//!
//! The auth middleware builds both values once per request, stores them in
//! the request extensions for handlers, and runs the rest of the request
//! inside a task-local audit scope so code without access to the request
//! still records who is acting. The scope ends with the request.

use std::future::Future;

use tritiq_auth::{Account, AuthzError, Principal, require_current_organization};
use tritiq_core::OrganizationId;
use tritiq_observability::audit::{self, RequestScope};

/// Organization a request operates on.
///
/// `None` for platform accounts that did not select an organization.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    organization_id: Option<OrganizationId>,
}

impl TenantContext {
    pub fn new(organization_id: Option<OrganizationId>) -> Self {
        Self { organization_id }
    }

    pub fn organization_id(&self) -> Option<OrganizationId> {
        self.organization_id
    }

    /// The organization, or 400 when none is selected.
    pub fn require(&self, principal: &PrincipalContext) -> Result<OrganizationId, AuthzError> {
        require_current_organization(principal.principal(), self.organization_id)
    }
}

/// Authenticated account for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

impl core::ops::Deref for PrincipalContext {
    type Target = Principal;

    fn deref(&self) -> &Self::Target {
        &self.principal
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub tenant: TenantContext,
    pub principal: PrincipalContext,
}

impl RequestContext {
    pub fn audit_scope(&self) -> RequestScope {
        let user_id = match self.principal.account {
            Account::Platform(id) => id.to_string(),
            Account::Organization { user_id, .. } => user_id.to_string(),
        };
        RequestScope {
            actor: Some(self.principal.email.clone()),
            user_id: Some(user_id),
            organization_id: self.tenant.organization_id().map(|id| id.to_string()),
        }
    }
}

/// Run `fut` with `ctx` as the current request context.
pub async fn scope<F: Future>(ctx: RequestContext, fut: F) -> F::Output {
    audit::in_request(ctx.audit_scope(), fut).await
}
