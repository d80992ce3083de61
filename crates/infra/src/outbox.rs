//! Email outbox: notifications recorded for a separate sender to deliver.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tritiq_core::{NotificationId, OrganizationId, VoucherId};

use crate::store::{GlobalStore, StoreResult, TenantStore};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailNotification {
    pub id: NotificationId,
    /// `None` for platform-level mail (license onboarding, platform OTPs).
    pub organization_id: Option<OrganizationId>,
    pub to_email: String,
    pub from_email: Option<String>,
    pub subject: String,
    pub body: String,
    pub voucher_type: Option<String>,
    pub voucher_id: Option<VoucherId>,
    pub status: EmailStatus,
    pub created_at: DateTime<Utc>,
}

impl EmailNotification {
    pub fn new(
        organization_id: Option<OrganizationId>,
        to_email: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            organization_id,
            to_email: to_email.into(),
            from_email: None,
            subject: subject.into(),
            body: body.into(),
            voucher_type: None,
            voucher_id: None,
            status: EmailStatus::Pending,
            created_at: now,
        }
    }

    pub fn for_voucher(mut self, voucher_type: impl Into<String>, voucher_id: VoucherId) -> Self {
        self.voucher_type = Some(voucher_type.into());
        self.voucher_id = Some(voucher_id);
        self
    }
}

/// Routes notifications to the owning organization's outbox, or the
/// platform outbox when there is none.
#[derive(Clone)]
pub struct Outbox {
    tenant: Arc<dyn TenantStore<NotificationId, EmailNotification>>,
    platform: Arc<dyn GlobalStore<NotificationId, EmailNotification>>,
    from_email: Option<String>,
}

impl Outbox {
    pub fn new(
        tenant: Arc<dyn TenantStore<NotificationId, EmailNotification>>,
        platform: Arc<dyn GlobalStore<NotificationId, EmailNotification>>,
        from_email: Option<String>,
    ) -> Self {
        Self {
            tenant,
            platform,
            from_email,
        }
    }

    pub async fn queue(&self, mut notification: EmailNotification) -> StoreResult<NotificationId> {
        if notification.from_email.is_none() {
            notification.from_email = self.from_email.clone();
        }
        let id = notification.id;
        tracing::info!(
            notification_id = %id,
            organization_id = ?notification.organization_id,
            subject = %notification.subject,
            "email queued"
        );
        match notification.organization_id {
            Some(org) => self.tenant.upsert(org, id, notification).await?,
            None => self.platform.upsert(id, notification).await?,
        }
        Ok(id)
    }

    pub async fn pending(
        &self,
        organization_id: Option<OrganizationId>,
    ) -> StoreResult<Vec<EmailNotification>> {
        let all = match organization_id {
            Some(org) => self.tenant.list(org).await?,
            None => self.platform.list().await?,
        };
        Ok(all
            .into_iter()
            .filter(|n| n.status == EmailStatus::Pending)
            .collect())
    }

    /// Drop an organization's queued mail.
    pub async fn clear(&self, organization_id: OrganizationId) -> StoreResult<u64> {
        self.tenant.clear_tenant(organization_id).await
    }
}
