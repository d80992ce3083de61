//! All voucher kinds under `/vouchers/{kind}`, where `kind` is the URL slug
//! (`purchase-vouchers`, `sales-orders`, ...).

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

use tritiq_auth::require_admin;
use tritiq_core::{OrganizationId, VoucherId};
use tritiq_infra::EmailNotification;
use tritiq_vouchers::{NewVoucher, Voucher, VoucherKind, VoucherUpdate};

use crate::app::dto::{self, MessageResponse};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::parse_id;
use crate::app::services::{AppServices, found};
use crate::authz::{self, VOUCHERS_READ, VOUCHERS_WRITE};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/:kind", get(list_vouchers).post(create_voucher))
        .route(
            "/:kind/:id",
            get(get_voucher).put(update_voucher).delete(delete_voucher),
        )
        .route("/:kind/:id/send-email", post(send_voucher_email))
}

fn kind_of(slug: &str) -> ApiResult<VoucherKind> {
    VoucherKind::from_slug(slug).ok_or_else(|| ApiError::not_found("Voucher type not found"))
}

async fn load(
    services: &AppServices,
    org: OrganizationId,
    kind: VoucherKind,
    raw_id: &str,
) -> ApiResult<Voucher> {
    let id: VoucherId = parse_id(raw_id, "voucher")?;
    let voucher = services
        .vouchers
        .get(org, &id)
        .await?
        .filter(|v| v.kind == kind);
    found(voucher, org, kind.label())
}

async fn number_taken(
    services: &AppServices,
    org: OrganizationId,
    kind: VoucherKind,
    number: &str,
    except: Option<VoucherId>,
) -> ApiResult<bool> {
    Ok(services
        .vouchers
        .list(org)
        .await?
        .iter()
        .any(|v| v.kind == kind && v.is_numbered(number) && Some(v.id) != except))
}

/// Parties and products a voucher points at must exist in its organization.
async fn check_references(services: &AppServices, voucher: &Voucher) -> ApiResult<()> {
    let org = voucher.organization_id;
    if let Some(id) = voucher.vendor_id {
        if services.vendors.get(org, &id).await?.is_none() {
            return Err(ApiError::bad_request("Vendor not found"));
        }
    }
    if let Some(id) = voucher.customer_id {
        if services.customers.get(org, &id).await?.is_none() {
            return Err(ApiError::bad_request("Customer not found"));
        }
    }
    for id in voucher.product_ids() {
        if services.products.get(org, &id).await?.is_none() {
            return Err(ApiError::bad_request(format!("Product {id} not found")));
        }
    }
    Ok(())
}

pub async fn list_vouchers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(kind): Path<String>,
    Query(query): Query<dto::VoucherListQuery>,
) -> ApiResult<Json<Vec<Voucher>>> {
    let kind = kind_of(&kind)?;
    authz::require(&principal, &VOUCHERS_READ)?;
    let org = tenant.require(&principal)?;
    let vouchers: Vec<Voucher> = services
        .vouchers
        .list(org)
        .await?
        .into_iter()
        .filter(|v| v.kind == kind)
        .filter(|v| query.status.is_none_or(|s| v.status == s))
        .collect();
    Ok(Json(query.page().apply(vouchers)))
}

pub async fn get_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<Json<Voucher>> {
    let kind = kind_of(&kind)?;
    authz::require(&principal, &VOUCHERS_READ)?;
    let org = tenant.require(&principal)?;
    Ok(Json(load(&services, org, kind, &id).await?))
}

pub async fn create_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(kind): Path<String>,
    Json(body): Json<NewVoucher>,
) -> ApiResult<(StatusCode, Json<Voucher>)> {
    let kind = kind_of(&kind)?;
    authz::require(&principal, &VOUCHERS_WRITE)?;
    let org = tenant.require(&principal)?;
    let _unique = services.claim_unique().await;
    if number_taken(&services, org, kind, &body.voucher_number, None).await? {
        return Err(ApiError::bad_request("Voucher number already exists"));
    }

    let voucher = Voucher::create(org, kind, body, principal.user_id(), Utc::now())?;
    check_references(&services, &voucher).await?;
    services
        .vouchers
        .upsert(org, voucher.id, voucher.clone())
        .await?;
    tracing::info!(
        organization_id = %org,
        kind = %kind,
        voucher_id = %voucher.id,
        number = %voucher.voucher_number,
        "voucher created"
    );
    Ok((StatusCode::CREATED, Json(voucher)))
}

pub async fn update_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path((kind, id)): Path<(String, String)>,
    Json(update): Json<VoucherUpdate>,
) -> ApiResult<Json<Voucher>> {
    let kind = kind_of(&kind)?;
    authz::require(&principal, &VOUCHERS_WRITE)?;
    let org = tenant.require(&principal)?;
    let _unique = services.claim_unique().await;
    let mut voucher = load(&services, org, kind, &id).await?;
    if let Some(number) = &update.voucher_number {
        if number_taken(&services, org, kind, number, Some(voucher.id)).await? {
            return Err(ApiError::bad_request("Voucher number already exists"));
        }
    }

    voucher.apply_update(update, Utc::now())?;
    check_references(&services, &voucher).await?;
    services
        .vouchers
        .upsert(org, voucher.id, voucher.clone())
        .await?;
    Ok(Json(voucher))
}

pub async fn delete_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let kind = kind_of(&kind)?;
    require_admin(&principal)?;
    let org = tenant.require(&principal)?;
    let voucher = load(&services, org, kind, &id).await?;

    services.vouchers.remove(org, &voucher.id).await?;
    Ok(Json(dto::message(format!("{} deleted successfully", kind.label()))))
}

/// Queue the voucher for mailing; the recipient defaults to the
/// counterparty's email.
pub async fn send_voucher_email(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path((kind, id)): Path<(String, String)>,
    body: Option<Json<dto::SendVoucherEmailRequest>>,
) -> ApiResult<Json<MessageResponse>> {
    let kind = kind_of(&kind)?;
    authz::require(&principal, &VOUCHERS_READ)?;
    let org = tenant.require(&principal)?;
    let voucher = load(&services, org, kind, &id).await?;
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let counterparty_email = match (voucher.vendor_id, voucher.customer_id) {
        (Some(id), _) => services
            .vendors
            .get(org, &id)
            .await?
            .and_then(|v| v.details.email),
        (None, Some(id)) => services
            .customers
            .get(org, &id)
            .await?
            .and_then(|c| c.details.email),
        (None, None) => None,
    };
    let to_email = body
        .to_email
        .or(counterparty_email)
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Recipient email is required"))?;

    let subject = body
        .subject
        .unwrap_or_else(|| format!("{} {}", kind.label(), voucher.voucher_number));
    let text = body.body.unwrap_or_else(|| {
        format!(
            "Please find {} {} dated {} for a total of {:.2}.",
            kind.label().to_lowercase(),
            voucher.voucher_number,
            voucher.date.format("%Y-%m-%d"),
            voucher.amounts.total_amount
        )
    });
    let notification = EmailNotification::new(Some(org), &to_email, subject, text, Utc::now())
        .for_voucher(kind.code(), voucher.id);
    services.outbox.queue(notification).await?;

    Ok(Json(dto::message(format!("Email queued for {to_email}"))))
}
