//! Vendors and customers share one set of handlers, parameterized by the
//! id type of the party.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;

use tritiq_auth::{Permission, require_admin};
use tritiq_core::{CustomerId, OrganizationId, VendorId};
use tritiq_infra::{Document, DocumentKey, TenantStore};
use tritiq_parties::{Party, PartyDetails, PartyKind, PartyUpdate};

use crate::app::dto::{self, MessageResponse};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::parse_id;
use crate::app::services::{AppServices, found};
use crate::authz::{self, CUSTOMERS_READ, CUSTOMERS_WRITE, VENDORS_READ, VENDORS_WRITE};
use crate::context::{PrincipalContext, TenantContext};

pub trait PartyKey: DocumentKey + Copy + core::str::FromStr
where
    Party<Self>: Document,
{
    const KIND: PartyKind;
    const READ: Permission;
    const WRITE: Permission;

    fn generate() -> Self;

    fn store(services: &AppServices) -> &Arc<dyn TenantStore<Self, Party<Self>>>;
}

impl PartyKey for VendorId {
    const KIND: PartyKind = PartyKind::Vendor;
    const READ: Permission = VENDORS_READ;
    const WRITE: Permission = VENDORS_WRITE;

    fn generate() -> Self {
        VendorId::new()
    }

    fn store(services: &AppServices) -> &Arc<dyn TenantStore<Self, Party<Self>>> {
        &services.vendors
    }
}

impl PartyKey for CustomerId {
    const KIND: PartyKind = PartyKind::Customer;
    const READ: Permission = CUSTOMERS_READ;
    const WRITE: Permission = CUSTOMERS_WRITE;

    fn generate() -> Self {
        CustomerId::new()
    }

    fn store(services: &AppServices) -> &Arc<dyn TenantStore<Self, Party<Self>>> {
        &services.customers
    }
}

pub fn vendors() -> Router {
    router::<VendorId>()
}

pub fn customers() -> Router {
    router::<CustomerId>()
}

fn router<I>() -> Router
where
    I: PartyKey,
    Party<I>: Document,
{
    Router::new()
        .route("/", get(list_parties::<I>).post(create_party::<I>))
        .route(
            "/:id",
            get(get_party::<I>)
                .put(update_party::<I>)
                .delete(delete_party::<I>),
        )
}

fn duplicate_name(kind: PartyKind) -> ApiError {
    ApiError::bad_request(format!("{} name already exists", kind.label()))
}

async fn name_taken<I>(
    services: &AppServices,
    org: OrganizationId,
    name: &str,
    except: Option<I>,
) -> ApiResult<bool>
where
    I: PartyKey,
    Party<I>: Document,
{
    Ok(I::store(services)
        .list(org)
        .await?
        .iter()
        .any(|p| p.has_name(name) && Some(p.id) != except))
}

async fn load<I>(services: &AppServices, org: OrganizationId, raw_id: &str) -> ApiResult<Party<I>>
where
    I: PartyKey,
    Party<I>: Document,
{
    let label = I::KIND.label();
    let id: I = parse_id(raw_id, &label.to_lowercase())?;
    found(I::store(services).get(org, &id).await?, org, label)
}

pub async fn list_parties<I>(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::MasterListQuery>,
) -> ApiResult<Json<Vec<Party<I>>>>
where
    I: PartyKey,
    Party<I>: Document,
{
    authz::require(&principal, &I::READ)?;
    let org = tenant.require(&principal)?;
    let parties: Vec<Party<I>> = I::store(&services)
        .list(org)
        .await?
        .into_iter()
        .filter(|p| !query.active_only || p.is_active)
        .filter(|p| query.search().is_none_or(|q| p.matches_search(q)))
        .collect();
    Ok(Json(query.page().apply(parties)))
}

pub async fn get_party<I>(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Party<I>>>
where
    I: PartyKey,
    Party<I>: Document,
{
    authz::require(&principal, &I::READ)?;
    let org = tenant.require(&principal)?;
    Ok(Json(load::<I>(&services, org, &id).await?))
}

pub async fn create_party<I>(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(details): Json<PartyDetails>,
) -> ApiResult<(StatusCode, Json<Party<I>>)>
where
    I: PartyKey,
    Party<I>: Document,
{
    authz::require(&principal, &I::WRITE)?;
    let org = tenant.require(&principal)?;
    let _unique = services.claim_unique().await;
    if name_taken::<I>(&services, org, &details.name, None).await? {
        return Err(duplicate_name(I::KIND));
    }

    let party = Party::create(I::generate(), org, I::KIND, details, Utc::now())?;
    I::store(&services)
        .upsert(org, party.id, party.clone())
        .await?;
    tracing::info!(organization_id = %org, kind = I::KIND.label(), id = %party.id, "party created");
    Ok((StatusCode::CREATED, Json(party)))
}

pub async fn update_party<I>(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(update): Json<PartyUpdate>,
) -> ApiResult<Json<Party<I>>>
where
    I: PartyKey,
    Party<I>: Document,
{
    authz::require(&principal, &I::WRITE)?;
    let org = tenant.require(&principal)?;
    let _unique = services.claim_unique().await;
    let mut party = load::<I>(&services, org, &id).await?;
    if let Some(name) = &update.name {
        if name_taken(&services, org, name, Some(party.id)).await? {
            return Err(duplicate_name(I::KIND));
        }
    }

    party.apply_update(update, Utc::now())?;
    I::store(&services)
        .upsert(org, party.id, party.clone())
        .await?;
    Ok(Json(party))
}

/// Soft delete; vouchers keep referring to the record.
pub async fn delete_party<I>(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>>
where
    I: PartyKey,
    Party<I>: Document,
{
    require_admin(&principal)?;
    let org = tenant.require(&principal)?;
    let mut party = load::<I>(&services, org, &id).await?;

    party.deactivate(Utc::now());
    I::store(&services)
        .upsert(org, party.id, party.clone())
        .await?;
    Ok(Json(dto::message(format!(
        "{} deleted successfully",
        I::KIND.label()
    ))))
}
