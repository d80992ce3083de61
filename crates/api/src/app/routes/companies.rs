use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::{get, put},
};
use chrono::Utc;

use tritiq_auth::require_admin;
use tritiq_core::{CompanyId, OrganizationId};
use tritiq_organizations::{Company, CompanyDetails, CompanyUpdate};

use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::parse_id;
use crate::app::services::{AppServices, found};
use crate::authz::{self, COMPANY_READ};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_companies).post(create_company))
        .route("/current", get(current_company))
        .route("/:id", put(update_company))
}

/// An organization has at most one company profile.
async fn company_of(services: &AppServices, org: OrganizationId) -> ApiResult<Option<Company>> {
    Ok(services.companies.list(org).await?.into_iter().next())
}

async fn set_details_completed(
    services: &AppServices,
    org: OrganizationId,
    completed: bool,
) -> ApiResult<()> {
    let mut organization = services.organization(org).await?;
    if organization.company_details_completed != completed {
        organization.mark_company_details(completed, Utc::now());
        services.organizations.upsert(org, organization).await?;
    }
    Ok(())
}

pub async fn list_companies(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<Vec<Company>>> {
    authz::require(&principal, &COMPANY_READ)?;
    let org = tenant.require(&principal)?;
    Ok(Json(services.companies.list(org).await?))
}

pub async fn current_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<Company>> {
    authz::require(&principal, &COMPANY_READ)?;
    let org = tenant.require(&principal)?;
    company_of(&services, org).await?.map(Json).ok_or_else(|| {
        ApiError::not_found("Company details not found. Please complete company setup.")
    })
}

pub async fn create_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(details): Json<CompanyDetails>,
) -> ApiResult<(StatusCode, Json<Company>)> {
    require_admin(&principal)?;
    let org = tenant.require(&principal)?;
    let _unique = services.claim_unique().await;
    if company_of(&services, org).await?.is_some() {
        return Err(ApiError::bad_request(
            "Company already exists for this organization",
        ));
    }

    let company = Company::create(org, details, Utc::now())?;
    services
        .companies
        .upsert(org, company.id, company.clone())
        .await?;
    set_details_completed(&services, org, true).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn update_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(update): Json<CompanyUpdate>,
) -> ApiResult<Json<Company>> {
    require_admin(&principal)?;
    let org = tenant.require(&principal)?;
    let id: CompanyId = parse_id(&id, "company")?;
    let mut company = found(services.companies.get(org, &id).await?, org, "Company")?;

    company.apply_update(update, Utc::now())?;
    services
        .companies
        .upsert(org, company.id, company.clone())
        .await?;
    set_details_completed(&services, org, true).await?;
    Ok(Json(company))
}
