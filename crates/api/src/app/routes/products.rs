use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;

use tritiq_auth::require_admin;
use tritiq_core::{OrganizationId, ProductId};
use tritiq_products::{NewProduct, Product, ProductUpdate};

use crate::app::dto::{self, MessageResponse};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::parse_id;
use crate::app::services::{AppServices, found};
use crate::authz::{self, PRODUCTS_READ, PRODUCTS_WRITE};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

async fn name_taken(
    services: &AppServices,
    org: OrganizationId,
    name: &str,
    except: Option<ProductId>,
) -> ApiResult<bool> {
    Ok(services
        .products
        .list(org)
        .await?
        .iter()
        .any(|p| p.has_name(name) && Some(p.id) != except))
}

pub(crate) async fn load(
    services: &AppServices,
    org: OrganizationId,
    raw_id: &str,
) -> ApiResult<Product> {
    fetch(services, org, parse_id(raw_id, "product")?).await
}

pub(crate) async fn fetch(
    services: &AppServices,
    org: OrganizationId,
    id: ProductId,
) -> ApiResult<Product> {
    found(services.products.get(org, &id).await?, org, "Product")
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::MasterListQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    authz::require(&principal, &PRODUCTS_READ)?;
    let org = tenant.require(&principal)?;
    let products: Vec<Product> = services
        .products
        .list(org)
        .await?
        .into_iter()
        .filter(|p| !query.active_only || p.is_active)
        .filter(|p| query.search().is_none_or(|q| p.matches_search(q)))
        .collect();
    Ok(Json(query.page().apply(products)))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    authz::require(&principal, &PRODUCTS_READ)?;
    let org = tenant.require(&principal)?;
    Ok(Json(load(&services, org, &id).await?))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    authz::require(&principal, &PRODUCTS_WRITE)?;
    let org = tenant.require(&principal)?;
    let _unique = services.claim_unique().await;
    if name_taken(&services, org, &body.name, None).await? {
        return Err(ApiError::bad_request("Product name already exists"));
    }

    let product = Product::create(org, body, Utc::now())?;
    services
        .products
        .upsert(org, product.id, product.clone())
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(update): Json<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    authz::require(&principal, &PRODUCTS_WRITE)?;
    let org = tenant.require(&principal)?;
    let _unique = services.claim_unique().await;
    let mut product = load(&services, org, &id).await?;
    if let Some(name) = &update.name {
        if name_taken(&services, org, name, Some(product.id)).await? {
            return Err(ApiError::bad_request("Product name already exists"));
        }
    }

    product.apply_update(update, Utc::now())?;
    services
        .products
        .upsert(org, product.id, product.clone())
        .await?;
    Ok(Json(product))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    require_admin(&principal)?;
    let org = tenant.require(&principal)?;
    let mut product = load(&services, org, &id).await?;

    product.deactivate(Utc::now());
    services
        .products
        .upsert(org, product.id, product)
        .await?;
    Ok(Json(dto::message("Product deleted successfully")))
}
