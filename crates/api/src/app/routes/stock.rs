use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;

use tritiq_core::{OrganizationId, ProductId, filter_by_tenant};
use tritiq_inventory::{Stock, StockLevel};
use tritiq_products::Product;

use crate::app::dto::{self, StockAdjustResponse};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::products;
use crate::app::services::AppServices;
use crate::authz::{self, STOCK_READ, STOCK_WRITE};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_stock).post(create_stock))
        .route("/low-stock", get(low_stock))
        .route("/product/:id", get(product_stock).put(set_product_stock))
        .route("/adjust/:id", post(adjust_stock))
}

/// A stock entry with the product fields clients display next to it.
#[derive(Debug, Serialize)]
pub struct StockView {
    #[serde(flatten)]
    pub stock: Stock,
    pub product_name: Option<String>,
    pub reorder_level: Option<u32>,
    pub is_low_stock: bool,
}

impl StockView {
    fn new(stock: Stock, product: Option<&Product>) -> Self {
        let reorder_level = product.map(|p| p.reorder_level);
        Self {
            is_low_stock: reorder_level.is_some_and(|level| stock.is_low(level)),
            product_name: product.map(|p| p.name.clone()),
            reorder_level,
            stock,
        }
    }
}

async fn views(
    services: &AppServices,
    org: OrganizationId,
    product_id: Option<ProductId>,
    low_only: bool,
) -> ApiResult<Vec<StockView>> {
    let products: HashMap<ProductId, Product> =
        filter_by_tenant(services.products.list(org).await?, org)
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
    Ok(filter_by_tenant(services.stock.list(org).await?, org)
        .into_iter()
        .filter(|s| product_id.is_none_or(|id| s.product_id == id))
        .map(|s| {
            let product = products.get(&s.product_id);
            StockView::new(s, product)
        })
        .filter(|v| !low_only || v.is_low_stock)
        .collect())
}

pub async fn list_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::StockListQuery>,
) -> ApiResult<Json<Vec<StockView>>> {
    authz::require(&principal, &STOCK_READ)?;
    let org = tenant.require(&principal)?;
    let entries = views(&services, org, query.product_id, query.low_stock_only).await?;
    Ok(Json(query.page().apply(entries)))
}

/// Entries at or below their product's reorder level.
pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<Vec<StockView>>> {
    authz::require(&principal, &STOCK_READ)?;
    let org = tenant.require(&principal)?;
    Ok(Json(views(&services, org, None, true).await?))
}

/// Stock of one product; products without an entry report zero.
pub async fn product_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<StockView>> {
    authz::require(&principal, &STOCK_READ)?;
    let org = tenant.require(&principal)?;
    let product = products::load(&services, org, &id).await?;
    let stock = match services.stock.get(org, &product.id).await? {
        Some(stock) => stock,
        None => Stock::empty(org, product.id, product.unit.clone(), Utc::now()),
    };
    Ok(Json(StockView::new(stock, Some(&product))))
}

pub async fn create_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::NewStockRequest>,
) -> ApiResult<(StatusCode, Json<StockView>)> {
    authz::require(&principal, &STOCK_WRITE)?;
    let org = tenant.require(&principal)?;
    let product = products::fetch(&services, org, body.product_id).await?;
    let _unique = services.claim_unique().await;
    if services.stock.get(org, &product.id).await?.is_some() {
        return Err(ApiError::bad_request(
            "Stock entry already exists for this product",
        ));
    }

    let level = StockLevel {
        quantity: body.quantity,
        unit: body.unit,
        location: body.location,
    };
    let stock = Stock::create(org, product.id, level, Utc::now())?;
    services
        .stock
        .upsert(org, product.id, stock.clone())
        .await?;
    Ok((StatusCode::CREATED, Json(StockView::new(stock, Some(&product)))))
}

/// Set the absolute level, creating the entry when missing.
pub async fn set_product_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(level): Json<StockLevel>,
) -> ApiResult<Json<StockView>> {
    authz::require(&principal, &STOCK_WRITE)?;
    let org = tenant.require(&principal)?;
    let product = products::load(&services, org, &id).await?;
    let now = Utc::now();

    let stock = match services.stock.get(org, &product.id).await? {
        Some(mut stock) => {
            stock.set_level(level, now)?;
            stock
        }
        None => Stock::create(org, product.id, level, now)?,
    };
    services
        .stock
        .upsert(org, product.id, stock.clone())
        .await?;
    Ok(Json(StockView::new(stock, Some(&product))))
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::StockAdjustRequest>,
) -> ApiResult<Json<StockAdjustResponse>> {
    authz::require(&principal, &STOCK_WRITE)?;
    let org = tenant.require(&principal)?;
    let product = products::load(&services, org, &id).await?;
    let now = Utc::now();

    let (stock, adjustment) = match services.stock.get(org, &product.id).await? {
        Some(mut stock) => {
            let adjustment = stock.adjust(body.quantity_change, now)?;
            (stock, adjustment)
        }
        None => Stock::opened_by_adjustment(
            org,
            product.id,
            product.unit.clone(),
            body.quantity_change,
            now,
        )?,
    };
    services.stock.upsert(org, product.id, stock).await?;
    tracing::info!(
        organization_id = %org,
        product_id = %product.id,
        change = body.quantity_change,
        reason = body.reason.as_deref().unwrap_or(""),
        "stock adjusted"
    );

    Ok(Json(StockAdjustResponse {
        message: "Stock adjusted successfully".to_string(),
        previous_quantity: adjustment.previous_quantity,
        new_quantity: adjustment.new_quantity,
    }))
}
