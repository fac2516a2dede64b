//! Product HTTP Handlers - 商品与库存

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{AdjustStock, CreateProduct, DeleteProduct, UpdateProduct};
use crate::application::ports::{PageRequest, ProductFilter, ProductRecord};
use crate::application::queries::{GetProduct, ListLowStockProducts, ListProducts};
use crate::domain::inventory::ProductCategory;
use crate::infrastructure::http::dto::{timestamp, ApiResponse, Empty, PageResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub sku: Option<String>,
    pub category: ProductCategory,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub min_stock: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<ProductCategory>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub min_stock: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<ProductCategory>,
    pub search: Option<String>,
    #[serde(default)]
    pub low_stock_only: bool,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub category: ProductCategory,
    pub description: Option<String>,
    pub unit: String,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
    pub stock_quantity: i64,
    pub min_stock: i64,
    pub is_low_stock: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProductRecord> for ProductResponse {
    fn from(p: ProductRecord) -> Self {
        Self {
            is_low_stock: p.stock_quantity <= p.min_stock,
            id: p.id,
            clinic_id: p.clinic_id,
            name: p.name,
            sku: p.sku,
            category: p.category,
            description: p.description,
            unit: p.unit,
            price_cents: p.price_cents,
            cost_cents: p.cost_cents,
            stock_quantity: p.stock_quantity,
            min_stock: p.min_stock,
            created_at: timestamp(p.created_at),
            updated_at: timestamp(p.updated_at),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/clinics/:clinic_id/products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListProductsQuery>,
) -> Result<Json<ApiResponse<PageResponse<ProductResponse>>>, ApiError> {
    let page = state
        .list_products_handler
        .handle(ListProducts {
            actor: user.in_clinic(clinic_id),
            filter: ProductFilter {
                category: query.category,
                search: query.search,
                low_stock_only: query.low_stock_only,
            },
            page: PageRequest::new(query.page, query.limit),
        })
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::from_page(page))))
}

/// GET /api/clinics/:clinic_id/products/low-stock
pub async fn list_low_stock_products(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, ApiError> {
    let products = state
        .list_low_stock_products_handler
        .handle(ListLowStockProducts {
            actor: user.in_clinic(clinic_id),
        })
        .await?;

    Ok(Json(ApiResponse::success(
        products.into_iter().map(ProductResponse::from).collect(),
    )))
}

/// POST /api/clinics/:clinic_id/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ApiError> {
    let product = state
        .create_product_handler
        .handle(CreateProduct {
            actor: user.in_clinic(clinic_id),
            name: req.name,
            sku: req.sku,
            category: req.category,
            description: req.description,
            unit: req.unit,
            price_cents: req.price_cents,
            cost_cents: req.cost_cents,
            stock_quantity: req.stock_quantity,
            min_stock: req.min_stock,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(product.into()))))
}

/// GET /api/clinics/:clinic_id/products/:product_id
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, product_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<ProductResponse>>, ApiError> {
    let product = state
        .get_product_handler
        .handle(GetProduct {
            actor: user.in_clinic(clinic_id),
            product_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(product.into())))
}

/// PATCH /api/clinics/:clinic_id/products/:product_id
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, product_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductResponse>>, ApiError> {
    let product = state
        .update_product_handler
        .handle(UpdateProduct {
            actor: user.in_clinic(clinic_id),
            product_id,
            name: req.name,
            sku: req.sku,
            category: req.category,
            description: req.description,
            unit: req.unit,
            price_cents: req.price_cents,
            cost_cents: req.cost_cents,
            min_stock: req.min_stock,
        })
        .await?;

    Ok(Json(ApiResponse::success(product.into())))
}

/// POST /api/clinics/:clinic_id/products/:product_id/stock
pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, product_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<AdjustStockRequest>,
) -> Result<Json<ApiResponse<ProductResponse>>, ApiError> {
    let product = state
        .adjust_stock_handler
        .handle(AdjustStock {
            actor: user.in_clinic(clinic_id),
            product_id,
            delta: req.delta,
            reason: req.reason,
        })
        .await?;

    Ok(Json(ApiResponse::success(product.into())))
}

/// DELETE /api/clinics/:clinic_id/products/:product_id
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, product_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_product_handler
        .handle(DeleteProduct {
            actor: user.in_clinic(clinic_id),
            product_id,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}
