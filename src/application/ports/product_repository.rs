//! Product Repository Port

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Page, PageRequest, RepositoryError};
use crate::domain::inventory::{ProductCategory, StockLevel};
use crate::domain::DomainError;

/// 商品实体
#[derive(Debug, Clone)]
pub struct ProductRecord {
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
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRecord {
    pub fn stock_level(&self) -> Result<StockLevel, DomainError> {
        StockLevel::new(self.stock_quantity, self.min_stock)
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock
    }
}

/// 库存变动流水
#[derive(Debug, Clone)]
pub struct StockMovementRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub clinic_id: Uuid,
    pub delta: i64,
    pub quantity_after: i64,
    pub reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<ProductCategory>,
    /// 匹配名称或 SKU
    pub search: Option<String>,
    pub low_stock_only: bool,
}

/// Product Repository Port
#[async_trait]
pub trait ProductRepositoryPort: Send + Sync {
    async fn insert(&self, product: &ProductRecord) -> Result<(), RepositoryError>;

    async fn update(&self, product: &ProductRecord) -> Result<(), RepositoryError>;

    async fn find(&self, clinic_id: Uuid, id: Uuid) -> Result<Option<ProductRecord>, RepositoryError>;

    async fn list(
        &self,
        clinic_id: Uuid,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<ProductRecord>, RepositoryError>;

    async fn sku_taken(
        &self,
        clinic_id: Uuid,
        sku: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepositoryError>;

    /// 原子地调整库存并记录流水
    ///
    /// 返回调整后的商品；库存不足时返回 None 且不做任何修改
    async fn adjust_stock(
        &self,
        movement: &StockMovementRecord,
    ) -> Result<Option<ProductRecord>, RepositoryError>;
}
