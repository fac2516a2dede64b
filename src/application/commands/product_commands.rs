//! Product Commands

use uuid::Uuid;

use crate::application::access::Actor;
use crate::domain::inventory::ProductCategory;

/// 创建产品命令
#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub actor: Actor,
    pub name: String,
    pub sku: Option<String>,
    pub category: ProductCategory,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
    pub stock_quantity: i64,
    pub min_stock: i64,
}

/// 更新产品命令（库存数量只能通过 AdjustStock 修改）
#[derive(Debug, Clone)]
pub struct UpdateProduct {
    pub actor: Actor,
    pub product_id: Uuid,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<ProductCategory>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub min_stock: Option<i64>,
}

/// 调整库存命令
#[derive(Debug, Clone)]
pub struct AdjustStock {
    pub actor: Actor,
    pub product_id: Uuid,
    pub delta: i64,
    pub reason: Option<String>,
}

/// 删除产品命令（软删除）
#[derive(Debug, Clone)]
pub struct DeleteProduct {
    pub actor: Actor,
    pub product_id: Uuid,
}
