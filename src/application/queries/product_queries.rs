//! Product Queries

use uuid::Uuid;

use crate::application::access::Actor;
use crate::application::ports::{PageRequest, ProductFilter};

#[derive(Debug, Clone)]
pub struct GetProduct {
    pub actor: Actor,
    pub product_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct ListProducts {
    pub actor: Actor,
    pub filter: ProductFilter,
    pub page: PageRequest,
}

/// 列出低库存产品
#[derive(Debug, Clone)]
pub struct ListLowStockProducts {
    pub actor: Actor,
}
