//! Product Query Handlers

use std::sync::Arc;

use crate::application::access::AccessPolicy;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    Page, PageRequest, ProductFilter, ProductRecord, ProductRepositoryPort,
};
use crate::application::queries::{GetProduct, ListLowStockProducts, ListProducts};
use crate::domain::Permission;

/// GetProduct Handler
pub struct GetProductHandler {
    policy: AccessPolicy,
    product_repo: Arc<dyn ProductRepositoryPort>,
}

impl GetProductHandler {
    pub fn new(policy: AccessPolicy, product_repo: Arc<dyn ProductRepositoryPort>) -> Self {
        Self {
            policy,
            product_repo,
        }
    }

    pub async fn handle(&self, query: GetProduct) -> Result<ProductRecord, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        self.product_repo
            .find(query.actor.clinic_id, query.product_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Product", query.product_id))
    }
}

/// ListProducts Handler
pub struct ListProductsHandler {
    policy: AccessPolicy,
    product_repo: Arc<dyn ProductRepositoryPort>,
}

impl ListProductsHandler {
    pub fn new(policy: AccessPolicy, product_repo: Arc<dyn ProductRepositoryPort>) -> Self {
        Self {
            policy,
            product_repo,
        }
    }

    pub async fn handle(&self, query: ListProducts) -> Result<Page<ProductRecord>, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        Ok(self
            .product_repo
            .list(query.actor.clinic_id, &query.filter, query.page)
            .await?)
    }
}

/// ListLowStockProducts Handler
///
/// 返回最多 PageRequest::MAX_LIMIT 条，按库存升序
pub struct ListLowStockProductsHandler {
    policy: AccessPolicy,
    product_repo: Arc<dyn ProductRepositoryPort>,
}

impl ListLowStockProductsHandler {
    pub fn new(policy: AccessPolicy, product_repo: Arc<dyn ProductRepositoryPort>) -> Self {
        Self {
            policy,
            product_repo,
        }
    }

    pub async fn handle(
        &self,
        query: ListLowStockProducts,
    ) -> Result<Vec<ProductRecord>, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        let filter = ProductFilter {
            low_stock_only: true,
            ..Default::default()
        };
        let page = self
            .product_repo
            .list(
                query.actor.clinic_id,
                &filter,
                PageRequest::new(Some(1), Some(PageRequest::MAX_LIMIT)),
            )
            .await?;

        Ok(page.items)
    }
}
