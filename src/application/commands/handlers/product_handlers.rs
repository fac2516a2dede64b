//! Product Command Handlers

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::access::AccessPolicy;
use crate::application::commands::{AdjustStock, CreateProduct, DeleteProduct, UpdateProduct};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ClinicEvent, ClinicNotifierPort, LowStockNotice, ProductRecord, ProductRepositoryPort,
    StockMovementRecord,
};
use crate::domain::inventory::StockLevel;
use crate::domain::validation::{optional_text, required_text};
use crate::domain::{DomainError, Permission};

const NAME_MAX: usize = 120;
const DEFAULT_UNIT: &str = "unit";

fn normalize_sku(raw: Option<&str>) -> Result<Option<String>, DomainError> {
    Ok(optional_text("sku", raw, 64)?.map(|sku| sku.to_uppercase()))
}

fn non_negative_money(field: &'static str, cents: i64) -> Result<i64, DomainError> {
    if cents < 0 {
        return Err(DomainError::invalid(field, "cannot be negative"));
    }
    Ok(cents)
}

async fn ensure_sku_free(
    repo: &dyn ProductRepositoryPort,
    clinic_id: Uuid,
    sku: Option<&str>,
    exclude: Option<Uuid>,
) -> Result<(), ApplicationError> {
    if let Some(sku) = sku {
        if repo.sku_taken(clinic_id, sku, exclude).await? {
            return Err(ApplicationError::conflict(format!(
                "SKU {} is already used in this clinic",
                sku
            )));
        }
    }
    Ok(())
}

// ============================================================================
// CreateProduct
// ============================================================================

pub struct CreateProductHandler {
    policy: AccessPolicy,
    product_repo: Arc<dyn ProductRepositoryPort>,
}

impl CreateProductHandler {
    pub fn new(policy: AccessPolicy, product_repo: Arc<dyn ProductRepositoryPort>) -> Self {
        Self {
            policy,
            product_repo,
        }
    }

    pub async fn handle(&self, cmd: CreateProduct) -> Result<ProductRecord, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteProducts)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let stock = StockLevel::new(cmd.stock_quantity, cmd.min_stock)?;
        let now = Utc::now();

        let product = ProductRecord {
            id: Uuid::new_v4(),
            clinic_id,
            name: required_text("name", &cmd.name, NAME_MAX)?,
            sku: normalize_sku(cmd.sku.as_deref())?,
            category: cmd.category,
            description: optional_text("description", cmd.description.as_deref(), 2000)?,
            unit: optional_text("unit", cmd.unit.as_deref(), 32)?
                .unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            price_cents: non_negative_money("price_cents", cmd.price_cents)?,
            cost_cents: cmd
                .cost_cents
                .map(|c| non_negative_money("cost_cents", c))
                .transpose()?,
            stock_quantity: stock.quantity(),
            min_stock: stock.min_stock(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        ensure_sku_free(
            self.product_repo.as_ref(),
            clinic_id,
            product.sku.as_deref(),
            None,
        )
        .await?;

        self.product_repo.insert(&product).await?;

        tracing::info!(
            clinic_id = %clinic_id,
            product_id = %product.id,
            category = %product.category,
            stock_quantity = product.stock_quantity,
            "Product created"
        );

        Ok(product)
    }
}

// ============================================================================
// UpdateProduct
// ============================================================================

pub struct UpdateProductHandler {
    policy: AccessPolicy,
    product_repo: Arc<dyn ProductRepositoryPort>,
}

impl UpdateProductHandler {
    pub fn new(policy: AccessPolicy, product_repo: Arc<dyn ProductRepositoryPort>) -> Self {
        Self {
            policy,
            product_repo,
        }
    }

    pub async fn handle(&self, cmd: UpdateProduct) -> Result<ProductRecord, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteProducts)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut product = self
            .product_repo
            .find(clinic_id, cmd.product_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Product", cmd.product_id))?;

        if let Some(name) = cmd.name.as_deref() {
            product.name = required_text("name", name, NAME_MAX)?;
        }
        if let Some(sku) = cmd.sku.as_deref() {
            let sku = normalize_sku(Some(sku))?;
            ensure_sku_free(
                self.product_repo.as_ref(),
                clinic_id,
                sku.as_deref(),
                Some(product.id),
            )
            .await?;
            product.sku = sku;
        }
        if let Some(category) = cmd.category {
            product.category = category;
        }
        if let Some(description) = cmd.description.as_deref() {
            product.description = optional_text("description", Some(description), 2000)?;
        }
        if let Some(unit) = cmd.unit.as_deref() {
            product.unit = optional_text("unit", Some(unit), 32)?
                .unwrap_or_else(|| DEFAULT_UNIT.to_string());
        }
        if let Some(price) = cmd.price_cents {
            product.price_cents = non_negative_money("price_cents", price)?;
        }
        if let Some(cost) = cmd.cost_cents {
            product.cost_cents = Some(non_negative_money("cost_cents", cost)?);
        }
        if let Some(min_stock) = cmd.min_stock {
            product.min_stock = StockLevel::new(product.stock_quantity, min_stock)?.min_stock();
        }
        product.updated_at = Utc::now();

        self.product_repo.update(&product).await?;

        tracing::info!(clinic_id = %clinic_id, product_id = %product.id, "Product updated");
        Ok(product)
    }
}

// ============================================================================
// AdjustStock
// ============================================================================

pub struct AdjustStockHandler {
    policy: AccessPolicy,
    product_repo: Arc<dyn ProductRepositoryPort>,
    notifier: Arc<dyn ClinicNotifierPort>,
}

impl AdjustStockHandler {
    pub fn new(
        policy: AccessPolicy,
        product_repo: Arc<dyn ProductRepositoryPort>,
        notifier: Arc<dyn ClinicNotifierPort>,
    ) -> Self {
        Self {
            policy,
            product_repo,
            notifier,
        }
    }

    /// 调整后低于最低库存时发布 low_stock 事件
    pub async fn handle(&self, cmd: AdjustStock) -> Result<ProductRecord, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteProducts)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let product = self
            .product_repo
            .find(clinic_id, cmd.product_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Product", cmd.product_id))?;

        let level = product.stock_level()?.adjust(cmd.delta)?;

        let movement = StockMovementRecord {
            id: Uuid::new_v4(),
            product_id: product.id,
            clinic_id,
            delta: cmd.delta,
            quantity_after: level.quantity(),
            reason: optional_text("reason", cmd.reason.as_deref(), 255)?,
            created_by: cmd.actor.user_id,
            created_at: Utc::now(),
        };

        // 仓储层以条件更新保证并发下库存不为负
        let updated = self
            .product_repo
            .adjust_stock(&movement)
            .await?
            .ok_or_else(|| ApplicationError::business_rule("Insufficient stock"))?;

        tracing::info!(
            clinic_id = %clinic_id,
            product_id = %updated.id,
            delta = cmd.delta,
            stock_quantity = updated.stock_quantity,
            "Stock adjusted"
        );

        if updated.is_low_stock() {
            tracing::warn!(
                clinic_id = %clinic_id,
                product_id = %updated.id,
                stock_quantity = updated.stock_quantity,
                min_stock = updated.min_stock,
                "Product is low on stock"
            );
            self.notifier.publish(
                clinic_id,
                ClinicEvent::LowStock(LowStockNotice {
                    product_id: updated.id,
                    name: updated.name.clone(),
                    stock_quantity: updated.stock_quantity,
                    min_stock: updated.min_stock,
                }),
            );
        }

        Ok(updated)
    }
}

// ============================================================================
// DeleteProduct
// ============================================================================

pub struct DeleteProductHandler {
    policy: AccessPolicy,
    product_repo: Arc<dyn ProductRepositoryPort>,
}

impl DeleteProductHandler {
    pub fn new(policy: AccessPolicy, product_repo: Arc<dyn ProductRepositoryPort>) -> Self {
        Self {
            policy,
            product_repo,
        }
    }

    pub async fn handle(&self, cmd: DeleteProduct) -> Result<(), ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteProducts)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut product = self
            .product_repo
            .find(clinic_id, cmd.product_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Product", cmd.product_id))?;

        product.is_active = false;
        product.updated_at = Utc::now();
        self.product_repo.update(&product).await?;

        tracing::info!(clinic_id = %clinic_id, product_id = %product.id, "Product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::access::Actor;
    use crate::domain::inventory::ProductCategory;
    use crate::domain::ClinicRole;
    use crate::test_support::TestApp;

    fn product_cmd(actor: Actor, sku: Option<&str>, stock: i64, min: i64) -> CreateProduct {
        CreateProduct {
            actor,
            name: "Rabies vaccine".to_string(),
            sku: sku.map(str::to_string),
            category: ProductCategory::Vaccine,
            description: None,
            unit: None,
            price_cents: 2_500,
            cost_cents: Some(1_200),
            stock_quantity: stock,
            min_stock: min,
        }
    }

    #[tokio::test]
    async fn test_sku_must_be_unique_per_clinic() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let actor = Actor::new(owner.id, app.clinic(owner.id).await);
        let other = Actor::new(owner.id, app.clinic(owner.id).await);

        let product = app
            .state
            .create_product_handler
            .handle(product_cmd(actor, Some("vac-001"), 10, 2))
            .await
            .unwrap();
        assert_eq!(product.sku.as_deref(), Some("VAC-001"));
        assert_eq!(product.unit, "unit");

        let err = app
            .state
            .create_product_handler
            .handle(product_cmd(actor, Some("VAC-001"), 10, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Conflict(_)));

        // 其他诊所可以使用相同 SKU
        app.state
            .create_product_handler
            .handle(product_cmd(other, Some("VAC-001"), 10, 2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_adjust_stock_emits_low_stock_and_rejects_negative() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let actor = Actor::new(owner.id, app.clinic(owner.id).await);
        let product = app
            .state
            .create_product_handler
            .handle(product_cmd(actor, None, 10, 3))
            .await
            .unwrap();
        let mut rx = app.publisher.subscribe_clinic(actor.clinic_id);

        let updated = app
            .state
            .adjust_stock_handler
            .handle(AdjustStock {
                actor,
                product_id: product.id,
                delta: -7,
                reason: Some("Vaccination day".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(updated.stock_quantity, 3);

        match rx.recv().await.unwrap() {
            ClinicEvent::LowStock(notice) => {
                assert_eq!(notice.product_id, product.id);
                assert_eq!(notice.stock_quantity, 3);
            }
            other => panic!("unexpected event {:?}", other),
        }

        let err = app
            .state
            .adjust_stock_handler
            .handle(AdjustStock {
                actor,
                product_id: product.id,
                delta: -4,
                reason: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::BusinessRuleViolation(_)));
    }

    #[tokio::test]
    async fn test_veterinarian_cannot_manage_products() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let vet = app.user("vet@example.com").await;
        let clinic_id = app.clinic(owner.id).await;
        app.member(clinic_id, owner.id, "vet@example.com", ClinicRole::Veterinarian)
            .await;

        let err = app
            .state
            .create_product_handler
            .handle(product_cmd(Actor::new(vet.id, clinic_id), None, 1, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Forbidden(_)));
    }
}
