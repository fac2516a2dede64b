//! SQLite Product Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use super::rows::{db_error, like_pattern, parse_enum, parse_ts, parse_uuid, to_u64, ts};
use super::DbPool;
use crate::application::ports::{
    Page, PageRequest, ProductFilter, ProductRecord, ProductRepositoryPort, RepositoryError,
    StockMovementRecord,
};

const PRODUCT_COLUMNS: &str = "id, clinic_id, name, sku, category, description, unit, price_cents, \
                               cost_cents, stock_quantity, min_stock, is_active, created_at, \
                               updated_at";

/// SQLite Product Repository
pub struct SqliteProductRepository {
    pool: DbPool,
}

impl SqliteProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: String,
    clinic_id: String,
    name: String,
    sku: Option<String>,
    category: String,
    description: Option<String>,
    unit: String,
    price_cents: i64,
    cost_cents: Option<i64>,
    stock_quantity: i64,
    min_stock: i64,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ProductRow> for ProductRecord {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(ProductRecord {
            id: parse_uuid(&row.id)?,
            clinic_id: parse_uuid(&row.clinic_id)?,
            name: row.name,
            sku: row.sku,
            category: parse_enum(&row.category)?,
            description: row.description,
            unit: row.unit,
            price_cents: row.price_cents,
            cost_cents: row.cost_cents,
            stock_quantity: row.stock_quantity,
            min_stock: row.min_stock,
            is_active: row.is_active,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, clinic_id: Uuid, filter: &ProductFilter) {
    qb.push(" WHERE clinic_id = ")
        .push_bind(clinic_id.to_string())
        .push(" AND is_active = 1");

    if let Some(category) = filter.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if filter.low_stock_only {
        qb.push(" AND stock_quantity <= min_stock");
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (LOWER(name) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(COALESCE(sku, '')) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

#[async_trait]
impl ProductRepositoryPort for SqliteProductRepository {
    async fn insert(&self, product: &ProductRecord) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO products ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            PRODUCT_COLUMNS
        ))
        .bind(product.id.to_string())
        .bind(product.clinic_id.to_string())
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.category.as_str())
        .bind(&product.description)
        .bind(&product.unit)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock_quantity)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(ts(product.created_at))
        .bind(ts(product.updated_at))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    /// 库存数量只能通过 adjust_stock 修改
    async fn update(&self, product: &ProductRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?, sku = ?, category = ?, description = ?, unit = ?, price_cents = ?,
                cost_cents = ?, min_stock = ?, is_active = ?, updated_at = ?
            WHERE id = ? AND clinic_id = ?
            "#,
        )
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.category.as_str())
        .bind(&product.description)
        .bind(&product.unit)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(ts(product.updated_at))
        .bind(product.id.to_string())
        .bind(product.clinic_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("product {}", product.id)));
        }
        Ok(())
    }

    async fn find(&self, clinic_id: Uuid, id: Uuid) -> Result<Option<ProductRecord>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE id = ? AND clinic_id = ? AND is_active = 1",
            PRODUCT_COLUMNS
        ))
        .bind(id.to_string())
        .bind(clinic_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(ProductRecord::try_from).transpose()
    }

    async fn list(
        &self,
        clinic_id: Uuid,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<ProductRecord>, RepositoryError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count, clinic_id, filter);
        let (total,): (i64,) = count
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM products", PRODUCT_COLUMNS));
        push_filters(&mut query, clinic_id, filter);
        if filter.low_stock_only {
            query.push(" ORDER BY stock_quantity, name COLLATE NOCASE");
        } else {
            query.push(" ORDER BY name COLLATE NOCASE");
        }
        query
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<ProductRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let items = rows
            .into_iter()
            .map(ProductRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, to_u64(total), page))
    }

    async fn sku_taken(
        &self,
        clinic_id: Uuid,
        sku: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM products WHERE clinic_id = ? AND sku = ? AND is_active = 1 AND id != ?",
        )
        .bind(clinic_id.to_string())
        .bind(sku)
        .bind(exclude.map(|id| id.to_string()).unwrap_or_default())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(count > 0)
    }

    async fn adjust_stock(
        &self,
        movement: &StockMovementRecord,
    ) -> Result<Option<ProductRecord>, RepositoryError> {
        let product_id = movement.product_id.to_string();
        let clinic_id = movement.clinic_id.to_string();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // 条件更新：结果为负时不命中任何行
        let result = sqlx::query(
            r#"
            UPDATE products SET stock_quantity = stock_quantity + ?, updated_at = ?
            WHERE id = ? AND clinic_id = ? AND is_active = 1 AND stock_quantity + ? >= 0
            "#,
        )
        .bind(movement.delta)
        .bind(ts(Utc::now()))
        .bind(&product_id)
        .bind(&clinic_id)
        .bind(movement.delta)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(db_error)?;
            return Ok(None);
        }

        let row: ProductRow = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE id = ? AND clinic_id = ?",
            PRODUCT_COLUMNS
        ))
        .bind(&product_id)
        .bind(&clinic_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        let product = ProductRecord::try_from(row)?;

        sqlx::query(
            r#"
            INSERT INTO stock_movements (id, product_id, clinic_id, delta, quantity_after, reason, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(movement.id.to_string())
        .bind(&product_id)
        .bind(&clinic_id)
        .bind(movement.delta)
        .bind(product.stock_quantity)
        .bind(&movement.reason)
        .bind(movement.created_by.to_string())
        .bind(ts(movement.created_at))
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(Some(product))
    }
}
