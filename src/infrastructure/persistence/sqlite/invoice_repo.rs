//! SQLite Invoice Repository
//!
//! 发票头、明细与付款分表存储；已付金额始终由付款表汇总

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, Transaction};
use uuid::Uuid;

use super::rows::{
    db_error, like_pattern, parse_enum, parse_opt_date, parse_opt_ts, parse_opt_uuid, parse_ts,
    parse_uuid, to_u32, to_u64, ts,
};
use super::DbPool;
use crate::application::ports::{
    InvoiceFilter, InvoiceRecord, InvoiceRepositoryPort, Page, PageRequest, PaymentRecord,
    RepositoryError,
};
use crate::domain::billing::{InvoiceStatus, InvoiceTotals, LineItem, PaymentOutcome};

const INVOICE_SELECT: &str = r#"
    SELECT i.id, i.clinic_id, i.patient_id, i.invoice_number, i.status, i.subtotal_cents,
           i.tax_rate_bp, i.tax_cents, i.discount_cents, i.total_cents, i.due_date, i.notes,
           i.issued_at, i.paid_at, i.is_active, i.created_by, i.created_at, i.updated_at,
           COALESCE((SELECT SUM(p.amount_cents) FROM payments p WHERE p.invoice_id = i.id), 0)
               AS amount_paid_cents
    FROM invoices i"#;

/// SQLite Invoice Repository
pub struct SqliteInvoiceRepository {
    pool: DbPool,
}

impl SqliteInvoiceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, invoice_id: &str) -> Result<Vec<LineItem>, RepositoryError> {
        let rows: Vec<LineItemRow> = sqlx::query_as(
            r#"
            SELECT description, quantity, unit_price_cents, product_id
            FROM invoice_items WHERE invoice_id = ? ORDER BY position
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(LineItem::try_from).collect()
    }

    async fn hydrate(&self, row: InvoiceRow) -> Result<InvoiceRecord, RepositoryError> {
        let items = self.load_items(&row.id).await?;
        row.into_record(items)
    }
}

#[derive(FromRow)]
struct InvoiceRow {
    id: String,
    clinic_id: String,
    patient_id: Option<String>,
    invoice_number: String,
    status: String,
    subtotal_cents: i64,
    tax_rate_bp: i64,
    tax_cents: i64,
    discount_cents: i64,
    total_cents: i64,
    due_date: Option<String>,
    notes: Option<String>,
    issued_at: Option<String>,
    paid_at: Option<String>,
    is_active: bool,
    created_by: String,
    created_at: String,
    updated_at: String,
    amount_paid_cents: i64,
}

impl InvoiceRow {
    fn into_record(self, items: Vec<LineItem>) -> Result<InvoiceRecord, RepositoryError> {
        Ok(InvoiceRecord {
            id: parse_uuid(&self.id)?,
            clinic_id: parse_uuid(&self.clinic_id)?,
            patient_id: parse_opt_uuid(self.patient_id)?,
            invoice_number: self.invoice_number,
            status: parse_enum(&self.status)?,
            items,
            totals: InvoiceTotals {
                subtotal_cents: self.subtotal_cents,
                tax_rate_bp: to_u32("tax_rate_bp", self.tax_rate_bp)?,
                tax_cents: self.tax_cents,
                discount_cents: self.discount_cents,
                total_cents: self.total_cents,
            },
            amount_paid_cents: self.amount_paid_cents,
            due_date: parse_opt_date(self.due_date)?,
            notes: self.notes,
            issued_at: parse_opt_ts(self.issued_at)?,
            paid_at: parse_opt_ts(self.paid_at)?,
            is_active: self.is_active,
            created_by: parse_uuid(&self.created_by)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct LineItemRow {
    description: String,
    quantity: i64,
    unit_price_cents: i64,
    product_id: Option<String>,
}

impl TryFrom<LineItemRow> for LineItem {
    type Error = RepositoryError;

    fn try_from(row: LineItemRow) -> Result<Self, Self::Error> {
        Ok(LineItem {
            description: row.description,
            quantity: to_u32("quantity", row.quantity)?,
            unit_price_cents: row.unit_price_cents,
            product_id: parse_opt_uuid(row.product_id)?,
        })
    }
}

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    invoice_id: String,
    clinic_id: String,
    amount_cents: i64,
    method: String,
    reference: Option<String>,
    paid_at: String,
    recorded_by: String,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = RepositoryError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(PaymentRecord {
            id: parse_uuid(&row.id)?,
            invoice_id: parse_uuid(&row.invoice_id)?,
            clinic_id: parse_uuid(&row.clinic_id)?,
            amount_cents: row.amount_cents,
            method: parse_enum(&row.method)?,
            reference: row.reference,
            paid_at: parse_ts(&row.paid_at)?,
            recorded_by: parse_uuid(&row.recorded_by)?,
        })
    }
}

async fn replace_items(
    tx: &mut Transaction<'_, Sqlite>,
    invoice_id: &str,
    items: &[LineItem],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
        .bind(invoice_id)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;

    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO invoice_items (invoice_id, position, description, quantity, unit_price_cents, product_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(invoice_id)
        .bind(position as i64)
        .bind(&item.description)
        .bind(i64::from(item.quantity))
        .bind(item.unit_price_cents)
        .bind(item.product_id.map(|id| id.to_string()))
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;
    }

    Ok(())
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, clinic_id: Uuid, filter: &InvoiceFilter) {
    qb.push(" WHERE i.clinic_id = ")
        .push_bind(clinic_id.to_string())
        .push(" AND i.is_active = 1");

    if let Some(status) = filter.status {
        qb.push(" AND i.status = ").push_bind(status.as_str());
    }
    if let Some(patient) = filter.patient_id {
        qb.push(" AND i.patient_id = ").push_bind(patient.to_string());
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        qb.push(" AND LOWER(i.invoice_number) LIKE ")
            .push_bind(like_pattern(search))
            .push(" ESCAPE '\\'");
    }
}

#[async_trait]
impl InvoiceRepositoryPort for SqliteInvoiceRepository {
    async fn insert(&self, invoice: &InvoiceRecord) -> Result<(), RepositoryError> {
        let id = invoice.id.to_string();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO invoices (id, clinic_id, patient_id, invoice_number, status, subtotal_cents,
                                  tax_rate_bp, tax_cents, discount_cents, total_cents, due_date, notes,
                                  issued_at, paid_at, is_active, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(invoice.clinic_id.to_string())
        .bind(invoice.patient_id.map(|id| id.to_string()))
        .bind(&invoice.invoice_number)
        .bind(invoice.status.as_str())
        .bind(invoice.totals.subtotal_cents)
        .bind(i64::from(invoice.totals.tax_rate_bp))
        .bind(invoice.totals.tax_cents)
        .bind(invoice.totals.discount_cents)
        .bind(invoice.totals.total_cents)
        .bind(invoice.due_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(&invoice.notes)
        .bind(invoice.issued_at.map(ts))
        .bind(invoice.paid_at.map(ts))
        .bind(invoice.is_active)
        .bind(invoice.created_by.to_string())
        .bind(ts(invoice.created_at))
        .bind(ts(invoice.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        replace_items(&mut tx, &id, &invoice.items).await?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn update(&self, invoice: &InvoiceRecord) -> Result<(), RepositoryError> {
        let id = invoice.id.to_string();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                patient_id = ?, status = ?, subtotal_cents = ?, tax_rate_bp = ?, tax_cents = ?,
                discount_cents = ?, total_cents = ?, due_date = ?, notes = ?, issued_at = ?,
                paid_at = ?, is_active = ?, updated_at = ?
            WHERE id = ? AND clinic_id = ?
            "#,
        )
        .bind(invoice.patient_id.map(|id| id.to_string()))
        .bind(invoice.status.as_str())
        .bind(invoice.totals.subtotal_cents)
        .bind(i64::from(invoice.totals.tax_rate_bp))
        .bind(invoice.totals.tax_cents)
        .bind(invoice.totals.discount_cents)
        .bind(invoice.totals.total_cents)
        .bind(invoice.due_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(&invoice.notes)
        .bind(invoice.issued_at.map(ts))
        .bind(invoice.paid_at.map(ts))
        .bind(invoice.is_active)
        .bind(ts(invoice.updated_at))
        .bind(&id)
        .bind(invoice.clinic_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("invoice {}", invoice.id)));
        }

        replace_items(&mut tx, &id, &invoice.items).await?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn find(&self, clinic_id: Uuid, id: Uuid) -> Result<Option<InvoiceRecord>, RepositoryError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "{} WHERE i.id = ? AND i.clinic_id = ? AND i.is_active = 1",
            INVOICE_SELECT
        ))
        .bind(id.to_string())
        .bind(clinic_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        clinic_id: Uuid,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> Result<Page<InvoiceRecord>, RepositoryError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM invoices i");
        push_filters(&mut count, clinic_id, filter);
        let (total,): (i64,) = count
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let mut query = QueryBuilder::<Sqlite>::new(INVOICE_SELECT);
        push_filters(&mut query, clinic_id, filter);
        query
            .push(" ORDER BY i.created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<InvoiceRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(self.hydrate(row).await?);
        }
        Ok(Page::new(items, to_u64(total), page))
    }

    async fn count_numbers_with_prefix(
        &self,
        clinic_id: Uuid,
        prefix: &str,
    ) -> Result<u32, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM invoices WHERE clinic_id = ? AND substr(invoice_number, 1, ?) = ?",
        )
        .bind(clinic_id.to_string())
        .bind(prefix.len() as i64)
        .bind(prefix)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        to_u32("invoice count", count)
    }

    async fn payments(&self, invoice_id: Uuid) -> Result<Vec<PaymentRecord>, RepositoryError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, invoice_id, clinic_id, amount_cents, method, reference, paid_at, recorded_by
            FROM payments WHERE invoice_id = ? ORDER BY paid_at, rowid
            "#,
        )
        .bind(invoice_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(PaymentRecord::try_from).collect()
    }

    async fn record_payment(
        &self,
        payment: &PaymentRecord,
    ) -> Result<Option<PaymentOutcome>, RepositoryError> {
        let invoice_id = payment.invoice_id.to_string();
        let clinic_id = payment.clinic_id.to_string();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // 条件插入：余额与状态在同一条语句内重新核对，写入后事务持有写锁
        let result = sqlx::query(
            r#"
            INSERT INTO payments (id, invoice_id, clinic_id, amount_cents, method, reference, paid_at, recorded_by)
            SELECT ?, i.id, i.clinic_id, ?, ?, ?, ?, ?
            FROM invoices i
            WHERE i.id = ? AND i.clinic_id = ? AND i.is_active = 1
              AND i.status IN (?, ?)
              AND COALESCE((SELECT SUM(p.amount_cents) FROM payments p WHERE p.invoice_id = i.id), 0) + ?
                  <= i.total_cents
            "#,
        )
        .bind(payment.id.to_string())
        .bind(payment.amount_cents)
        .bind(payment.method.as_str())
        .bind(&payment.reference)
        .bind(ts(payment.paid_at))
        .bind(payment.recorded_by.to_string())
        .bind(&invoice_id)
        .bind(&clinic_id)
        .bind(InvoiceStatus::Sent.as_str())
        .bind(InvoiceStatus::Partial.as_str())
        .bind(payment.amount_cents)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(db_error)?;
            return Ok(None);
        }

        let (total_cents, amount_paid_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT i.total_cents,
                   COALESCE((SELECT SUM(p.amount_cents) FROM payments p WHERE p.invoice_id = i.id), 0)
            FROM invoices i WHERE i.id = ?
            "#,
        )
        .bind(&invoice_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        let outcome = PaymentOutcome::from_totals(total_cents, amount_paid_cents);
        let paid_at = outcome.is_fully_paid().then(|| ts(payment.paid_at));

        sqlx::query(
            "UPDATE invoices SET status = ?, paid_at = ?, updated_at = ? WHERE id = ? AND clinic_id = ?",
        )
        .bind(outcome.status.as_str())
        .bind(paid_at)
        .bind(ts(Utc::now()))
        .bind(&invoice_id)
        .bind(&clinic_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{memory_pool, seed_clinic, seed_user};
    use super::*;
    use crate::domain::billing::PaymentMethod;

    fn invoice(clinic_id: Uuid, created_by: Uuid, number: &str) -> InvoiceRecord {
        let items = vec![
            LineItem::new("Consultation", 1, 5_000, None).unwrap(),
            LineItem::new("Vaccine", 2, 2_500, None).unwrap(),
        ];
        let totals = InvoiceTotals::compute(&items, 0, 0).unwrap();
        let now = Utc::now();
        InvoiceRecord {
            id: Uuid::new_v4(),
            clinic_id,
            patient_id: None,
            invoice_number: number.to_string(),
            status: InvoiceStatus::Sent,
            items,
            totals,
            amount_paid_cents: 0,
            due_date: None,
            notes: None,
            issued_at: Some(now),
            paid_at: None,
            is_active: true,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_items_round_trip_in_order() {
        let pool = memory_pool().await;
        let owner = seed_user(&pool, "owner@example.com").await;
        let clinic_id = seed_clinic(&pool, owner).await;
        let repo = SqliteInvoiceRepository::new(pool);

        let mut record = invoice(clinic_id, owner, "INV-203001-0001");
        repo.insert(&record).await.unwrap();
        let stored = repo.find(clinic_id, record.id).await.unwrap().unwrap();
        assert_eq!(stored.items, record.items);
        assert_eq!(stored.totals.total_cents, 10_000);

        record.items.truncate(1);
        record.totals = InvoiceTotals::compute(&record.items, 0, 0).unwrap();
        repo.update(&record).await.unwrap();
        let stored = repo.find(clinic_id, record.id).await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.totals.total_cents, 5_000);
    }

    #[tokio::test]
    async fn test_duplicate_number_and_prefix_count() {
        let pool = memory_pool().await;
        let owner = seed_user(&pool, "owner@example.com").await;
        let clinic_id = seed_clinic(&pool, owner).await;
        let repo = SqliteInvoiceRepository::new(pool);

        let mut first = invoice(clinic_id, owner, "INV-203001-0001");
        repo.insert(&first).await.unwrap();
        let err = repo
            .insert(&invoice(clinic_id, owner, "INV-203001-0001"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));

        // 已删除的发票仍占用编号
        first.is_active = false;
        repo.update(&first).await.unwrap();
        repo.insert(&invoice(clinic_id, owner, "INV-203002-0001")).await.unwrap();

        assert_eq!(repo.count_numbers_with_prefix(clinic_id, "INV-203001-").await.unwrap(), 1);
        assert_eq!(repo.count_numbers_with_prefix(clinic_id, "INV-203003-").await.unwrap(), 0);

        let page = repo
            .list(clinic_id, &InvoiceFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_record_payment_sums_paid_amount() {
        let pool = memory_pool().await;
        let owner = seed_user(&pool, "owner@example.com").await;
        let clinic_id = seed_clinic(&pool, owner).await;
        let repo = SqliteInvoiceRepository::new(pool);

        let record = invoice(clinic_id, owner, "INV-203001-0001");
        repo.insert(&record).await.unwrap();

        let payment = PaymentRecord {
            id: Uuid::new_v4(),
            invoice_id: record.id,
            clinic_id,
            amount_cents: 4_000,
            method: PaymentMethod::Card,
            reference: None,
            paid_at: Utc::now(),
            recorded_by: owner,
        };
        let outcome = repo.record_payment(&payment).await.unwrap().unwrap();
        assert_eq!(outcome.status, InvoiceStatus::Partial);
        assert_eq!(outcome.balance_cents, 6_000);

        let stored = repo.find(clinic_id, record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Partial);
        assert_eq!(stored.amount_paid_cents, 4_000);
        assert_eq!(stored.balance_cents(), 6_000);
        assert_eq!(repo.payments(record.id).await.unwrap().len(), 1);

        let filter = InvoiceFilter {
            search: Some("203001".to_string()),
            status: Some(InvoiceStatus::Partial),
            ..Default::default()
        };
        let page = repo.list(clinic_id, &filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.items[0].amount_paid_cents, 4_000);
    }

    #[tokio::test]
    async fn test_record_payment_rechecks_balance_in_database() {
        let pool = memory_pool().await;
        let owner = seed_user(&pool, "owner@example.com").await;
        let clinic_id = seed_clinic(&pool, owner).await;
        let repo = SqliteInvoiceRepository::new(pool);

        let record = invoice(clinic_id, owner, "INV-203001-0001");
        repo.insert(&record).await.unwrap();

        let payment = |amount_cents: i64| PaymentRecord {
            id: Uuid::new_v4(),
            invoice_id: record.id,
            clinic_id,
            amount_cents,
            method: PaymentMethod::Cash,
            reference: None,
            paid_at: Utc::now(),
            recorded_by: owner,
        };

        assert!(repo.record_payment(&payment(7_000)).await.unwrap().is_some());
        // 余额只剩 3000，超额付款不落库
        assert!(repo.record_payment(&payment(7_000)).await.unwrap().is_none());
        assert_eq!(repo.payments(record.id).await.unwrap().len(), 1);

        let outcome = repo.record_payment(&payment(3_000)).await.unwrap().unwrap();
        assert_eq!(outcome.status, InvoiceStatus::Paid);
        assert_eq!(outcome.amount_paid_cents, 10_000);

        let stored = repo.find(clinic_id, record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Paid);
        assert!(stored.paid_at.is_some());

        // 已付清的发票不再接受付款
        assert!(repo.record_payment(&payment(1)).await.unwrap().is_none());
    }
}
