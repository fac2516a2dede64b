//! SQLite Dashboard Repository - 聚合统计

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::rows::{db_error, parse_date, parse_enum, parse_uuid, to_u64, ts};
use super::DbPool;
use crate::application::ports::{DashboardRepositoryPort, RecentMedicalRecord, RepositoryError};
use crate::domain::billing::InvoiceStatus;
use crate::domain::scheduling::AppointmentStatus;

/// SQLite Dashboard Repository
pub struct SqliteDashboardRepository {
    pool: DbPool,
}

impl SqliteDashboardRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn scalar(&self, sql: &str, binds: &[String]) -> Result<i64, RepositoryError> {
        let mut query = sqlx::query_as::<_, (i64,)>(sql);
        for value in binds {
            query = query.bind(value.as_str());
        }
        let (value,) = query.fetch_one(&self.pool).await.map_err(db_error)?;
        Ok(value)
    }
}

#[derive(FromRow)]
struct RecentRecordRow {
    id: String,
    patient_id: String,
    patient_name: String,
    visit_date: String,
    chief_complaint: String,
}

impl TryFrom<RecentRecordRow> for RecentMedicalRecord {
    type Error = RepositoryError;

    fn try_from(row: RecentRecordRow) -> Result<Self, Self::Error> {
        Ok(RecentMedicalRecord {
            id: parse_uuid(&row.id)?,
            patient_id: parse_uuid(&row.patient_id)?,
            patient_name: row.patient_name,
            visit_date: parse_date(&row.visit_date)?,
            chief_complaint: row.chief_complaint,
        })
    }
}

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[async_trait]
impl DashboardRepositoryPort for SqliteDashboardRepository {
    async fn count_active_patients(&self, clinic_id: Uuid) -> Result<u64, RepositoryError> {
        let count = self
            .scalar(
                "SELECT COUNT(*) FROM patients WHERE clinic_id = ? AND is_active = 1",
                &[clinic_id.to_string()],
            )
            .await?;
        Ok(to_u64(count))
    }

    async fn appointment_counts_on(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<(AppointmentStatus, u64)>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*) FROM appointments
            WHERE clinic_id = ? AND date = ? AND is_active = 1
            GROUP BY status
            "#,
        )
        .bind(clinic_id.to_string())
        .bind(day(date))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|(status, count)| Ok((parse_enum(&status)?, to_u64(count))))
            .collect()
    }

    async fn count_upcoming(
        &self,
        clinic_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<u64, RepositoryError> {
        let count = self
            .scalar(
                r#"
                SELECT COUNT(*) FROM appointments
                WHERE clinic_id = ? AND is_active = 1 AND date >= ? AND date <= ?
                  AND status IN (?, ?)
                "#,
                &[
                    clinic_id.to_string(),
                    day(from),
                    day(to),
                    AppointmentStatus::Scheduled.as_str().to_string(),
                    AppointmentStatus::Confirmed.as_str().to_string(),
                ],
            )
            .await?;
        Ok(to_u64(count))
    }

    async fn revenue_between(
        &self,
        clinic_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        self.scalar(
            r#"
            SELECT COALESCE(SUM(p.amount_cents), 0)
            FROM payments p
            JOIN invoices i ON i.id = p.invoice_id
            WHERE p.clinic_id = ? AND i.is_active = 1 AND p.paid_at >= ? AND p.paid_at < ?
            "#,
            &[clinic_id.to_string(), ts(from), ts(to)],
        )
        .await
    }

    async fn outstanding_balance(&self, clinic_id: Uuid) -> Result<i64, RepositoryError> {
        self.scalar(
            r#"
            SELECT COALESCE(SUM(i.total_cents - COALESCE(
                (SELECT SUM(p.amount_cents) FROM payments p WHERE p.invoice_id = i.id), 0)), 0)
            FROM invoices i
            WHERE i.clinic_id = ? AND i.is_active = 1 AND i.status IN (?, ?)
            "#,
            &[
                clinic_id.to_string(),
                InvoiceStatus::Sent.as_str().to_string(),
                InvoiceStatus::Partial.as_str().to_string(),
            ],
        )
        .await
    }

    async fn count_low_stock(&self, clinic_id: Uuid) -> Result<u64, RepositoryError> {
        let count = self
            .scalar(
                r#"
                SELECT COUNT(*) FROM products
                WHERE clinic_id = ? AND is_active = 1 AND stock_quantity <= min_stock
                "#,
                &[clinic_id.to_string()],
            )
            .await?;
        Ok(to_u64(count))
    }

    async fn recent_medical_records(
        &self,
        clinic_id: Uuid,
        limit: u32,
    ) -> Result<Vec<RecentMedicalRecord>, RepositoryError> {
        let rows: Vec<RecentRecordRow> = sqlx::query_as(
            r#"
            SELECT m.id, m.patient_id, p.name AS patient_name, m.visit_date, m.chief_complaint
            FROM medical_records m
            JOIN patients p ON p.id = m.patient_id
            WHERE m.clinic_id = ? AND m.is_active = 1
            ORDER BY m.visit_date DESC, m.created_at DESC
            LIMIT ?
            "#,
        )
        .bind(clinic_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(RecentMedicalRecord::try_from).collect()
    }
}
