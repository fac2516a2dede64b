//! SQLite Medical Record Repository

use async_trait::async_trait;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use super::rows::{db_error, parse_date, parse_opt_uuid, parse_ts, parse_uuid, to_u64, ts};
use super::DbPool;
use crate::application::ports::{
    MedicalRecordEntry, MedicalRecordFilter, MedicalRecordRepositoryPort, Page, PageRequest,
    RepositoryError,
};

const RECORD_COLUMNS: &str = "id, clinic_id, patient_id, veterinarian_id, appointment_id, \
                              visit_date, chief_complaint, diagnosis, treatment, prescriptions, \
                              weight_kg, temperature_c, notes, is_active, created_at, updated_at";

/// SQLite Medical Record Repository
pub struct SqliteMedicalRecordRepository {
    pool: DbPool,
}

impl SqliteMedicalRecordRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct MedicalRecordRow {
    id: String,
    clinic_id: String,
    patient_id: String,
    veterinarian_id: String,
    appointment_id: Option<String>,
    visit_date: String,
    chief_complaint: String,
    diagnosis: Option<String>,
    treatment: Option<String>,
    prescriptions: Option<String>,
    weight_kg: Option<f64>,
    temperature_c: Option<f64>,
    notes: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<MedicalRecordRow> for MedicalRecordEntry {
    type Error = RepositoryError;

    fn try_from(row: MedicalRecordRow) -> Result<Self, Self::Error> {
        Ok(MedicalRecordEntry {
            id: parse_uuid(&row.id)?,
            clinic_id: parse_uuid(&row.clinic_id)?,
            patient_id: parse_uuid(&row.patient_id)?,
            veterinarian_id: parse_uuid(&row.veterinarian_id)?,
            appointment_id: parse_opt_uuid(row.appointment_id)?,
            visit_date: parse_date(&row.visit_date)?,
            chief_complaint: row.chief_complaint,
            diagnosis: row.diagnosis,
            treatment: row.treatment,
            prescriptions: row.prescriptions,
            weight_kg: row.weight_kg,
            temperature_c: row.temperature_c,
            notes: row.notes,
            is_active: row.is_active,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, clinic_id: Uuid, filter: &MedicalRecordFilter) {
    qb.push(" WHERE clinic_id = ")
        .push_bind(clinic_id.to_string())
        .push(" AND is_active = 1");

    if let Some(patient) = filter.patient_id {
        qb.push(" AND patient_id = ").push_bind(patient.to_string());
    }
}

#[async_trait]
impl MedicalRecordRepositoryPort for SqliteMedicalRecordRepository {
    async fn insert(&self, record: &MedicalRecordEntry) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO medical_records ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            RECORD_COLUMNS
        ))
        .bind(record.id.to_string())
        .bind(record.clinic_id.to_string())
        .bind(record.patient_id.to_string())
        .bind(record.veterinarian_id.to_string())
        .bind(record.appointment_id.map(|id| id.to_string()))
        .bind(record.visit_date.format("%Y-%m-%d").to_string())
        .bind(&record.chief_complaint)
        .bind(&record.diagnosis)
        .bind(&record.treatment)
        .bind(&record.prescriptions)
        .bind(record.weight_kg)
        .bind(record.temperature_c)
        .bind(&record.notes)
        .bind(record.is_active)
        .bind(ts(record.created_at))
        .bind(ts(record.updated_at))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn update(&self, record: &MedicalRecordEntry) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE medical_records SET
                visit_date = ?, chief_complaint = ?, diagnosis = ?, treatment = ?,
                prescriptions = ?, weight_kg = ?, temperature_c = ?, notes = ?, is_active = ?,
                updated_at = ?
            WHERE id = ? AND clinic_id = ?
            "#,
        )
        .bind(record.visit_date.format("%Y-%m-%d").to_string())
        .bind(&record.chief_complaint)
        .bind(&record.diagnosis)
        .bind(&record.treatment)
        .bind(&record.prescriptions)
        .bind(record.weight_kg)
        .bind(record.temperature_c)
        .bind(&record.notes)
        .bind(record.is_active)
        .bind(ts(record.updated_at))
        .bind(record.id.to_string())
        .bind(record.clinic_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("medical record {}", record.id)));
        }
        Ok(())
    }

    async fn find(
        &self,
        clinic_id: Uuid,
        id: Uuid,
    ) -> Result<Option<MedicalRecordEntry>, RepositoryError> {
        let row: Option<MedicalRecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM medical_records WHERE id = ? AND clinic_id = ? AND is_active = 1",
            RECORD_COLUMNS
        ))
        .bind(id.to_string())
        .bind(clinic_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(MedicalRecordEntry::try_from).transpose()
    }

    async fn list(
        &self,
        clinic_id: Uuid,
        filter: &MedicalRecordFilter,
        page: PageRequest,
    ) -> Result<Page<MedicalRecordEntry>, RepositoryError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM medical_records");
        push_filters(&mut count, clinic_id, filter);
        let (total,): (i64,) = count
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM medical_records", RECORD_COLUMNS));
        push_filters(&mut query, clinic_id, filter);
        query
            .push(" ORDER BY visit_date DESC, created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<MedicalRecordRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let items = rows
            .into_iter()
            .map(MedicalRecordEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, to_u64(total), page))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{memory_pool, seed_clinic, seed_patient, seed_user};
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn entry(clinic_id: Uuid, patient_id: Uuid, vet: Uuid, visit: NaiveDate) -> MedicalRecordEntry {
        let now = Utc::now();
        MedicalRecordEntry {
            id: Uuid::new_v4(),
            clinic_id,
            patient_id,
            veterinarian_id: vet,
            appointment_id: None,
            visit_date: visit,
            chief_complaint: "Limping".to_string(),
            diagnosis: None,
            treatment: None,
            prescriptions: None,
            weight_kg: Some(10.2),
            temperature_c: Some(38.5),
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_list_newest_visit_first_per_patient() {
        let pool = memory_pool().await;
        let vet = seed_user(&pool, "vet@example.com").await;
        let clinic_id = seed_clinic(&pool, vet).await;
        let rex = seed_patient(&pool, clinic_id, "Rex").await;
        let tom = seed_patient(&pool, clinic_id, "Tom").await;
        let repo = SqliteMedicalRecordRepository::new(pool);

        let old = entry(clinic_id, rex.id, vet, NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        let new = entry(clinic_id, rex.id, vet, NaiveDate::from_ymd_opt(2030, 2, 1).unwrap());
        let other = entry(clinic_id, tom.id, vet, NaiveDate::from_ymd_opt(2030, 3, 1).unwrap());
        for r in [&old, &new, &other] {
            repo.insert(r).await.unwrap();
        }

        let filter = MedicalRecordFilter {
            patient_id: Some(rex.id),
        };
        let page = repo.list(clinic_id, &filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, new.id);
        assert_eq!(page.items[1].id, old.id);

        let mut deleted = other.clone();
        deleted.is_active = false;
        repo.update(&deleted).await.unwrap();
        assert!(repo.find(clinic_id, other.id).await.unwrap().is_none());
    }
}
