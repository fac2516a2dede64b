//! SQLite Patient Repository

use async_trait::async_trait;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use super::rows::{
    db_error, like_pattern, parse_enum, parse_opt_date, parse_ts, parse_uuid, to_u64, ts,
};
use super::DbPool;
use crate::application::ports::{
    Page, PageRequest, PatientFilter, PatientRecord, PatientRepositoryPort, RepositoryError,
};

const PATIENT_COLUMNS: &str = "id, clinic_id, name, species, breed, sex, birth_date, weight_kg, \
                               microchip_id, color, owner_name, owner_phone, owner_email, notes, \
                               is_active, created_at, updated_at";

/// SQLite Patient Repository
pub struct SqlitePatientRepository {
    pool: DbPool,
}

impl SqlitePatientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct PatientRow {
    id: String,
    clinic_id: String,
    name: String,
    species: String,
    breed: Option<String>,
    sex: String,
    birth_date: Option<String>,
    weight_kg: Option<f64>,
    microchip_id: Option<String>,
    color: Option<String>,
    owner_name: String,
    owner_phone: Option<String>,
    owner_email: Option<String>,
    notes: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PatientRow> for PatientRecord {
    type Error = RepositoryError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        Ok(PatientRecord {
            id: parse_uuid(&row.id)?,
            clinic_id: parse_uuid(&row.clinic_id)?,
            name: row.name,
            species: parse_enum(&row.species)?,
            breed: row.breed,
            sex: parse_enum(&row.sex)?,
            birth_date: parse_opt_date(row.birth_date)?,
            weight_kg: row.weight_kg,
            microchip_id: row.microchip_id,
            color: row.color,
            owner_name: row.owner_name,
            owner_phone: row.owner_phone,
            owner_email: row.owner_email,
            notes: row.notes,
            is_active: row.is_active,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, clinic_id: Uuid, filter: &PatientFilter) {
    qb.push(" WHERE clinic_id = ")
        .push_bind(clinic_id.to_string())
        .push(" AND is_active = 1");

    if let Some(species) = filter.species {
        qb.push(" AND species = ").push_bind(species.as_str());
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (LOWER(name) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(owner_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(COALESCE(microchip_id, '')) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

#[async_trait]
impl PatientRepositoryPort for SqlitePatientRepository {
    async fn insert(&self, patient: &PatientRecord) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO patients ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            PATIENT_COLUMNS
        ))
        .bind(patient.id.to_string())
        .bind(patient.clinic_id.to_string())
        .bind(&patient.name)
        .bind(patient.species.as_str())
        .bind(&patient.breed)
        .bind(patient.sex.as_str())
        .bind(patient.birth_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(patient.weight_kg)
        .bind(&patient.microchip_id)
        .bind(&patient.color)
        .bind(&patient.owner_name)
        .bind(&patient.owner_phone)
        .bind(&patient.owner_email)
        .bind(&patient.notes)
        .bind(patient.is_active)
        .bind(ts(patient.created_at))
        .bind(ts(patient.updated_at))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn update(&self, patient: &PatientRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE patients SET
                name = ?, species = ?, breed = ?, sex = ?, birth_date = ?, weight_kg = ?,
                microchip_id = ?, color = ?, owner_name = ?, owner_phone = ?, owner_email = ?,
                notes = ?, is_active = ?, updated_at = ?
            WHERE id = ? AND clinic_id = ?
            "#,
        )
        .bind(&patient.name)
        .bind(patient.species.as_str())
        .bind(&patient.breed)
        .bind(patient.sex.as_str())
        .bind(patient.birth_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(patient.weight_kg)
        .bind(&patient.microchip_id)
        .bind(&patient.color)
        .bind(&patient.owner_name)
        .bind(&patient.owner_phone)
        .bind(&patient.owner_email)
        .bind(&patient.notes)
        .bind(patient.is_active)
        .bind(ts(patient.updated_at))
        .bind(patient.id.to_string())
        .bind(patient.clinic_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("patient {}", patient.id)));
        }
        Ok(())
    }

    async fn find(&self, clinic_id: Uuid, id: Uuid) -> Result<Option<PatientRecord>, RepositoryError> {
        let row: Option<PatientRow> = sqlx::query_as(&format!(
            "SELECT {} FROM patients WHERE id = ? AND clinic_id = ? AND is_active = 1",
            PATIENT_COLUMNS
        ))
        .bind(id.to_string())
        .bind(clinic_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(PatientRecord::try_from).transpose()
    }

    async fn list(
        &self,
        clinic_id: Uuid,
        filter: &PatientFilter,
        page: PageRequest,
    ) -> Result<Page<PatientRecord>, RepositoryError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM patients");
        push_filters(&mut count, clinic_id, filter);
        let (total,): (i64,) = count
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM patients", PATIENT_COLUMNS));
        push_filters(&mut query, clinic_id, filter);
        query
            .push(" ORDER BY name COLLATE NOCASE, created_at LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<PatientRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let items = rows
            .into_iter()
            .map(PatientRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, to_u64(total), page))
    }

    async fn microchip_taken(
        &self,
        clinic_id: Uuid,
        microchip_id: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM patients
            WHERE clinic_id = ? AND microchip_id = ? AND is_active = 1 AND id != ?
            "#,
        )
        .bind(clinic_id.to_string())
        .bind(microchip_id)
        .bind(exclude.map(|id| id.to_string()).unwrap_or_default())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{memory_pool, patient, seed_clinic, seed_user};
    use super::*;
    use crate::domain::patient::Species;

    #[tokio::test]
    async fn test_list_filters_search_and_soft_delete() {
        let pool = memory_pool().await;
        let owner = seed_user(&pool, "owner@example.com").await;
        let clinic_id = seed_clinic(&pool, owner).await;
        let repo = SqlitePatientRepository::new(pool);

        let rex = patient(clinic_id, "Rex", "Ann Smith");
        let mut tom = patient(clinic_id, "Tom", "Bob Jones");
        tom.species = Species::Cat;
        tom.microchip_id = Some("985112000123456".to_string());
        let mut gone = patient(clinic_id, "Ghost", "Ann Smith");
        gone.is_active = false;
        for p in [&rex, &tom, &gone] {
            repo.insert(p).await.unwrap();
        }

        let all = repo
            .list(clinic_id, &PatientFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].name, "Rex");

        let by_owner = PatientFilter {
            search: Some("smith".to_string()),
            ..Default::default()
        };
        let found = repo.list(clinic_id, &by_owner, PageRequest::default()).await.unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].id, rex.id);

        let by_chip = PatientFilter {
            search: Some("123456".to_string()),
            species: Some(Species::Cat),
        };
        let found = repo.list(clinic_id, &by_chip, PageRequest::default()).await.unwrap();
        assert_eq!(found.items[0].id, tom.id);

        assert!(repo.find(clinic_id, gone.id).await.unwrap().is_none());
        assert!(repo.find(Uuid::new_v4(), rex.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_microchip_unique_among_active() {
        let pool = memory_pool().await;
        let owner = seed_user(&pool, "owner@example.com").await;
        let clinic_id = seed_clinic(&pool, owner).await;
        let repo = SqlitePatientRepository::new(pool);

        let mut first = patient(clinic_id, "Rex", "Ann");
        first.microchip_id = Some("ABC123456".to_string());
        repo.insert(&first).await.unwrap();

        assert!(repo.microchip_taken(clinic_id, "ABC123456", None).await.unwrap());
        assert!(!repo
            .microchip_taken(clinic_id, "ABC123456", Some(first.id))
            .await
            .unwrap());

        let mut second = patient(clinic_id, "Max", "Ann");
        second.microchip_id = first.microchip_id.clone();
        let err = repo.insert(&second).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));

        // 软删除后芯片号可复用
        first.is_active = false;
        repo.update(&first).await.unwrap();
        repo.insert(&second).await.unwrap();
    }
}
