//! SQLite Clinic / ClinicAccess Repositories

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::rows::{db_error, parse_enum, parse_ts, parse_uuid, to_u64, ts};
use super::DbPool;
use crate::application::ports::{
    ClinicAccessRecord, ClinicAccessRepositoryPort, ClinicMember, ClinicMembership, ClinicRecord,
    ClinicRepositoryPort, RepositoryError,
};
use crate::domain::ClinicRole;

/// SQLite Clinic Repository
pub struct SqliteClinicRepository {
    pool: DbPool,
}

impl SqliteClinicRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ClinicRow {
    id: String,
    name: String,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ClinicRow> for ClinicRecord {
    type Error = RepositoryError;

    fn try_from(row: ClinicRow) -> Result<Self, Self::Error> {
        Ok(ClinicRecord {
            id: parse_uuid(&row.id)?,
            name: row.name,
            address: row.address,
            phone: row.phone,
            email: row.email,
            is_active: row.is_active,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct MembershipRow {
    #[sqlx(flatten)]
    clinic: ClinicRow,
    role: String,
}

impl TryFrom<MembershipRow> for ClinicMembership {
    type Error = RepositoryError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(ClinicMembership {
            role: parse_enum(&row.role)?,
            clinic: ClinicRecord::try_from(row.clinic)?,
        })
    }
}

#[async_trait]
impl ClinicRepositoryPort for SqliteClinicRepository {
    async fn create_with_owner(
        &self,
        clinic: &ClinicRecord,
        owner_access: &ClinicAccessRecord,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO clinics (id, name, address, phone, email, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(clinic.id.to_string())
        .bind(&clinic.name)
        .bind(&clinic.address)
        .bind(&clinic.phone)
        .bind(&clinic.email)
        .bind(clinic.is_active)
        .bind(ts(clinic.created_at))
        .bind(ts(clinic.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        insert_access(&mut tx, owner_access).await?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn update(&self, clinic: &ClinicRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE clinics SET name = ?, address = ?, phone = ?, email = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&clinic.name)
        .bind(&clinic.address)
        .bind(&clinic.phone)
        .bind(&clinic.email)
        .bind(clinic.is_active)
        .bind(ts(clinic.updated_at))
        .bind(clinic.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("clinic {}", clinic.id)));
        }
        Ok(())
    }

    async fn find_active(&self, id: Uuid) -> Result<Option<ClinicRecord>, RepositoryError> {
        let row: Option<ClinicRow> = sqlx::query_as(
            r#"
            SELECT id, name, address, phone, email, is_active, created_at, updated_at
            FROM clinics WHERE id = ? AND is_active = 1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(ClinicRecord::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ClinicMembership>, RepositoryError> {
        let rows: Vec<MembershipRow> = sqlx::query_as(
            r#"
            SELECT c.id, c.name, c.address, c.phone, c.email, c.is_active,
                   c.created_at, c.updated_at, a.role
            FROM clinic_access a
            JOIN clinics c ON c.id = a.clinic_id
            WHERE a.user_id = ? AND a.is_active = 1 AND c.is_active = 1
            ORDER BY c.name
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(ClinicMembership::try_from).collect()
    }
}

async fn insert_access(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    access: &ClinicAccessRecord,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        INSERT INTO clinic_access (id, user_id, clinic_id, role, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(access.id.to_string())
    .bind(access.user_id.to_string())
    .bind(access.clinic_id.to_string())
    .bind(access.role.as_str())
    .bind(access.is_active)
    .bind(ts(access.created_at))
    .bind(ts(access.updated_at))
    .execute(&mut **tx)
    .await
    .map_err(db_error)?;

    Ok(())
}

/// SQLite ClinicAccess Repository
pub struct SqliteClinicAccessRepository {
    pool: DbPool,
}

impl SqliteClinicAccessRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AccessRow {
    id: String,
    user_id: String,
    clinic_id: String,
    role: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<AccessRow> for ClinicAccessRecord {
    type Error = RepositoryError;

    fn try_from(row: AccessRow) -> Result<Self, Self::Error> {
        Ok(ClinicAccessRecord {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            clinic_id: parse_uuid(&row.clinic_id)?,
            role: parse_enum(&row.role)?,
            is_active: row.is_active,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct MemberRow {
    user_id: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    joined_at: String,
}

impl TryFrom<MemberRow> for ClinicMember {
    type Error = RepositoryError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(ClinicMember {
            user_id: parse_uuid(&row.user_id)?,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            role: parse_enum(&row.role)?,
            joined_at: parse_ts(&row.joined_at)?,
        })
    }
}

#[async_trait]
impl ClinicAccessRepositoryPort for SqliteClinicAccessRepository {
    async fn find_active_role(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
    ) -> Result<Option<ClinicRole>, RepositoryError> {
        let role: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT a.role
            FROM clinic_access a
            JOIN clinics c ON c.id = a.clinic_id
            WHERE a.user_id = ? AND a.clinic_id = ? AND a.is_active = 1 AND c.is_active = 1
            "#,
        )
        .bind(user_id.to_string())
        .bind(clinic_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        role.map(|(role,)| parse_enum(&role)).transpose()
    }

    async fn find(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
    ) -> Result<Option<ClinicAccessRecord>, RepositoryError> {
        let row: Option<AccessRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, clinic_id, role, is_active, created_at, updated_at
            FROM clinic_access WHERE user_id = ? AND clinic_id = ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(clinic_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(ClinicAccessRecord::try_from).transpose()
    }

    async fn save(&self, access: &ClinicAccessRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO clinic_access (id, user_id, clinic_id, role, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, clinic_id) DO UPDATE SET
                role = excluded.role,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(access.id.to_string())
        .bind(access.user_id.to_string())
        .bind(access.clinic_id.to_string())
        .bind(access.role.as_str())
        .bind(access.is_active)
        .bind(ts(access.created_at))
        .bind(ts(access.updated_at))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn list_members(&self, clinic_id: Uuid) -> Result<Vec<ClinicMember>, RepositoryError> {
        let rows: Vec<MemberRow> = sqlx::query_as(
            r#"
            SELECT u.id AS user_id, u.email, u.first_name, u.last_name, a.role,
                   a.created_at AS joined_at
            FROM clinic_access a
            JOIN users u ON u.id = a.user_id
            WHERE a.clinic_id = ? AND a.is_active = 1
            ORDER BY a.created_at
            "#,
        )
        .bind(clinic_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(ClinicMember::try_from).collect()
    }

    async fn count_active_owners(&self, clinic_id: Uuid) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM clinic_access WHERE clinic_id = ? AND role = ? AND is_active = 1",
        )
        .bind(clinic_id.to_string())
        .bind(ClinicRole::Owner.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(to_u64(count))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{memory_pool, seed_clinic, seed_user};
    use super::*;

    #[tokio::test]
    async fn test_create_with_owner_and_list() {
        let pool = memory_pool().await;
        let owner = seed_user(&pool, "owner@example.com").await;
        let clinic_id = seed_clinic(&pool, owner).await;

        let access = SqliteClinicAccessRepository::new(pool.clone());
        assert_eq!(
            access.find_active_role(owner, clinic_id).await.unwrap(),
            Some(ClinicRole::Owner)
        );
        assert_eq!(access.count_active_owners(clinic_id).await.unwrap(), 1);

        let clinics = SqliteClinicRepository::new(pool.clone());
        let mine = clinics.list_for_user(owner).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].role, ClinicRole::Owner);
    }

    #[tokio::test]
    async fn test_deactivated_clinic_hides_roles() {
        let pool = memory_pool().await;
        let owner = seed_user(&pool, "owner@example.com").await;
        let clinic_id = seed_clinic(&pool, owner).await;

        let clinics = SqliteClinicRepository::new(pool.clone());
        let mut clinic = clinics.find_active(clinic_id).await.unwrap().unwrap();
        clinic.is_active = false;
        clinics.update(&clinic).await.unwrap();

        assert!(clinics.find_active(clinic_id).await.unwrap().is_none());
        assert!(clinics.list_for_user(owner).await.unwrap().is_empty());

        let access = SqliteClinicAccessRepository::new(pool);
        assert_eq!(access.find_active_role(owner, clinic_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_upserts_membership() {
        let pool = memory_pool().await;
        let owner = seed_user(&pool, "owner@example.com").await;
        let staff = seed_user(&pool, "staff@example.com").await;
        let clinic_id = seed_clinic(&pool, owner).await;
        let access = SqliteClinicAccessRepository::new(pool);

        let now = chrono::Utc::now();
        let mut record = ClinicAccessRecord {
            id: Uuid::new_v4(),
            user_id: staff,
            clinic_id,
            role: ClinicRole::Staff,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        access.save(&record).await.unwrap();

        // 同一 (user, clinic) 再次保存不会新增行
        record.id = Uuid::new_v4();
        record.role = ClinicRole::Viewer;
        access.save(&record).await.unwrap();

        let members = access.list_members(clinic_id).await.unwrap();
        assert_eq!(members.len(), 2);
        let stored = access.find(staff, clinic_id).await.unwrap().unwrap();
        assert_eq!(stored.role, ClinicRole::Viewer);
        assert_ne!(stored.id, record.id);
    }
}
