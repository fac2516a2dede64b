//! SQLite Appointment Repository

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Timelike};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use super::rows::{db_error, parse_date, parse_enum, parse_time, parse_ts, parse_uuid, to_u32, to_u64, ts};
use super::DbPool;
use crate::application::ports::{
    AppointmentFilter, AppointmentRecord, AppointmentRepositoryPort, Page, PageRequest,
    RepositoryError,
};
use crate::domain::scheduling::AppointmentStatus;

const APPOINTMENT_COLUMNS: &str = "id, clinic_id, patient_id, veterinarian_id, date, start_time, \
                                   duration_minutes, reason, notes, status, is_active, created_by, \
                                   created_at, updated_at";

/// 同一兽医当天没有与候选区间重叠的有效预约
///
/// 区间 [start, end) 重叠当且仅当 start_A < end_B && start_B < end_A；start_time 以 HH:MM 存储
const SLOT_IS_FREE: &str = r#"
    NOT EXISTS (
        SELECT 1 FROM appointments o
        WHERE o.clinic_id = ? AND o.veterinarian_id = ? AND o.date = ?
          AND o.is_active = 1 AND o.status NOT IN (?, ?) AND o.id <> ?
          AND CAST(substr(o.start_time, 1, 2) AS INTEGER) * 60
              + CAST(substr(o.start_time, 4, 2) AS INTEGER) < ?
          AND ? < CAST(substr(o.start_time, 1, 2) AS INTEGER) * 60
              + CAST(substr(o.start_time, 4, 2) AS INTEGER) + o.duration_minutes
    )"#;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour() * 60 + time.minute())
}

/// 依次绑定 SLOT_IS_FREE 的参数
fn bind_slot_guard<'q>(query: SqliteQuery<'q>, appointment: &AppointmentRecord) -> SqliteQuery<'q> {
    let start = minute_of_day(appointment.start_time);
    let end = start + i64::from(appointment.duration_minutes);
    query
        .bind(appointment.clinic_id.to_string())
        .bind(appointment.veterinarian_id.to_string())
        .bind(date_str(appointment.date))
        .bind(AppointmentStatus::Cancelled.as_str())
        .bind(AppointmentStatus::NoShow.as_str())
        .bind(appointment.id.to_string())
        .bind(end)
        .bind(start)
}

/// SQLite Appointment Repository
pub struct SqliteAppointmentRepository {
    pool: DbPool,
}

impl SqliteAppointmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AppointmentRow {
    id: String,
    clinic_id: String,
    patient_id: String,
    veterinarian_id: String,
    date: String,
    start_time: String,
    duration_minutes: i64,
    reason: Option<String>,
    notes: Option<String>,
    status: String,
    is_active: bool,
    created_by: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<AppointmentRow> for AppointmentRecord {
    type Error = RepositoryError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(AppointmentRecord {
            id: parse_uuid(&row.id)?,
            clinic_id: parse_uuid(&row.clinic_id)?,
            patient_id: parse_uuid(&row.patient_id)?,
            veterinarian_id: parse_uuid(&row.veterinarian_id)?,
            date: parse_date(&row.date)?,
            start_time: parse_time(&row.start_time)?,
            duration_minutes: to_u32("duration_minutes", row.duration_minutes)?,
            reason: row.reason,
            notes: row.notes,
            status: parse_enum(&row.status)?,
            is_active: row.is_active,
            created_by: parse_uuid(&row.created_by)?,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

fn date_str(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, clinic_id: Uuid, filter: &AppointmentFilter) {
    qb.push(" WHERE clinic_id = ")
        .push_bind(clinic_id.to_string())
        .push(" AND is_active = 1");

    if let Some(from) = filter.date_from {
        qb.push(" AND date >= ").push_bind(date_str(from));
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND date <= ").push_bind(date_str(to));
    }
    if let Some(vet) = filter.veterinarian_id {
        qb.push(" AND veterinarian_id = ").push_bind(vet.to_string());
    }
    if let Some(patient) = filter.patient_id {
        qb.push(" AND patient_id = ").push_bind(patient.to_string());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}

#[async_trait]
impl AppointmentRepositoryPort for SqliteAppointmentRepository {
    async fn insert(&self, appointment: &AppointmentRecord) -> Result<bool, RepositoryError> {
        let sql = format!(
            "INSERT INTO appointments ({}) SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ? WHERE {}",
            APPOINTMENT_COLUMNS, SLOT_IS_FREE
        );
        let query = sqlx::query(&sql)
            .bind(appointment.id.to_string())
            .bind(appointment.clinic_id.to_string())
            .bind(appointment.patient_id.to_string())
            .bind(appointment.veterinarian_id.to_string())
            .bind(date_str(appointment.date))
            .bind(appointment.start_time.format("%H:%M").to_string())
            .bind(i64::from(appointment.duration_minutes))
            .bind(&appointment.reason)
            .bind(&appointment.notes)
            .bind(appointment.status.as_str())
            .bind(appointment.is_active)
            .bind(appointment.created_by.to_string())
            .bind(ts(appointment.created_at))
            .bind(ts(appointment.updated_at));

        let result = bind_slot_guard(query, appointment)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn reschedule(&self, appointment: &AppointmentRecord) -> Result<bool, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE appointments SET
                patient_id = ?, veterinarian_id = ?, date = ?, start_time = ?,
                duration_minutes = ?, reason = ?, notes = ?, updated_at = ?
            WHERE id = ? AND clinic_id = ? AND is_active = 1 AND {}
            "#,
            SLOT_IS_FREE
        );
        let query = sqlx::query(&sql)
            .bind(appointment.patient_id.to_string())
            .bind(appointment.veterinarian_id.to_string())
            .bind(date_str(appointment.date))
            .bind(appointment.start_time.format("%H:%M").to_string())
            .bind(i64::from(appointment.duration_minutes))
            .bind(&appointment.reason)
            .bind(&appointment.notes)
            .bind(ts(appointment.updated_at))
            .bind(appointment.id.to_string())
            .bind(appointment.clinic_id.to_string());

        let result = bind_slot_guard(query, appointment)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // 区分“被占用”与“不存在”
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM appointments WHERE id = ? AND clinic_id = ? AND is_active = 1",
        )
        .bind(appointment.id.to_string())
        .bind(appointment.clinic_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        if count == 0 {
            return Err(RepositoryError::NotFound(format!("appointment {}", appointment.id)));
        }
        Ok(false)
    }

    async fn update(&self, appointment: &AppointmentRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE appointments SET
                patient_id = ?, veterinarian_id = ?, date = ?, start_time = ?,
                duration_minutes = ?, reason = ?, notes = ?, status = ?, is_active = ?,
                updated_at = ?
            WHERE id = ? AND clinic_id = ?
            "#,
        )
        .bind(appointment.patient_id.to_string())
        .bind(appointment.veterinarian_id.to_string())
        .bind(date_str(appointment.date))
        .bind(appointment.start_time.format("%H:%M").to_string())
        .bind(i64::from(appointment.duration_minutes))
        .bind(&appointment.reason)
        .bind(&appointment.notes)
        .bind(appointment.status.as_str())
        .bind(appointment.is_active)
        .bind(ts(appointment.updated_at))
        .bind(appointment.id.to_string())
        .bind(appointment.clinic_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("appointment {}", appointment.id)));
        }
        Ok(())
    }

    async fn find(
        &self,
        clinic_id: Uuid,
        id: Uuid,
    ) -> Result<Option<AppointmentRecord>, RepositoryError> {
        let row: Option<AppointmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM appointments WHERE id = ? AND clinic_id = ? AND is_active = 1",
            APPOINTMENT_COLUMNS
        ))
        .bind(id.to_string())
        .bind(clinic_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(AppointmentRecord::try_from).transpose()
    }

    async fn list(
        &self,
        clinic_id: Uuid,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<Page<AppointmentRecord>, RepositoryError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM appointments");
        push_filters(&mut count, clinic_id, filter);
        let (total,): (i64,) = count
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM appointments", APPOINTMENT_COLUMNS));
        push_filters(&mut query, clinic_id, filter);
        query
            .push(" ORDER BY date, start_time LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<AppointmentRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let items = rows
            .into_iter()
            .map(AppointmentRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, to_u64(total), page))
    }

    async fn find_for_veterinarian_on(
        &self,
        clinic_id: Uuid,
        veterinarian_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        let rows: Vec<AppointmentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM appointments
            WHERE clinic_id = ? AND veterinarian_id = ? AND date = ? AND is_active = 1
            ORDER BY start_time
            "#,
            APPOINTMENT_COLUMNS
        ))
        .bind(clinic_id.to_string())
        .bind(veterinarian_id.to_string())
        .bind(date_str(date))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(AppointmentRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{memory_pool, seed_clinic, seed_patient, seed_user};
    use super::*;
    use chrono::{NaiveTime, Utc};

    fn appointment(
        clinic_id: Uuid,
        patient_id: Uuid,
        vet: Uuid,
        date: NaiveDate,
        start: &str,
    ) -> AppointmentRecord {
        let now = Utc::now();
        AppointmentRecord {
            id: Uuid::new_v4(),
            clinic_id,
            patient_id,
            veterinarian_id: vet,
            date,
            start_time: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
            duration_minutes: 30,
            reason: Some("Checkup".to_string()),
            notes: None,
            status: AppointmentStatus::Scheduled,
            is_active: true,
            created_by: vet,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_list_ordered_and_filtered() {
        let pool = memory_pool().await;
        let vet = seed_user(&pool, "vet@example.com").await;
        let clinic_id = seed_clinic(&pool, vet).await;
        let pet = seed_patient(&pool, clinic_id, "Rex").await;
        let repo = SqliteAppointmentRepository::new(pool);

        let day1 = NaiveDate::from_ymd_opt(2030, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2030, 3, 2).unwrap();
        let late = appointment(clinic_id, pet.id, vet, day1, "15:00");
        let early = appointment(clinic_id, pet.id, vet, day1, "09:30");
        let next = appointment(clinic_id, pet.id, vet, day2, "08:00");
        for a in [&late, &early, &next] {
            assert!(repo.insert(a).await.unwrap());
        }

        let page = repo
            .list(clinic_id, &AppointmentFilter::default(), PageRequest::default())
            .await
            .unwrap();
        let ids: Vec<Uuid> = page.items.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![early.id, late.id, next.id]);

        let filter = AppointmentFilter {
            date_from: Some(day2),
            ..Default::default()
        };
        let page = repo.list(clinic_id, &filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].start_time.format("%H:%M").to_string(), "08:00");

        let same_day = repo.find_for_veterinarian_on(clinic_id, vet, day1).await.unwrap();
        assert_eq!(same_day.len(), 2);
    }

    #[tokio::test]
    async fn test_soft_deleted_excluded_from_schedule() {
        let pool = memory_pool().await;
        let vet = seed_user(&pool, "vet@example.com").await;
        let clinic_id = seed_clinic(&pool, vet).await;
        let pet = seed_patient(&pool, clinic_id, "Rex").await;
        let repo = SqliteAppointmentRepository::new(pool);

        let day = NaiveDate::from_ymd_opt(2030, 3, 1).unwrap();
        let mut a = appointment(clinic_id, pet.id, vet, day, "10:00");
        assert!(repo.insert(&a).await.unwrap());
        a.is_active = false;
        repo.update(&a).await.unwrap();

        assert!(repo.find(clinic_id, a.id).await.unwrap().is_none());
        assert!(repo
            .find_for_veterinarian_on(clinic_id, vet, day)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_insert_refuses_overlapping_slot() {
        let pool = memory_pool().await;
        let vet = seed_user(&pool, "vet@example.com").await;
        let other_vet = seed_user(&pool, "other@example.com").await;
        let clinic_id = seed_clinic(&pool, vet).await;
        let pet = seed_patient(&pool, clinic_id, "Rex").await;
        let repo = SqliteAppointmentRepository::new(pool);

        let day = NaiveDate::from_ymd_opt(2030, 3, 1).unwrap();
        let mut first = appointment(clinic_id, pet.id, vet, day, "10:00");
        assert!(repo.insert(&first).await.unwrap());

        // 10:15 与 10:00-10:30 重叠；10:30 首尾相接不算冲突
        assert!(!repo
            .insert(&appointment(clinic_id, pet.id, vet, day, "10:15"))
            .await
            .unwrap());
        assert!(repo
            .insert(&appointment(clinic_id, pet.id, vet, day, "10:30"))
            .await
            .unwrap());
        // 其他兽医不受影响
        assert!(repo
            .insert(&appointment(clinic_id, pet.id, other_vet, day, "10:15"))
            .await
            .unwrap());

        first.status = AppointmentStatus::Cancelled;
        repo.update(&first).await.unwrap();
        assert!(repo
            .insert(&appointment(clinic_id, pet.id, vet, day, "09:45"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_reschedule_checks_overlap_excluding_itself() {
        let pool = memory_pool().await;
        let vet = seed_user(&pool, "vet@example.com").await;
        let clinic_id = seed_clinic(&pool, vet).await;
        let pet = seed_patient(&pool, clinic_id, "Rex").await;
        let repo = SqliteAppointmentRepository::new(pool);

        let day = NaiveDate::from_ymd_opt(2030, 3, 1).unwrap();
        let mut morning = appointment(clinic_id, pet.id, vet, day, "09:00");
        let noon = appointment(clinic_id, pet.id, vet, day, "12:00");
        assert!(repo.insert(&morning).await.unwrap());
        assert!(repo.insert(&noon).await.unwrap());

        morning.start_time = NaiveTime::from_hms_opt(9, 10, 0).unwrap();
        assert!(repo.reschedule(&morning).await.unwrap());

        morning.start_time = NaiveTime::from_hms_opt(11, 45, 0).unwrap();
        assert!(!repo.reschedule(&morning).await.unwrap());
        let stored = repo.find(clinic_id, morning.id).await.unwrap().unwrap();
        assert_eq!(stored.start_time.format("%H:%M").to_string(), "09:10");

        let missing = appointment(clinic_id, pet.id, vet, day, "15:00");
        let err = repo.reschedule(&missing).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
