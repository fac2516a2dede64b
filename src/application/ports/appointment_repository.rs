//! Appointment Repository Port

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use super::{Page, PageRequest, RepositoryError};
use crate::domain::scheduling::{AppointmentStatus, BookedSlot, TimeSlot};
use crate::domain::DomainError;

/// 预约实体
#[derive(Debug, Clone)]
pub struct AppointmentRecord {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub veterinarian_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentRecord {
    pub fn time_slot(&self) -> Result<TimeSlot, DomainError> {
        TimeSlot::new(self.date, self.start_time, self.duration_minutes)
    }

    pub fn booked_slot(&self) -> Result<BookedSlot, DomainError> {
        Ok(BookedSlot {
            appointment_id: self.id,
            slot: self.time_slot()?,
            status: self.status,
        })
    }
}

/// 预约列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub veterinarian_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

/// Appointment Repository Port
#[async_trait]
pub trait AppointmentRepositoryPort: Send + Sync {
    /// 写入预约；与同一兽医当天的有效预约重叠时不写入，返回 false
    ///
    /// 重叠检查与写入在同一条语句内完成
    async fn insert(&self, appointment: &AppointmentRecord) -> Result<bool, RepositoryError>;

    /// 改期：与 insert 相同的重叠检查（排除自身），冲突时返回 false
    async fn reschedule(&self, appointment: &AppointmentRecord) -> Result<bool, RepositoryError>;

    /// 不涉及时间段的更新（状态、备注、软删除）
    async fn update(&self, appointment: &AppointmentRecord) -> Result<(), RepositoryError>;

    async fn find(
        &self,
        clinic_id: Uuid,
        id: Uuid,
    ) -> Result<Option<AppointmentRecord>, RepositoryError>;

    /// 按日期、开始时间排序
    async fn list(
        &self,
        clinic_id: Uuid,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<Page<AppointmentRecord>, RepositoryError>;

    /// 兽医某天的全部有效预约（冲突检测用）
    async fn find_for_veterinarian_on(
        &self,
        clinic_id: Uuid,
        veterinarian_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError>;
}
