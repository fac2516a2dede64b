//! Dashboard Repository Port - 聚合统计只读查询

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::scheduling::AppointmentStatus;

/// 最近病历摘要
#[derive(Debug, Clone)]
pub struct RecentMedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub visit_date: NaiveDate,
    pub chief_complaint: String,
}

/// Dashboard Repository Port
///
/// 所有统计只计入 is_active 的记录
#[async_trait]
pub trait DashboardRepositoryPort: Send + Sync {
    async fn count_active_patients(&self, clinic_id: Uuid) -> Result<u64, RepositoryError>;

    /// 某天的预约按状态计数
    async fn appointment_counts_on(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<(AppointmentStatus, u64)>, RepositoryError>;

    /// [from, to] 内待进行（SCHEDULED/CONFIRMED）的预约数
    async fn count_upcoming(
        &self,
        clinic_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<u64, RepositoryError>;

    /// [from, to) 内收到的付款总额
    async fn revenue_between(
        &self,
        clinic_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, RepositoryError>;

    /// SENT/PARTIAL 发票的未收余额
    async fn outstanding_balance(&self, clinic_id: Uuid) -> Result<i64, RepositoryError>;

    async fn count_low_stock(&self, clinic_id: Uuid) -> Result<u64, RepositoryError>;

    async fn recent_medical_records(
        &self,
        clinic_id: Uuid,
        limit: u32,
    ) -> Result<Vec<RecentMedicalRecord>, RepositoryError>;
}
