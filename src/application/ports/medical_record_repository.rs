//! Medical Record Repository Port

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::{Page, PageRequest, RepositoryError};

/// 病历实体
#[derive(Debug, Clone)]
pub struct MedicalRecordEntry {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub veterinarian_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub visit_date: NaiveDate,
    pub chief_complaint: String,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescriptions: Option<String>,
    pub weight_kg: Option<f64>,
    pub temperature_c: Option<f64>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct MedicalRecordFilter {
    pub patient_id: Option<Uuid>,
}

/// Medical Record Repository Port
#[async_trait]
pub trait MedicalRecordRepositoryPort: Send + Sync {
    async fn insert(&self, record: &MedicalRecordEntry) -> Result<(), RepositoryError>;

    async fn update(&self, record: &MedicalRecordEntry) -> Result<(), RepositoryError>;

    async fn find(
        &self,
        clinic_id: Uuid,
        id: Uuid,
    ) -> Result<Option<MedicalRecordEntry>, RepositoryError>;

    /// 按就诊日期倒序
    async fn list(
        &self,
        clinic_id: Uuid,
        filter: &MedicalRecordFilter,
        page: PageRequest,
    ) -> Result<Page<MedicalRecordEntry>, RepositoryError>;
}
