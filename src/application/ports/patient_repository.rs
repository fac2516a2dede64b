//! Patient Repository Port

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::{Page, PageRequest, RepositoryError};
use crate::domain::patient::{Sex, Species};

/// 患宠实体
#[derive(Debug, Clone)]
pub struct PatientRecord {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub sex: Sex,
    pub birth_date: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub microchip_id: Option<String>,
    pub color: Option<String>,
    pub owner_name: String,
    pub owner_phone: Option<String>,
    pub owner_email: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 患宠列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct PatientFilter {
    /// 匹配名字、主人姓名或芯片号
    pub search: Option<String>,
    pub species: Option<Species>,
}

/// Patient Repository Port
///
/// 所有读操作都限定在 clinic_id 内且只返回 is_active 的记录
#[async_trait]
pub trait PatientRepositoryPort: Send + Sync {
    async fn insert(&self, patient: &PatientRecord) -> Result<(), RepositoryError>;

    async fn update(&self, patient: &PatientRecord) -> Result<(), RepositoryError>;

    async fn find(&self, clinic_id: Uuid, id: Uuid) -> Result<Option<PatientRecord>, RepositoryError>;

    async fn list(
        &self,
        clinic_id: Uuid,
        filter: &PatientFilter,
        page: PageRequest,
    ) -> Result<Page<PatientRecord>, RepositoryError>;

    /// 芯片号在诊所有效患宠中是否已被占用
    async fn microchip_taken(
        &self,
        clinic_id: Uuid,
        microchip_id: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepositoryError>;
}
