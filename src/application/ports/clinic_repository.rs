//! Clinic / ClinicAccess Repository Ports

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::ClinicRole;

/// 诊所实体
#[derive(Debug, Clone)]
pub struct ClinicRecord {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 用户在诊所内的授权
#[derive(Debug, Clone)]
pub struct ClinicAccessRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub clinic_id: Uuid,
    pub role: ClinicRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 用户所属诊所及角色
#[derive(Debug, Clone)]
pub struct ClinicMembership {
    pub clinic: ClinicRecord,
    pub role: ClinicRole,
}

/// 诊所成员
#[derive(Debug, Clone)]
pub struct ClinicMember {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: ClinicRole,
    pub joined_at: DateTime<Utc>,
}

/// Clinic Repository Port
#[async_trait]
pub trait ClinicRepositoryPort: Send + Sync {
    /// 在同一事务中创建诊所及其 OWNER 授权
    async fn create_with_owner(
        &self,
        clinic: &ClinicRecord,
        owner_access: &ClinicAccessRecord,
    ) -> Result<(), RepositoryError>;

    async fn update(&self, clinic: &ClinicRecord) -> Result<(), RepositoryError>;

    /// 仅返回未停用的诊所
    async fn find_active(&self, id: Uuid) -> Result<Option<ClinicRecord>, RepositoryError>;

    /// 用户有有效授权的全部诊所
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ClinicMembership>, RepositoryError>;
}

/// ClinicAccess Repository Port
#[async_trait]
pub trait ClinicAccessRepositoryPort: Send + Sync {
    /// 有效授权的角色（诊所与授权均未停用）
    async fn find_active_role(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
    ) -> Result<Option<ClinicRole>, RepositoryError>;

    /// 任意状态的授权记录
    async fn find(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
    ) -> Result<Option<ClinicAccessRecord>, RepositoryError>;

    /// 按 (user_id, clinic_id) 插入或更新
    async fn save(&self, access: &ClinicAccessRecord) -> Result<(), RepositoryError>;

    async fn list_members(&self, clinic_id: Uuid) -> Result<Vec<ClinicMember>, RepositoryError>;

    async fn count_active_owners(&self, clinic_id: Uuid) -> Result<u64, RepositoryError>;
}
