//! 诊所访问控制
//!
//! 所有诊所内的命令与查询都以 Actor 身份执行，
//! 先通过 AccessPolicy 校验角色权限，再访问数据

use std::sync::Arc;
use uuid::Uuid;

use crate::application::error::ApplicationError;
use crate::application::ports::ClinicAccessRepositoryPort;
use crate::domain::{ClinicRole, Permission};

/// 在某个诊所内操作的已认证用户
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub clinic_id: Uuid,
}

impl Actor {
    pub fn new(user_id: Uuid, clinic_id: Uuid) -> Self {
        Self { user_id, clinic_id }
    }
}

/// 访问策略
#[derive(Clone)]
pub struct AccessPolicy {
    access_repo: Arc<dyn ClinicAccessRepositoryPort>,
}

impl AccessPolicy {
    pub fn new(access_repo: Arc<dyn ClinicAccessRepositoryPort>) -> Self {
        Self { access_repo }
    }

    /// 校验 actor 在诊所内拥有指定权限，返回其角色
    pub async fn authorize(
        &self,
        actor: &Actor,
        permission: Permission,
    ) -> Result<ClinicRole, ApplicationError> {
        let role = self
            .access_repo
            .find_active_role(actor.user_id, actor.clinic_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    user_id = %actor.user_id,
                    clinic_id = %actor.clinic_id,
                    "Access denied: no membership"
                );
                ApplicationError::forbidden("You do not have access to this clinic")
            })?;

        if !role.allows(permission) {
            tracing::warn!(
                user_id = %actor.user_id,
                clinic_id = %actor.clinic_id,
                role = %role,
                permission = permission.as_str(),
                "Access denied: missing permission"
            );
            return Err(ApplicationError::forbidden(format!(
                "Role {} cannot perform {}",
                role,
                permission.as_str()
            )));
        }

        Ok(role)
    }

    /// 用户在诊所内的有效角色
    pub async fn role_of(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
    ) -> Result<Option<ClinicRole>, ApplicationError> {
        Ok(self.access_repo.find_active_role(user_id, clinic_id).await?)
    }
}
