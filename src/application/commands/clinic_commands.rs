//! Clinic / Member Commands

use uuid::Uuid;

use crate::application::access::Actor;
use crate::domain::ClinicRole;

/// 创建诊所命令（创建者成为 OWNER）
#[derive(Debug, Clone)]
pub struct CreateClinic {
    pub owner_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// 更新诊所命令
#[derive(Debug, Clone)]
pub struct UpdateClinic {
    pub actor: Actor,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// 停用诊所命令
#[derive(Debug, Clone)]
pub struct DeactivateClinic {
    pub actor: Actor,
}

/// 添加成员命令
#[derive(Debug, Clone)]
pub struct AddClinicMember {
    pub actor: Actor,
    pub email: String,
    pub role: ClinicRole,
}

/// 修改成员角色命令
#[derive(Debug, Clone)]
pub struct UpdateMemberRole {
    pub actor: Actor,
    pub user_id: Uuid,
    pub role: ClinicRole,
}

/// 移除成员命令
#[derive(Debug, Clone)]
pub struct RemoveMember {
    pub actor: Actor,
    pub user_id: Uuid,
}
