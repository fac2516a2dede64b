//! Clinic Queries

use uuid::Uuid;

use crate::application::access::Actor;

/// 获取诊所详情
#[derive(Debug, Clone)]
pub struct GetClinic {
    pub actor: Actor,
}

/// 列出用户可访问的诊所
#[derive(Debug, Clone)]
pub struct ListMyClinics {
    pub user_id: Uuid,
}

/// 列出诊所成员
#[derive(Debug, Clone)]
pub struct ListClinicMembers {
    pub actor: Actor,
}
