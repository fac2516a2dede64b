//! Auth Queries

use uuid::Uuid;

/// 获取当前用户
#[derive(Debug, Clone)]
pub struct GetMe {
    pub user_id: Uuid,
}
