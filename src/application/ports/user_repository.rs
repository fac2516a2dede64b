//! User Repository Port

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::RepositoryError;

/// 用户实体（用于持久化）
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    /// Google 登录创建的用户没有密码
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub google_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// 刷新令牌记录
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    /// 即 JWT 中的 jti
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// User Repository Port
#[async_trait]
pub trait UserRepositoryPort: Send + Sync {
    /// 新建用户，邮箱重复返回 Duplicate
    async fn insert(&self, user: &UserRecord) -> Result<(), RepositoryError>;

    async fn update(&self, user: &UserRecord) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;

    async fn find_by_google_id(&self, google_id: &str)
        -> Result<Option<UserRecord>, RepositoryError>;
}

/// Refresh Token Repository Port
#[async_trait]
pub trait RefreshTokenRepositoryPort: Send + Sync {
    async fn insert(&self, token: &RefreshTokenRecord) -> Result<(), RepositoryError>;

    async fn find(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, RepositoryError>;

    /// 吊销单个令牌
    ///
    /// 返回本次是否真正吊销；令牌已被吊销时返回 false
    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, RepositoryError>;

    /// 吊销用户的全部令牌
    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;

    /// 删除已过期或已吊销的令牌
    async fn purge(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}
