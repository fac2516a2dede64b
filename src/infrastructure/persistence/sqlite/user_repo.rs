//! SQLite User / Refresh Token Repositories

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::rows::{db_error, parse_opt_ts, parse_ts, parse_uuid, ts};
use super::DbPool;
use crate::application::ports::{
    RefreshTokenRecord, RefreshTokenRepositoryPort, RepositoryError, UserRecord,
    UserRepositoryPort,
};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, google_id, \
                            is_active, created_at, updated_at";

/// SQLite User Repository
pub struct SqliteUserRepository {
    pool: DbPool,
}

impl SqliteUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(UserRecord::try_from).transpose()
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: Option<String>,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    google_id: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserRecord {
            id: parse_uuid(&row.id)?,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            google_id: row.google_id,
            is_active: row.is_active,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl UserRepositoryPort for SqliteUserRepository {
    async fn insert(&self, user: &UserRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, phone,
                               google_id, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.google_id)
        .bind(user.is_active)
        .bind(ts(user.created_at))
        .bind(ts(user.updated_at))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn update(&self, user: &UserRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                email = ?, password_hash = ?, first_name = ?, last_name = ?, phone = ?,
                google_id = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.google_id)
        .bind(user.is_active)
        .bind(ts(user.updated_at))
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError> {
        self.find_one("id", &id.to_string()).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        self.find_one("email", email).await
    }

    async fn find_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        self.find_one("google_id", google_id).await
    }
}

/// SQLite Refresh Token Repository
pub struct SqliteRefreshTokenRepository {
    pool: DbPool,
}

impl SqliteRefreshTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct RefreshTokenRow {
    id: String,
    user_id: String,
    expires_at: String,
    revoked_at: Option<String>,
    created_at: String,
}

impl TryFrom<RefreshTokenRow> for RefreshTokenRecord {
    type Error = RepositoryError;

    fn try_from(row: RefreshTokenRow) -> Result<Self, Self::Error> {
        Ok(RefreshTokenRecord {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            expires_at: parse_ts(&row.expires_at)?,
            revoked_at: parse_opt_ts(row.revoked_at)?,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

#[async_trait]
impl RefreshTokenRepositoryPort for SqliteRefreshTokenRepository {
    async fn insert(&self, token: &RefreshTokenRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, expires_at, revoked_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(token.id.to_string())
        .bind(token.user_id.to_string())
        .bind(ts(token.expires_at))
        .bind(token.revoked_at.map(ts))
        .bind(ts(token.created_at))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, RepositoryError> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            "SELECT id, user_id, expires_at, revoked_at, created_at FROM refresh_tokens WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(RefreshTokenRecord::try_from).transpose()
    }

    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL",
        )
        .bind(ts(at))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ? WHERE user_id = ? AND revoked_at IS NULL",
        )
        .bind(ts(at))
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected())
    }

    /// 删除已过期或已吊销的令牌
    async fn purge(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ? OR revoked_at IS NOT NULL")
                .bind(ts(now))
                .execute(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{memory_pool, seed_user};
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_duplicate_email_is_reported() {
        let pool = memory_pool().await;
        let id = seed_user(&pool, "vet@example.com").await;
        let repo = SqliteUserRepository::new(pool);

        let mut copy = repo.find_by_id(id).await.unwrap().unwrap();
        copy.id = Uuid::new_v4();
        let err = repo.insert(&copy).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));

        let found = repo.find_by_email("vet@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(repo.find_by_google_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_revoke_and_purge() {
        let pool = memory_pool().await;
        let user_id = seed_user(&pool, "vet@example.com").await;
        let repo = SqliteRefreshTokenRepository::new(pool);
        let now = Utc::now();

        let live = RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id,
            expires_at: now + Duration::days(7),
            revoked_at: None,
            created_at: now,
        };
        let expired = RefreshTokenRecord {
            id: Uuid::new_v4(),
            expires_at: now - Duration::seconds(1),
            ..live.clone()
        };
        repo.insert(&live).await.unwrap();
        repo.insert(&expired).await.unwrap();

        assert!(repo.find(live.id).await.unwrap().unwrap().is_usable(now));
        assert_eq!(repo.purge(now).await.unwrap(), 1);
        assert!(repo.find(expired.id).await.unwrap().is_none());

        assert!(repo.revoke(live.id, now).await.unwrap());
        assert!(!repo.revoke(live.id, now).await.unwrap());
        assert!(!repo.find(live.id).await.unwrap().unwrap().is_usable(now));
        assert_eq!(repo.revoke_all_for_user(user_id, now).await.unwrap(), 0);
        assert_eq!(repo.purge(now).await.unwrap(), 1);
    }
}
