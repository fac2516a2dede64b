//! Auth Command Handlers
//!
//! 注册、登录、令牌轮换与密码管理

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{
    ChangePassword, GoogleLogin, Login, Logout, RefreshSession, Register, UpdateProfile,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AuthError, IdentityProviderPort, PasswordHasherPort, RefreshTokenRecord,
    RefreshTokenRepositoryPort, TokenServicePort, UserRecord, UserRepositoryPort,
};
use crate::domain::validation::{optional_text, required_text, validate_password};
use crate::domain::Email;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// 登录成功后的会话（用户 + 令牌对）
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: UserRecord,
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// 签发令牌对并登记 refresh token
#[derive(Clone)]
pub struct SessionIssuer {
    tokens: Arc<dyn TokenServicePort>,
    refresh_repo: Arc<dyn RefreshTokenRepositoryPort>,
}

impl SessionIssuer {
    pub fn new(
        tokens: Arc<dyn TokenServicePort>,
        refresh_repo: Arc<dyn RefreshTokenRepositoryPort>,
    ) -> Self {
        Self {
            tokens,
            refresh_repo,
        }
    }

    pub async fn issue(&self, user: UserRecord) -> Result<AuthSession, ApplicationError> {
        let access = self.tokens.issue_access(user.id, &user.email)?;
        let refresh = self.tokens.issue_refresh(user.id, &user.email)?;

        self.refresh_repo
            .insert(&RefreshTokenRecord {
                id: refresh.token_id,
                user_id: user.id,
                expires_at: refresh.expires_at,
                revoked_at: None,
                created_at: Utc::now(),
            })
            .await?;

        Ok(AuthSession {
            user,
            access_token: access.token,
            access_expires_at: access.expires_at,
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at,
        })
    }
}

// ============================================================================
// Register
// ============================================================================

pub struct RegisterHandler {
    user_repo: Arc<dyn UserRepositoryPort>,
    hasher: Arc<dyn PasswordHasherPort>,
    issuer: SessionIssuer,
}

impl RegisterHandler {
    pub fn new(
        user_repo: Arc<dyn UserRepositoryPort>,
        hasher: Arc<dyn PasswordHasherPort>,
        issuer: SessionIssuer,
    ) -> Self {
        Self {
            user_repo,
            hasher,
            issuer,
        }
    }

    pub async fn handle(&self, cmd: Register) -> Result<AuthSession, ApplicationError> {
        let email = Email::parse(&cmd.email)?;
        validate_password(&cmd.password)?;
        let first_name = required_text("first_name", &cmd.first_name, 80)?;
        let last_name = required_text("last_name", &cmd.last_name, 80)?;
        let phone = optional_text("phone", cmd.phone.as_deref(), 40)?;

        if self.user_repo.find_by_email(email.as_str()).await?.is_some() {
            return Err(ApplicationError::conflict("Email is already registered"));
        }

        let password_hash = self.hasher.hash(&cmd.password).await?;
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.into_string(),
            password_hash: Some(password_hash),
            first_name,
            last_name,
            phone,
            google_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.user_repo.insert(&user).await?;

        tracing::info!(user_id = %user.id, email = %user.email, "User registered");

        self.issuer.issue(user).await
    }
}

// ============================================================================
// Login
// ============================================================================

pub struct LoginHandler {
    user_repo: Arc<dyn UserRepositoryPort>,
    hasher: Arc<dyn PasswordHasherPort>,
    issuer: SessionIssuer,
}

impl LoginHandler {
    pub fn new(
        user_repo: Arc<dyn UserRepositoryPort>,
        hasher: Arc<dyn PasswordHasherPort>,
        issuer: SessionIssuer,
    ) -> Self {
        Self {
            user_repo,
            hasher,
            issuer,
        }
    }

    pub async fn handle(&self, cmd: Login) -> Result<AuthSession, ApplicationError> {
        let email = cmd.email.trim().to_lowercase();

        let user = match self.user_repo.find_by_email(&email).await? {
            Some(user) if user.is_active => user,
            _ => {
                tracing::warn!(email = %email, "Login failed: unknown or inactive user");
                return Err(ApplicationError::unauthorized(INVALID_CREDENTIALS));
            }
        };

        // Google 注册的用户没有密码
        let Some(hash) = user.password_hash.as_deref() else {
            tracing::warn!(user_id = %user.id, "Login failed: account has no password");
            return Err(ApplicationError::unauthorized(INVALID_CREDENTIALS));
        };

        if !self.hasher.verify(&cmd.password, hash).await? {
            tracing::warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(ApplicationError::unauthorized(INVALID_CREDENTIALS));
        }

        tracing::info!(user_id = %user.id, "User logged in");

        self.issuer.issue(user).await
    }
}

// ============================================================================
// GoogleLogin
// ============================================================================

pub struct GoogleLoginHandler {
    identity: Option<Arc<dyn IdentityProviderPort>>,
    user_repo: Arc<dyn UserRepositoryPort>,
    issuer: SessionIssuer,
}

impl GoogleLoginHandler {
    /// `identity` 为 None 时 Google 登录被禁用
    pub fn new(
        identity: Option<Arc<dyn IdentityProviderPort>>,
        user_repo: Arc<dyn UserRepositoryPort>,
        issuer: SessionIssuer,
    ) -> Self {
        Self {
            identity,
            user_repo,
            issuer,
        }
    }

    pub async fn handle(&self, cmd: GoogleLogin) -> Result<AuthSession, ApplicationError> {
        let identity = self.identity.as_ref().ok_or(AuthError::ProviderDisabled)?;

        if cmd.id_token.trim().is_empty() {
            return Err(ApplicationError::validation("id_token: cannot be empty"));
        }

        let external = identity.verify_id_token(cmd.id_token.trim()).await?;
        if !external.email_verified {
            return Err(ApplicationError::unauthorized("Google email is not verified"));
        }
        let email = Email::parse(&external.email)?;

        let user = if let Some(user) = self.user_repo.find_by_google_id(&external.subject).await? {
            user
        } else if let Some(mut user) = self.user_repo.find_by_email(email.as_str()).await? {
            // 已有同邮箱账户：关联 Google 身份
            user.google_id = Some(external.subject.clone());
            user.updated_at = Utc::now();
            self.user_repo.update(&user).await?;
            tracing::info!(user_id = %user.id, "Linked Google identity to existing user");
            user
        } else {
            let now = Utc::now();
            let local_part = email
                .as_str()
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string();
            let user = UserRecord {
                id: Uuid::new_v4(),
                email: email.into_string(),
                password_hash: None,
                first_name: external.given_name.clone().unwrap_or(local_part),
                last_name: external.family_name.clone().unwrap_or_default(),
                phone: None,
                google_id: Some(external.subject.clone()),
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            self.user_repo.insert(&user).await?;
            tracing::info!(user_id = %user.id, "User registered via Google");
            user
        };

        if !user.is_active {
            return Err(ApplicationError::unauthorized(INVALID_CREDENTIALS));
        }

        self.issuer.issue(user).await
    }
}

// ============================================================================
// RefreshSession
// ============================================================================

pub struct RefreshSessionHandler {
    tokens: Arc<dyn TokenServicePort>,
    refresh_repo: Arc<dyn RefreshTokenRepositoryPort>,
    user_repo: Arc<dyn UserRepositoryPort>,
    issuer: SessionIssuer,
}

impl RefreshSessionHandler {
    pub fn new(
        tokens: Arc<dyn TokenServicePort>,
        refresh_repo: Arc<dyn RefreshTokenRepositoryPort>,
        user_repo: Arc<dyn UserRepositoryPort>,
        issuer: SessionIssuer,
    ) -> Self {
        Self {
            tokens,
            refresh_repo,
            user_repo,
            issuer,
        }
    }

    pub async fn handle(&self, cmd: RefreshSession) -> Result<AuthSession, ApplicationError> {
        let claims = self.tokens.verify_refresh(cmd.refresh_token.trim())?;
        let now = Utc::now();

        let stored = self
            .refresh_repo
            .find(claims.token_id)
            .await?
            .filter(|t| t.user_id == claims.user_id && t.is_usable(now));

        let Some(stored) = stored else {
            tracing::warn!(
                user_id = %claims.user_id,
                token_id = %claims.token_id,
                "Refresh rejected: token revoked or unknown"
            );
            return Err(ApplicationError::unauthorized("Refresh token is no longer valid"));
        };

        let user = self
            .user_repo
            .find_by_id(stored.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApplicationError::unauthorized("Account is disabled"))?;

        // 条件吊销：并发使用同一令牌时只有一个请求能轮换成功
        if !self.refresh_repo.revoke(stored.id, now).await? {
            tracing::warn!(
                user_id = %user.id,
                token_id = %stored.id,
                "Refresh rejected: token already rotated"
            );
            return Err(ApplicationError::unauthorized("Refresh token is no longer valid"));
        }

        tracing::debug!(user_id = %user.id, old_token_id = %stored.id, "Refresh token rotated");

        self.issuer.issue(user).await
    }
}

// ============================================================================
// Logout
// ============================================================================

pub struct LogoutHandler {
    tokens: Arc<dyn TokenServicePort>,
    refresh_repo: Arc<dyn RefreshTokenRepositoryPort>,
}

impl LogoutHandler {
    pub fn new(
        tokens: Arc<dyn TokenServicePort>,
        refresh_repo: Arc<dyn RefreshTokenRepositoryPort>,
    ) -> Self {
        Self {
            tokens,
            refresh_repo,
        }
    }

    /// 重复登出不是错误
    pub async fn handle(&self, cmd: Logout) -> Result<(), ApplicationError> {
        let claims = self.tokens.verify_refresh(cmd.refresh_token.trim())?;

        if let Some(stored) = self.refresh_repo.find(claims.token_id).await? {
            if stored.revoked_at.is_none() {
                let _ = self.refresh_repo.revoke(stored.id, Utc::now()).await?;
            }
        }

        tracing::info!(user_id = %claims.user_id, "User logged out");
        Ok(())
    }
}

// ============================================================================
// UpdateProfile
// ============================================================================

pub struct UpdateProfileHandler {
    user_repo: Arc<dyn UserRepositoryPort>,
}

impl UpdateProfileHandler {
    pub fn new(user_repo: Arc<dyn UserRepositoryPort>) -> Self {
        Self { user_repo }
    }

    pub async fn handle(&self, cmd: UpdateProfile) -> Result<UserRecord, ApplicationError> {
        let mut user = self
            .user_repo
            .find_by_id(cmd.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApplicationError::not_found("User", cmd.user_id))?;

        if let Some(first_name) = cmd.first_name.as_deref() {
            user.first_name = required_text("first_name", first_name, 80)?;
        }
        if let Some(last_name) = cmd.last_name.as_deref() {
            user.last_name = required_text("last_name", last_name, 80)?;
        }
        if let Some(phone) = cmd.phone.as_deref() {
            user.phone = optional_text("phone", Some(phone), 40)?;
        }
        user.updated_at = Utc::now();

        self.user_repo.update(&user).await?;

        tracing::info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }
}

// ============================================================================
// ChangePassword
// ============================================================================

pub struct ChangePasswordHandler {
    user_repo: Arc<dyn UserRepositoryPort>,
    hasher: Arc<dyn PasswordHasherPort>,
    refresh_repo: Arc<dyn RefreshTokenRepositoryPort>,
}

impl ChangePasswordHandler {
    pub fn new(
        user_repo: Arc<dyn UserRepositoryPort>,
        hasher: Arc<dyn PasswordHasherPort>,
        refresh_repo: Arc<dyn RefreshTokenRepositoryPort>,
    ) -> Self {
        Self {
            user_repo,
            hasher,
            refresh_repo,
        }
    }

    /// 修改成功后吊销该用户所有 refresh token
    pub async fn handle(&self, cmd: ChangePassword) -> Result<(), ApplicationError> {
        let mut user = self
            .user_repo
            .find_by_id(cmd.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApplicationError::not_found("User", cmd.user_id))?;

        let Some(hash) = user.password_hash.as_deref() else {
            return Err(ApplicationError::business_rule(
                "Account has no password; sign in with Google",
            ));
        };

        if !self.hasher.verify(&cmd.current_password, hash).await? {
            return Err(ApplicationError::validation(
                "current_password: does not match",
            ));
        }
        validate_password(&cmd.new_password)?;

        let now = Utc::now();
        user.password_hash = Some(self.hasher.hash(&cmd.new_password).await?);
        user.updated_at = now;
        self.user_repo.update(&user).await?;

        let revoked = self.refresh_repo.revoke_all_for_user(user.id, now).await?;

        tracing::info!(user_id = %user.id, revoked_tokens = revoked, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestApp;

    fn register_cmd(email: &str) -> Register {
        Register {
            email: email.to_string(),
            password: "s3cretpass".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Silva".to_string(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_email_and_rejects_duplicates() {
        let app = TestApp::new().await;

        let session = app
            .state
            .register_handler
            .handle(register_cmd("  Ana@Example.COM "))
            .await
            .unwrap();
        assert_eq!(session.user.email, "ana@example.com");
        assert!(session.user.password_hash.is_some());

        let err = app
            .state
            .register_handler
            .handle(register_cmd("ana@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let app = TestApp::new().await;
        let mut cmd = register_cmd("weak@example.com");
        cmd.password = "password".to_string();

        let err = app.state.register_handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_unauthorized() {
        let app = TestApp::new().await;
        app.state
            .register_handler
            .handle(register_cmd("vet@example.com"))
            .await
            .unwrap();

        let err = app
            .state
            .login_handler
            .handle(Login {
                email: "vet@example.com".to_string(),
                password: "wrongpass1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Unauthorized(ref m) if m == INVALID_CREDENTIALS));

        let err = app
            .state
            .login_handler
            .handle(Login {
                email: "nobody@example.com".to_string(),
                password: "s3cretpass".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_old_token_is_rejected() {
        let app = TestApp::new().await;
        let session = app
            .state
            .register_handler
            .handle(register_cmd("rotate@example.com"))
            .await
            .unwrap();

        let rotated = app
            .state
            .refresh_session_handler
            .handle(RefreshSession {
                refresh_token: session.refresh_token.clone(),
            })
            .await
            .unwrap();
        assert_ne!(rotated.refresh_token, session.refresh_token);

        let err = app
            .state
            .refresh_session_handler
            .handle(RefreshSession {
                refresh_token: session.refresh_token,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_concurrent_refresh_with_same_token_rotates_once() {
        let app = TestApp::new().await;
        let session = app
            .state
            .register_handler
            .handle(register_cmd("race@example.com"))
            .await
            .unwrap();

        let refresh = || RefreshSession {
            refresh_token: session.refresh_token.clone(),
        };
        let (a, b) = tokio::join!(
            app.state.refresh_session_handler.handle(refresh()),
            app.state.refresh_session_handler.handle(refresh()),
        );

        let ok = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(ok, 1);
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err, ApplicationError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_access_token_cannot_be_used_as_refresh_token() {
        let app = TestApp::new().await;
        let session = app
            .state
            .register_handler
            .handle(register_cmd("typ@example.com"))
            .await
            .unwrap();

        let err = app
            .state
            .refresh_session_handler
            .handle(RefreshSession {
                refresh_token: session.access_token,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let app = TestApp::new().await;
        let session = app
            .state
            .register_handler
            .handle(register_cmd("bye@example.com"))
            .await
            .unwrap();

        for _ in 0..2 {
            app.state
                .logout_handler
                .handle(Logout {
                    refresh_token: session.refresh_token.clone(),
                })
                .await
                .unwrap();
        }

        let err = app
            .state
            .refresh_session_handler
            .handle(RefreshSession {
                refresh_token: session.refresh_token,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_change_password_revokes_refresh_tokens() {
        let app = TestApp::new().await;
        let session = app
            .state
            .register_handler
            .handle(register_cmd("change@example.com"))
            .await
            .unwrap();

        app.state
            .change_password_handler
            .handle(ChangePassword {
                user_id: session.user.id,
                current_password: "s3cretpass".to_string(),
                new_password: "n3wsecret".to_string(),
            })
            .await
            .unwrap();

        let err = app
            .state
            .refresh_session_handler
            .handle(RefreshSession {
                refresh_token: session.refresh_token,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Unauthorized(_)));

        app.state
            .login_handler
            .handle(Login {
                email: "change@example.com".to_string(),
                password: "n3wsecret".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_google_login_disabled_without_client_id() {
        let app = TestApp::new().await;

        let err = app
            .state
            .google_login_handler
            .handle(GoogleLogin {
                id_token: "token".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::BusinessRuleViolation(_)));
    }
}
