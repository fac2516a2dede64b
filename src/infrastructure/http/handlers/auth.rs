//! Auth HTTP Handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::handlers::AuthSession;
use crate::application::commands::{
    ChangePassword, GoogleLogin, Login, Logout, RefreshSession, Register, UpdateProfile,
};
use crate::application::ports::UserRecord;
use crate::application::queries::GetMe;
use crate::infrastructure::http::dto::{timestamp, ApiResponse, Empty};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::extractors::{ApiJson, CurrentUser};
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub has_password: bool,
    pub google_linked: bool,
    pub created_at: String,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            has_password: user.password_hash.is_some(),
            google_linked: user.google_id.is_some(),
            created_at: timestamp(user.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token_type: &'static str,
    pub access_token: String,
    pub access_expires_at: String,
    pub refresh_token: String,
    pub refresh_expires_at: String,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            user: session.user.into(),
            token_type: "Bearer",
            access_token: session.access_token,
            access_expires_at: timestamp(session.access_expires_at),
            refresh_token: session.refresh_token,
            refresh_expires_at: timestamp(session.refresh_expires_at),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ApiError> {
    let session = state
        .register_handler
        .handle(Register {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(session.into())),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let session = state
        .login_handler
        .handle(Login {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(Json(ApiResponse::success(session.into())))
}

/// POST /api/auth/google
pub async fn google_login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GoogleLoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let session = state
        .google_login_handler
        .handle(GoogleLogin {
            id_token: req.id_token,
        })
        .await?;

    Ok(Json(ApiResponse::success(session.into())))
}

/// POST /api/auth/refresh
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let session = state
        .refresh_session_handler
        .handle(RefreshSession {
            refresh_token: req.refresh_token,
        })
        .await?;

    Ok(Json(ApiResponse::success(session.into())))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .logout_handler
        .handle(Logout {
            refresh_token: req.refresh_token,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}

/// GET /api/auth/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let record = state
        .get_me_handler
        .handle(GetMe {
            user_id: user.user_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(record.into())))
}

/// PATCH /api/auth/me
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let record = state
        .update_profile_handler
        .handle(UpdateProfile {
            user_id: user.user_id,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
        })
        .await?;

    Ok(Json(ApiResponse::success(record.into())))
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .change_password_handler
        .handle(ChangePassword {
            user_id: user.user_id,
            current_password: req.current_password,
            new_password: req.new_password,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}
