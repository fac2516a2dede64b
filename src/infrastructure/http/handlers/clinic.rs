//! Clinic HTTP Handlers - 诊所与成员

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{
    AddClinicMember, CreateClinic, DeactivateClinic, RemoveMember, UpdateClinic, UpdateMemberRole,
};
use crate::application::ports::{ClinicMember, ClinicMembership, ClinicRecord};
use crate::application::queries::{GetClinic, ListClinicMembers, ListMyClinics};
use crate::domain::ClinicRole;
use crate::infrastructure::http::dto::{timestamp, ApiResponse, Empty};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::extractors::{ApiJson, ApiPath, CurrentUser};
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateClinicRequest {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClinicRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: ClinicRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub role: ClinicRole,
}

#[derive(Debug, Serialize)]
pub struct ClinicResponse {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// 当前用户在该诊所的角色
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ClinicRole>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ClinicRecord> for ClinicResponse {
    fn from(clinic: ClinicRecord) -> Self {
        Self {
            id: clinic.id,
            name: clinic.name,
            address: clinic.address,
            phone: clinic.phone,
            email: clinic.email,
            role: None,
            created_at: timestamp(clinic.created_at),
            updated_at: timestamp(clinic.updated_at),
        }
    }
}

impl From<ClinicMembership> for ClinicResponse {
    fn from(membership: ClinicMembership) -> Self {
        Self {
            role: Some(membership.role),
            ..membership.clinic.into()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: ClinicRole,
    pub joined_at: String,
}

impl From<ClinicMember> for MemberResponse {
    fn from(member: ClinicMember) -> Self {
        Self {
            user_id: member.user_id,
            email: member.email,
            first_name: member.first_name,
            last_name: member.last_name,
            role: member.role,
            joined_at: timestamp(member.joined_at),
        }
    }
}

// ============================================================================
// Clinic Handlers
// ============================================================================

/// GET /api/clinics
pub async fn list_my_clinics(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<ClinicResponse>>>, ApiError> {
    let clinics = state
        .list_my_clinics_handler
        .handle(ListMyClinics {
            user_id: user.user_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(
        clinics.into_iter().map(ClinicResponse::from).collect(),
    )))
}

/// POST /api/clinics
pub async fn create_clinic(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateClinicRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ClinicResponse>>), ApiError> {
    let membership = state
        .create_clinic_handler
        .handle(CreateClinic {
            owner_id: user.user_id,
            name: req.name,
            address: req.address,
            phone: req.phone,
            email: req.email,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(membership.into())),
    ))
}

/// GET /api/clinics/:clinic_id
pub async fn get_clinic(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ClinicResponse>>, ApiError> {
    let membership = state
        .get_clinic_handler
        .handle(GetClinic {
            actor: user.in_clinic(clinic_id),
        })
        .await?;

    Ok(Json(ApiResponse::success(membership.into())))
}

/// PATCH /api/clinics/:clinic_id
pub async fn update_clinic(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateClinicRequest>,
) -> Result<Json<ApiResponse<ClinicResponse>>, ApiError> {
    let clinic = state
        .update_clinic_handler
        .handle(UpdateClinic {
            actor: user.in_clinic(clinic_id),
            name: req.name,
            address: req.address,
            phone: req.phone,
            email: req.email,
        })
        .await?;

    Ok(Json(ApiResponse::success(clinic.into())))
}

/// DELETE /api/clinics/:clinic_id
pub async fn deactivate_clinic(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .deactivate_clinic_handler
        .handle(DeactivateClinic {
            actor: user.in_clinic(clinic_id),
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}

// ============================================================================
// Member Handlers
// ============================================================================

/// GET /api/clinics/:clinic_id/members
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Vec<MemberResponse>>>, ApiError> {
    let members = state
        .list_clinic_members_handler
        .handle(ListClinicMembers {
            actor: user.in_clinic(clinic_id),
        })
        .await?;

    Ok(Json(ApiResponse::success(
        members.into_iter().map(MemberResponse::from).collect(),
    )))
}

/// POST /api/clinics/:clinic_id/members
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MemberResponse>>), ApiError> {
    let member = state
        .add_clinic_member_handler
        .handle(AddClinicMember {
            actor: user.in_clinic(clinic_id),
            email: req.email,
            role: req.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(member.into()))))
}

/// PATCH /api/clinics/:clinic_id/members/:user_id
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, member_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdateMemberRequest>,
) -> Result<Json<ApiResponse<MemberResponse>>, ApiError> {
    let member = state
        .update_member_role_handler
        .handle(UpdateMemberRole {
            actor: user.in_clinic(clinic_id),
            user_id: member_id,
            role: req.role,
        })
        .await?;

    Ok(Json(ApiResponse::success(member.into())))
}

/// DELETE /api/clinics/:clinic_id/members/:user_id
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, member_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .remove_member_handler
        .handle(RemoveMember {
            actor: user.in_clinic(clinic_id),
            user_id: member_id,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}
