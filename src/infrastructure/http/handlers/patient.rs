//! Patient HTTP Handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{CreatePatient, DeletePatient, UpdatePatient};
use crate::application::ports::{PageRequest, PatientFilter, PatientRecord};
use crate::application::queries::{GetPatient, ListPatients};
use crate::domain::patient::{Sex, Species};
use crate::infrastructure::http::dto::{timestamp, ApiResponse, Empty, PageResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub microchip_id: Option<String>,
    pub color: Option<String>,
    pub owner_name: String,
    pub owner_phone: Option<String>,
    pub owner_email: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub species: Option<Species>,
    pub breed: Option<String>,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub microchip_id: Option<String>,
    pub color: Option<String>,
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
    pub owner_email: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListPatientsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub species: Option<Species>,
}

#[derive(Debug, Serialize)]
pub struct PatientResponse {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub sex: Sex,
    pub birth_date: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub microchip_id: Option<String>,
    pub color: Option<String>,
    pub owner_name: String,
    pub owner_phone: Option<String>,
    pub owner_email: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PatientRecord> for PatientResponse {
    fn from(p: PatientRecord) -> Self {
        Self {
            id: p.id,
            clinic_id: p.clinic_id,
            name: p.name,
            species: p.species,
            breed: p.breed,
            sex: p.sex,
            birth_date: p.birth_date,
            weight_kg: p.weight_kg,
            microchip_id: p.microchip_id,
            color: p.color,
            owner_name: p.owner_name,
            owner_phone: p.owner_phone,
            owner_email: p.owner_email,
            notes: p.notes,
            created_at: timestamp(p.created_at),
            updated_at: timestamp(p.updated_at),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/clinics/:clinic_id/patients
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListPatientsQuery>,
) -> Result<Json<ApiResponse<PageResponse<PatientResponse>>>, ApiError> {
    let page = state
        .list_patients_handler
        .handle(ListPatients {
            actor: user.in_clinic(clinic_id),
            filter: PatientFilter {
                search: query.search,
                species: query.species,
            },
            page: PageRequest::new(query.page, query.limit),
        })
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::from_page(page))))
}

/// POST /api/clinics/:clinic_id/patients
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreatePatientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PatientResponse>>), ApiError> {
    let patient = state
        .create_patient_handler
        .handle(CreatePatient {
            actor: user.in_clinic(clinic_id),
            name: req.name,
            species: req.species,
            breed: req.breed,
            sex: req.sex,
            birth_date: req.birth_date,
            weight_kg: req.weight_kg,
            microchip_id: req.microchip_id,
            color: req.color,
            owner_name: req.owner_name,
            owner_phone: req.owner_phone,
            owner_email: req.owner_email,
            notes: req.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(patient.into()))))
}

/// GET /api/clinics/:clinic_id/patients/:patient_id
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, patient_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<PatientResponse>>, ApiError> {
    let patient = state
        .get_patient_handler
        .handle(GetPatient {
            actor: user.in_clinic(clinic_id),
            patient_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(patient.into())))
}

/// PATCH /api/clinics/:clinic_id/patients/:patient_id
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, patient_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdatePatientRequest>,
) -> Result<Json<ApiResponse<PatientResponse>>, ApiError> {
    let patient = state
        .update_patient_handler
        .handle(UpdatePatient {
            actor: user.in_clinic(clinic_id),
            patient_id,
            name: req.name,
            species: req.species,
            breed: req.breed,
            sex: req.sex,
            birth_date: req.birth_date,
            weight_kg: req.weight_kg,
            microchip_id: req.microchip_id,
            color: req.color,
            owner_name: req.owner_name,
            owner_phone: req.owner_phone,
            owner_email: req.owner_email,
            notes: req.notes,
        })
        .await?;

    Ok(Json(ApiResponse::success(patient.into())))
}

/// DELETE /api/clinics/:clinic_id/patients/:patient_id
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, patient_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_patient_handler
        .handle(DeletePatient {
            actor: user.in_clinic(clinic_id),
            patient_id,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}
