//! Medical Record HTTP Handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{
    CreateMedicalRecord, DeleteMedicalRecord, UpdateMedicalRecord,
};
use crate::application::ports::{MedicalRecordEntry, MedicalRecordFilter, PageRequest};
use crate::application::queries::{GetMedicalRecord, ListMedicalRecords};
use crate::infrastructure::http::dto::{timestamp, ApiResponse, Empty, PageResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateMedicalRecordRequest {
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    /// 缺省为当天
    pub visit_date: Option<NaiveDate>,
    pub chief_complaint: String,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescriptions: Option<String>,
    pub weight_kg: Option<f64>,
    pub temperature_c: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMedicalRecordRequest {
    pub visit_date: Option<NaiveDate>,
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescriptions: Option<String>,
    pub weight_kg: Option<f64>,
    pub temperature_c: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListMedicalRecordsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MedicalRecordResponse {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub veterinarian_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub visit_date: NaiveDate,
    pub chief_complaint: String,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescriptions: Option<String>,
    pub weight_kg: Option<f64>,
    pub temperature_c: Option<f64>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<MedicalRecordEntry> for MedicalRecordResponse {
    fn from(r: MedicalRecordEntry) -> Self {
        Self {
            id: r.id,
            clinic_id: r.clinic_id,
            patient_id: r.patient_id,
            veterinarian_id: r.veterinarian_id,
            appointment_id: r.appointment_id,
            visit_date: r.visit_date,
            chief_complaint: r.chief_complaint,
            diagnosis: r.diagnosis,
            treatment: r.treatment,
            prescriptions: r.prescriptions,
            weight_kg: r.weight_kg,
            temperature_c: r.temperature_c,
            notes: r.notes,
            created_at: timestamp(r.created_at),
            updated_at: timestamp(r.updated_at),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/clinics/:clinic_id/medical-records
pub async fn list_medical_records(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListMedicalRecordsQuery>,
) -> Result<Json<ApiResponse<PageResponse<MedicalRecordResponse>>>, ApiError> {
    let page = state
        .list_medical_records_handler
        .handle(ListMedicalRecords {
            actor: user.in_clinic(clinic_id),
            filter: MedicalRecordFilter {
                patient_id: query.patient_id,
            },
            page: PageRequest::new(query.page, query.limit),
        })
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::from_page(page))))
}

/// POST /api/clinics/:clinic_id/medical-records
pub async fn create_medical_record(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateMedicalRecordRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MedicalRecordResponse>>), ApiError> {
    let record = state
        .create_medical_record_handler
        .handle(CreateMedicalRecord {
            actor: user.in_clinic(clinic_id),
            patient_id: req.patient_id,
            appointment_id: req.appointment_id,
            visit_date: req.visit_date,
            chief_complaint: req.chief_complaint,
            diagnosis: req.diagnosis,
            treatment: req.treatment,
            prescriptions: req.prescriptions,
            weight_kg: req.weight_kg,
            temperature_c: req.temperature_c,
            notes: req.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(record.into()))))
}

/// GET /api/clinics/:clinic_id/medical-records/:record_id
pub async fn get_medical_record(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, record_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<MedicalRecordResponse>>, ApiError> {
    let record = state
        .get_medical_record_handler
        .handle(GetMedicalRecord {
            actor: user.in_clinic(clinic_id),
            record_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(record.into())))
}

/// PATCH /api/clinics/:clinic_id/medical-records/:record_id
pub async fn update_medical_record(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, record_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdateMedicalRecordRequest>,
) -> Result<Json<ApiResponse<MedicalRecordResponse>>, ApiError> {
    let record = state
        .update_medical_record_handler
        .handle(UpdateMedicalRecord {
            actor: user.in_clinic(clinic_id),
            record_id,
            visit_date: req.visit_date,
            chief_complaint: req.chief_complaint,
            diagnosis: req.diagnosis,
            treatment: req.treatment,
            prescriptions: req.prescriptions,
            weight_kg: req.weight_kg,
            temperature_c: req.temperature_c,
            notes: req.notes,
        })
        .await?;

    Ok(Json(ApiResponse::success(record.into())))
}

/// DELETE /api/clinics/:clinic_id/medical-records/:record_id
pub async fn delete_medical_record(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, record_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_medical_record_handler
        .handle(DeleteMedicalRecord {
            actor: user.in_clinic(clinic_id),
            record_id,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}
