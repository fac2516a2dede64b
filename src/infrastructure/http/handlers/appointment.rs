//! Appointment HTTP Handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{
    CreateAppointment, DeleteAppointment, UpdateAppointment, UpdateAppointmentStatus,
};
use crate::application::ports::{AppointmentFilter, AppointmentRecord, PageRequest};
use crate::application::queries::{
    Availability, CheckAvailability, GetAppointment, ListAppointments,
};
use crate::domain::scheduling::{format_time_of_day, AppointmentStatus};
use crate::infrastructure::http::dto::{timestamp, ApiResponse, Empty, PageResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub veterinarian_id: Uuid,
    pub date: NaiveDate,
    /// HH:MM
    pub start_time: String,
    pub duration_minutes: u32,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub veterinarian_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub duration_minutes: Option<u32>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub veterinarian_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: u32,
    pub exclude_id: Option<Uuid>,
}

/// `date` 是 date_from = date_to 的简写
#[derive(Debug, Deserialize)]
pub struct ListAppointmentsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub veterinarian_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

impl ListAppointmentsQuery {
    fn filter(&self) -> AppointmentFilter {
        AppointmentFilter {
            date_from: self.date.or(self.date_from),
            date_to: self.date.or(self.date_to),
            veterinarian_id: self.veterinarian_id,
            patient_id: self.patient_id,
            status: self.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub veterinarian_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: u32,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_by: Uuid,
    pub created_at: String,
    pub updated_at: String,
}

impl From<AppointmentRecord> for AppointmentResponse {
    fn from(a: AppointmentRecord) -> Self {
        let end = a.start_time + Duration::minutes(i64::from(a.duration_minutes));
        Self {
            id: a.id,
            clinic_id: a.clinic_id,
            patient_id: a.patient_id,
            veterinarian_id: a.veterinarian_id,
            date: a.date,
            start_time: format_time_of_day(a.start_time),
            end_time: format_time_of_day(end),
            duration_minutes: a.duration_minutes,
            reason: a.reason,
            notes: a.notes,
            status: a.status,
            created_by: a.created_by,
            created_at: timestamp(a.created_at),
            updated_at: timestamp(a.updated_at),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/clinics/:clinic_id/appointments
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListAppointmentsQuery>,
) -> Result<Json<ApiResponse<PageResponse<AppointmentResponse>>>, ApiError> {
    let page = state
        .list_appointments_handler
        .handle(ListAppointments {
            actor: user.in_clinic(clinic_id),
            filter: query.filter(),
            page: PageRequest::new(query.page, query.limit),
        })
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::from_page(page))))
}

/// POST /api/clinics/:clinic_id/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AppointmentResponse>>), ApiError> {
    let appointment = state
        .create_appointment_handler
        .handle(CreateAppointment {
            actor: user.in_clinic(clinic_id),
            patient_id: req.patient_id,
            veterinarian_id: req.veterinarian_id,
            date: req.date,
            start_time: req.start_time,
            duration_minutes: req.duration_minutes,
            reason: req.reason,
            notes: req.notes,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(appointment.into())),
    ))
}

/// POST /api/clinics/:clinic_id/appointments/availability
pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AvailabilityRequest>,
) -> Result<Json<ApiResponse<Availability>>, ApiError> {
    let availability = state
        .check_availability_handler
        .handle(CheckAvailability {
            actor: user.in_clinic(clinic_id),
            veterinarian_id: req.veterinarian_id,
            date: req.date,
            start_time: req.start_time,
            duration_minutes: req.duration_minutes,
            exclude_id: req.exclude_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(availability)))
}

/// GET /api/clinics/:clinic_id/appointments/:appointment_id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, appointment_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, ApiError> {
    let appointment = state
        .get_appointment_handler
        .handle(GetAppointment {
            actor: user.in_clinic(clinic_id),
            appointment_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(appointment.into())))
}

/// PATCH /api/clinics/:clinic_id/appointments/:appointment_id
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, appointment_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdateAppointmentRequest>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, ApiError> {
    let appointment = state
        .update_appointment_handler
        .handle(UpdateAppointment {
            actor: user.in_clinic(clinic_id),
            appointment_id,
            patient_id: req.patient_id,
            veterinarian_id: req.veterinarian_id,
            date: req.date,
            start_time: req.start_time,
            duration_minutes: req.duration_minutes,
            reason: req.reason,
            notes: req.notes,
        })
        .await?;

    Ok(Json(ApiResponse::success(appointment.into())))
}

/// POST /api/clinics/:clinic_id/appointments/:appointment_id/status
pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, appointment_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, ApiError> {
    let appointment = state
        .update_appointment_status_handler
        .handle(UpdateAppointmentStatus {
            actor: user.in_clinic(clinic_id),
            appointment_id,
            status: req.status,
        })
        .await?;

    Ok(Json(ApiResponse::success(appointment.into())))
}

/// DELETE /api/clinics/:clinic_id/appointments/:appointment_id
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, appointment_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_appointment_handler
        .handle(DeleteAppointment {
            actor: user.in_clinic(clinic_id),
            appointment_id,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}
