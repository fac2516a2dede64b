//! Dashboard HTTP Handler

use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::RecentMedicalRecord;
use crate::application::queries::{DashboardStats, GetDashboardStats};
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::extractors::{ApiPath, ApiQuery, CurrentUser};
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// 统计基准日，缺省为 UTC 当天
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct RecentRecordResponse {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub visit_date: NaiveDate,
    pub chief_complaint: String,
}

impl From<RecentMedicalRecord> for RecentRecordResponse {
    fn from(r: RecentMedicalRecord) -> Self {
        Self {
            id: r.id,
            patient_id: r.patient_id,
            patient_name: r.patient_name,
            visit_date: r.visit_date,
            chief_complaint: r.chief_complaint,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub date: NaiveDate,
    pub active_patients: u64,
    pub appointments_today: u64,
    pub appointments_today_by_status: BTreeMap<&'static str, u64>,
    pub upcoming_appointments: u64,
    pub revenue_month_cents: i64,
    pub outstanding_cents: i64,
    pub low_stock_products: u64,
    pub recent_medical_records: Vec<RecentRecordResponse>,
}

impl DashboardResponse {
    fn new(date: NaiveDate, stats: DashboardStats) -> Self {
        Self {
            date,
            active_patients: stats.active_patients,
            appointments_today: stats.appointments_today_total(),
            appointments_today_by_status: stats.appointments_today,
            upcoming_appointments: stats.upcoming_appointments,
            revenue_month_cents: stats.revenue_month_cents,
            outstanding_cents: stats.outstanding_cents,
            low_stock_products: stats.low_stock_products,
            recent_medical_records: stats
                .recent_medical_records
                .into_iter()
                .map(RecentRecordResponse::from)
                .collect(),
        }
    }
}

/// GET /api/clinics/:clinic_id/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<DashboardQuery>,
) -> Result<Json<ApiResponse<DashboardResponse>>, ApiError> {
    let today = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let stats = state
        .get_dashboard_stats_handler
        .handle(GetDashboardStats {
            actor: user.in_clinic(clinic_id),
            today,
        })
        .await?;

    Ok(Json(ApiResponse::success(DashboardResponse::new(today, stats))))
}
