//! Appointment Commands

use chrono::NaiveDate;
use uuid::Uuid;

use crate::application::access::Actor;
use crate::domain::scheduling::AppointmentStatus;

/// 创建预约命令
#[derive(Debug, Clone)]
pub struct CreateAppointment {
    pub actor: Actor,
    pub patient_id: Uuid,
    pub veterinarian_id: Uuid,
    pub date: NaiveDate,
    /// HH:MM
    pub start_time: String,
    pub duration_minutes: u32,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// 更新预约命令（改期会重新检查冲突）
#[derive(Debug, Clone)]
pub struct UpdateAppointment {
    pub actor: Actor,
    pub appointment_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub veterinarian_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub duration_minutes: Option<u32>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// 更新预约状态命令
#[derive(Debug, Clone)]
pub struct UpdateAppointmentStatus {
    pub actor: Actor,
    pub appointment_id: Uuid,
    pub status: AppointmentStatus,
}

/// 删除预约命令（软删除）
#[derive(Debug, Clone)]
pub struct DeleteAppointment {
    pub actor: Actor,
    pub appointment_id: Uuid,
}
