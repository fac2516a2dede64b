//! Appointment Queries

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::application::access::Actor;
use crate::application::ports::{AppointmentFilter, PageRequest};

#[derive(Debug, Clone)]
pub struct GetAppointment {
    pub actor: Actor,
    pub appointment_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct ListAppointments {
    pub actor: Actor,
    pub filter: AppointmentFilter,
    pub page: PageRequest,
}

/// 检查兽医在某时段是否空闲
#[derive(Debug, Clone)]
pub struct CheckAvailability {
    pub actor: Actor,
    pub veterinarian_id: Uuid,
    pub date: NaiveDate,
    /// HH:MM
    pub start_time: String,
    pub duration_minutes: u32,
    /// 改期时排除自身
    pub exclude_id: Option<Uuid>,
}

/// 空闲检查结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: bool,
    pub conflicts: Vec<Uuid>,
}
