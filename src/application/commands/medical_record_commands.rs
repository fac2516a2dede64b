//! Medical Record Commands

use chrono::NaiveDate;
use uuid::Uuid;

use crate::application::access::Actor;

/// 创建病历命令（接诊兽医为 actor 本人）
#[derive(Debug, Clone)]
pub struct CreateMedicalRecord {
    pub actor: Actor,
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

/// 更新病历命令
#[derive(Debug, Clone)]
pub struct UpdateMedicalRecord {
    pub actor: Actor,
    pub record_id: Uuid,
    pub visit_date: Option<NaiveDate>,
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescriptions: Option<String>,
    pub weight_kg: Option<f64>,
    pub temperature_c: Option<f64>,
    pub notes: Option<String>,
}

/// 删除病历命令（软删除）
#[derive(Debug, Clone)]
pub struct DeleteMedicalRecord {
    pub actor: Actor,
    pub record_id: Uuid,
}
