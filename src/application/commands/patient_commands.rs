//! Patient Commands

use chrono::NaiveDate;
use uuid::Uuid;

use crate::application::access::Actor;
use crate::domain::patient::{Sex, Species};

/// 创建患者命令
#[derive(Debug, Clone)]
pub struct CreatePatient {
    pub actor: Actor,
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

/// 更新患者命令
///
/// `None` 表示不修改；文本字段传空字符串表示清空
#[derive(Debug, Clone)]
pub struct UpdatePatient {
    pub actor: Actor,
    pub patient_id: Uuid,
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

/// 删除患者命令（软删除）
#[derive(Debug, Clone)]
pub struct DeletePatient {
    pub actor: Actor,
    pub patient_id: Uuid,
}
