//! Notifier Port - 诊所实时事件
//!
//! 命令处理器在写操作成功后发布事件，
//! 基础设施层按诊所房间广播给 WebSocket 订阅者

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::billing::InvoiceStatus;
use crate::domain::scheduling::AppointmentStatus;

/// 诊所事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClinicEvent {
    AppointmentCreated(AppointmentNotice),
    AppointmentUpdated(AppointmentNotice),
    AppointmentCancelled(AppointmentNotice),
    MedicalRecordCreated(MedicalRecordNotice),
    MedicalRecordUpdated(MedicalRecordNotice),
    InvoiceCreated(InvoiceNotice),
    InvoiceSent(InvoiceNotice),
    PaymentRecorded(PaymentNotice),
    InvoicePaid(InvoiceNotice),
    LowStock(LowStockNotice),
}

impl ClinicEvent {
    /// 事件名（与 JSON 中的 event 字段一致）
    pub fn name(&self) -> &'static str {
        match self {
            ClinicEvent::AppointmentCreated(_) => "appointment_created",
            ClinicEvent::AppointmentUpdated(_) => "appointment_updated",
            ClinicEvent::AppointmentCancelled(_) => "appointment_cancelled",
            ClinicEvent::MedicalRecordCreated(_) => "medical_record_created",
            ClinicEvent::MedicalRecordUpdated(_) => "medical_record_updated",
            ClinicEvent::InvoiceCreated(_) => "invoice_created",
            ClinicEvent::InvoiceSent(_) => "invoice_sent",
            ClinicEvent::PaymentRecorded(_) => "payment_recorded",
            ClinicEvent::InvoicePaid(_) => "invoice_paid",
            ClinicEvent::LowStock(_) => "low_stock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentNotice {
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub veterinarian_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecordNotice {
    pub record_id: Uuid,
    pub patient_id: Uuid,
    pub veterinarian_id: Uuid,
    pub appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceNotice {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub total_cents: i64,
    pub balance_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentNotice {
    pub invoice_id: Uuid,
    pub payment_id: Uuid,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
    pub balance_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockNotice {
    pub product_id: Uuid,
    pub name: String,
    pub stock_quantity: i64,
    pub min_stock: i64,
}

/// 事件发布端口
///
/// 没有订阅者时发布不是错误
pub trait ClinicNotifierPort: Send + Sync {
    fn publish(&self, clinic_id: Uuid, event: ClinicEvent);
}
