//! Invoice Commands

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::application::access::Actor;
use crate::domain::billing::PaymentMethod;

/// 发票明细输入
#[derive(Debug, Clone)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub product_id: Option<Uuid>,
}

/// 创建发票命令（状态 DRAFT）
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub actor: Actor,
    pub patient_id: Option<Uuid>,
    pub items: Vec<LineItemInput>,
    pub tax_rate_bp: u32,
    pub discount_cents: i64,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// 更新发票命令（仅 DRAFT）
#[derive(Debug, Clone)]
pub struct UpdateInvoice {
    pub actor: Actor,
    pub invoice_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub items: Option<Vec<LineItemInput>>,
    pub tax_rate_bp: Option<u32>,
    pub discount_cents: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// 发送发票命令 DRAFT → SENT
#[derive(Debug, Clone)]
pub struct SendInvoice {
    pub actor: Actor,
    pub invoice_id: Uuid,
}

/// 记录付款命令
#[derive(Debug, Clone)]
pub struct RecordPayment {
    pub actor: Actor,
    pub invoice_id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    /// 缺省为当前时间
    pub paid_at: Option<DateTime<Utc>>,
}

/// 作废发票命令
#[derive(Debug, Clone)]
pub struct CancelInvoice {
    pub actor: Actor,
    pub invoice_id: Uuid,
}

/// 删除发票命令（仅 DRAFT，软删除）
#[derive(Debug, Clone)]
pub struct DeleteInvoice {
    pub actor: Actor,
    pub invoice_id: Uuid,
}
