//! Invoice Queries

use uuid::Uuid;

use crate::application::access::Actor;
use crate::application::ports::{InvoiceFilter, InvoiceRecord, PageRequest, PaymentRecord};

/// 获取发票（含付款记录）
#[derive(Debug, Clone)]
pub struct GetInvoice {
    pub actor: Actor,
    pub invoice_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct ListInvoices {
    pub actor: Actor,
    pub filter: InvoiceFilter,
    pub page: PageRequest,
}

/// 发票详情
#[derive(Debug, Clone)]
pub struct InvoiceDetails {
    pub invoice: InvoiceRecord,
    pub payments: Vec<PaymentRecord>,
}
