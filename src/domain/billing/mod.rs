//! Billing Context - 发票与付款
//!
//! 职责:
//! - 发票明细与金额计算（整数分，避免浮点误差）
//! - 发票状态流转 DRAFT → SENT → PARTIAL → PAID
//! - 部分付款对账

mod payment;
mod totals;
mod value_objects;

pub use payment::{settle_payment, PaymentOutcome};
pub use totals::{format_invoice_number, InvoiceTotals, LineItem};
pub use value_objects::{InvoiceStatus, PaymentMethod};
