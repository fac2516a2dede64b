//! Billing Context - Value Objects

use crate::domain::macros::string_enum;
use crate::domain::DomainError;

string_enum! {
    /// 发票状态
    #[derive(Default)]
    pub enum InvoiceStatus: "status" {
        #[default]
        Draft => "DRAFT",
        Sent => "SENT",
        Partial => "PARTIAL",
        Paid => "PAID",
        Cancelled => "CANCELLED",
    }
}

string_enum! {
    /// 付款方式
    pub enum PaymentMethod: "method" {
        Cash => "CASH",
        Card => "CARD",
        Transfer => "TRANSFER",
        Other => "OTHER",
    }
}

impl InvoiceStatus {
    /// 只有草稿可以编辑明细或删除
    pub fn is_editable(&self) -> bool {
        matches!(self, InvoiceStatus::Draft)
    }

    /// 是否计入应收余额
    pub fn is_outstanding(&self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Partial)
    }

    /// DRAFT → SENT
    pub fn send(self) -> Result<InvoiceStatus, DomainError> {
        match self {
            InvoiceStatus::Draft => Ok(InvoiceStatus::Sent),
            other => Err(DomainError::InvalidTransition {
                from: other.as_str(),
                to: InvoiceStatus::Sent.as_str(),
            }),
        }
    }

    /// 已收款的发票不能作废
    pub fn cancel(self) -> Result<InvoiceStatus, DomainError> {
        match self {
            InvoiceStatus::Draft | InvoiceStatus::Sent => Ok(InvoiceStatus::Cancelled),
            other => Err(DomainError::InvalidTransition {
                from: other.as_str(),
                to: InvoiceStatus::Cancelled.as_str(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_only_from_draft() {
        assert_eq!(InvoiceStatus::Draft.send().unwrap(), InvoiceStatus::Sent);
        assert!(InvoiceStatus::Sent.send().is_err());
        assert!(InvoiceStatus::Paid.send().is_err());
    }

    #[test]
    fn test_cancel_rules() {
        assert!(InvoiceStatus::Draft.cancel().is_ok());
        assert!(InvoiceStatus::Sent.cancel().is_ok());
        assert!(InvoiceStatus::Partial.cancel().is_err());
        assert!(InvoiceStatus::Paid.cancel().is_err());
        assert!(InvoiceStatus::Cancelled.cancel().is_err());
    }
}
