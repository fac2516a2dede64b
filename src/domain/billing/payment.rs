//! 付款对账
//!
//! 记录付款后重新汇总已付金额：
//! - 已付 >= 总额 → PAID
//! - 0 < 已付 < 总额 → PARTIAL

use super::InvoiceStatus;
use crate::domain::DomainError;

/// 付款结算结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub status: InvoiceStatus,
    pub amount_paid_cents: i64,
    pub balance_cents: i64,
}

impl PaymentOutcome {
    /// 按总额与已付合计判定状态
    pub fn from_totals(total_cents: i64, amount_paid_cents: i64) -> Self {
        let status = if amount_paid_cents >= total_cents {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Partial
        };
        Self {
            status,
            amount_paid_cents,
            balance_cents: total_cents - amount_paid_cents,
        }
    }

    pub fn is_fully_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }
}

/// 对一张发票应用一笔新付款
///
/// `paid_so_far_cents` 为此前所有付款之和
pub fn settle_payment(
    status: InvoiceStatus,
    total_cents: i64,
    paid_so_far_cents: i64,
    amount_cents: i64,
) -> Result<PaymentOutcome, DomainError> {
    match status {
        InvoiceStatus::Sent | InvoiceStatus::Partial => {}
        other => {
            return Err(DomainError::InvalidTransition {
                from: other.as_str(),
                to: InvoiceStatus::Partial.as_str(),
            })
        }
    }

    if amount_cents <= 0 {
        return Err(DomainError::invalid("amount_cents", "must be greater than 0"));
    }

    let balance = total_cents - paid_so_far_cents;
    if amount_cents > balance {
        return Err(DomainError::rule(format!(
            "Payment of {} exceeds outstanding balance of {}",
            amount_cents, balance
        )));
    }

    Ok(PaymentOutcome::from_totals(
        total_cents,
        paid_so_far_cents + amount_cents,
    ))
}
