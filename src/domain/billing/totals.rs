//! 发票金额计算

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::validation::required_text;
use crate::domain::DomainError;

/// 税率上限（basis points，10000 = 100%）
const MAX_TAX_RATE_BP: u32 = 10_000;

/// 发票明细行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub product_id: Option<Uuid>,
}

impl LineItem {
    pub fn new(
        description: &str,
        quantity: u32,
        unit_price_cents: i64,
        product_id: Option<Uuid>,
    ) -> Result<Self, DomainError> {
        let description = required_text("description", description, 255)?;
        if quantity == 0 {
            return Err(DomainError::invalid("quantity", "must be greater than 0"));
        }
        if unit_price_cents < 0 {
            return Err(DomainError::invalid("unit_price_cents", "cannot be negative"));
        }
        Ok(Self {
            description,
            quantity,
            unit_price_cents,
            product_id,
        })
    }

    pub fn line_total_cents(&self) -> i64 {
        i64::from(self.quantity) * self.unit_price_cents
    }
}

/// 发票金额汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvoiceTotals {
    pub subtotal_cents: i64,
    pub tax_rate_bp: u32,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl InvoiceTotals {
    /// total = subtotal + round(subtotal * rate) - discount
    pub fn compute(
        items: &[LineItem],
        tax_rate_bp: u32,
        discount_cents: i64,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::invalid("items", "invoice needs at least one item"));
        }
        if tax_rate_bp > MAX_TAX_RATE_BP {
            return Err(DomainError::invalid(
                "tax_rate_bp",
                "must be between 0 and 10000 basis points",
            ));
        }
        if discount_cents < 0 {
            return Err(DomainError::invalid("discount_cents", "cannot be negative"));
        }

        let subtotal_cents: i64 = items.iter().map(LineItem::line_total_cents).sum();
        // 四舍五入到分
        let tax_cents = (subtotal_cents * i64::from(tax_rate_bp) + 5_000) / 10_000;

        if discount_cents > subtotal_cents + tax_cents {
            return Err(DomainError::invalid(
                "discount_cents",
                "cannot exceed the invoice amount",
            ));
        }

        Ok(Self {
            subtotal_cents,
            tax_rate_bp,
            tax_cents,
            discount_cents,
            total_cents: subtotal_cents + tax_cents - discount_cents,
        })
    }
}

/// 发票编号: INV-YYYYMM-NNNN
pub fn format_invoice_number(issued_on: NaiveDate, sequence: u32) -> String {
    format!(
        "INV-{:04}{:02}-{:04}",
        issued_on.year(),
        issued_on.month(),
        sequence
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: u32, price: i64) -> LineItem {
        LineItem::new("Consultation", quantity, price, None).unwrap()
    }

    #[test]
    fn test_totals_with_tax_and_discount() {
        let items = vec![item(1, 5_000), item(2, 1_250)];
        let totals = InvoiceTotals::compute(&items, 1_600, 500).unwrap();
        assert_eq!(totals.subtotal_cents, 7_500);
        assert_eq!(totals.tax_cents, 1_200);
        assert_eq!(totals.total_cents, 8_200);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 333 * 5% = 16.65 → 17
        let totals = InvoiceTotals::compute(&[item(1, 333)], 500, 0).unwrap();
        assert_eq!(totals.tax_cents, 17);
        // 329 * 5% = 16.45 → 16
        let totals = InvoiceTotals::compute(&[item(1, 329)], 500, 0).unwrap();
        assert_eq!(totals.tax_cents, 16);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(InvoiceTotals::compute(&[], 0, 0).is_err());
        assert!(InvoiceTotals::compute(&[item(1, 100)], 10_001, 0).is_err());
        assert!(InvoiceTotals::compute(&[item(1, 100)], 0, 101).is_err());
        assert!(InvoiceTotals::compute(&[item(1, 100)], 0, -1).is_err());
        assert!(LineItem::new("x", 0, 100, None).is_err());
        assert!(LineItem::new("x", 1, -1, None).is_err());
        assert!(LineItem::new("  ", 1, 1, None).is_err());
    }

    #[test]
    fn test_invoice_number_format() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 9).unwrap();
        assert_eq!(format_invoice_number(date, 12), "INV-202407-0012");
    }
}
