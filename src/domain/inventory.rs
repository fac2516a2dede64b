//! Inventory Context - 库存

use super::macros::string_enum;
use super::DomainError;

string_enum! {
    /// 商品分类
    pub enum ProductCategory: "category" {
        Medication => "MEDICATION",
        Vaccine => "VACCINE",
        Food => "FOOD",
        Supply => "SUPPLY",
        Equipment => "EQUIPMENT",
        Other => "OTHER",
    }
}

/// 库存水位
///
/// 不变量: quantity >= 0, min_stock >= 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    quantity: i64,
    min_stock: i64,
}

impl StockLevel {
    pub fn new(quantity: i64, min_stock: i64) -> Result<Self, DomainError> {
        if quantity < 0 {
            return Err(DomainError::invalid("stock_quantity", "cannot be negative"));
        }
        if min_stock < 0 {
            return Err(DomainError::invalid("min_stock", "cannot be negative"));
        }
        Ok(Self { quantity, min_stock })
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn min_stock(&self) -> i64 {
        self.min_stock
    }

    /// 库存不高于最低库存即为低库存
    pub fn is_low(&self) -> bool {
        self.quantity <= self.min_stock
    }

    /// 按增量调整库存，结果不能为负
    pub fn adjust(self, delta: i64) -> Result<Self, DomainError> {
        if delta == 0 {
            return Err(DomainError::invalid("delta", "cannot be zero"));
        }
        let quantity = self
            .quantity
            .checked_add(delta)
            .ok_or_else(|| DomainError::invalid("delta", "out of range"))?;
        if quantity < 0 {
            return Err(DomainError::rule(format!(
                "Insufficient stock: {} available, {} requested",
                self.quantity, -delta
            )));
        }
        Ok(Self { quantity, ..self })
    }
}
