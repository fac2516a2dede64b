//! Invoice Repository Port

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::{Page, PageRequest, RepositoryError};
use crate::domain::billing::{
    InvoiceStatus, InvoiceTotals, LineItem, PaymentMethod, PaymentOutcome,
};

/// 发票实体
#[derive(Debug, Clone)]
pub struct InvoiceRecord {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub items: Vec<LineItem>,
    pub totals: InvoiceTotals,
    /// 由付款记录汇总得到，只读
    pub amount_paid_cents: i64,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceRecord {
    pub fn balance_cents(&self) -> i64 {
        self.totals.total_cents - self.amount_paid_cents
    }
}

/// 付款记录
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub clinic_id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub recorded_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub patient_id: Option<Uuid>,
    /// 匹配发票编号
    pub search: Option<String>,
}

/// Invoice Repository Port
#[async_trait]
pub trait InvoiceRepositoryPort: Send + Sync {
    /// 写入发票头与明细，编号重复返回 Duplicate
    async fn insert(&self, invoice: &InvoiceRecord) -> Result<(), RepositoryError>;

    /// 更新发票头并整体替换明细
    async fn update(&self, invoice: &InvoiceRecord) -> Result<(), RepositoryError>;

    async fn find(&self, clinic_id: Uuid, id: Uuid) -> Result<Option<InvoiceRecord>, RepositoryError>;

    async fn list(
        &self,
        clinic_id: Uuid,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> Result<Page<InvoiceRecord>, RepositoryError>;

    /// 以 prefix 开头的发票编号数量（含已删除），用于生成序号
    async fn count_numbers_with_prefix(
        &self,
        clinic_id: Uuid,
        prefix: &str,
    ) -> Result<u32, RepositoryError>;

    async fn payments(&self, invoice_id: Uuid) -> Result<Vec<PaymentRecord>, RepositoryError>;

    /// 写入付款并按重新汇总的已付金额更新发票状态（同一事务）
    ///
    /// 发票不可收款或付款会超出余额时不做任何修改，返回 None
    async fn record_payment(
        &self,
        payment: &PaymentRecord,
    ) -> Result<Option<PaymentOutcome>, RepositoryError>;
}
