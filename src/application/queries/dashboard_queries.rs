//! Dashboard Queries

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::application::access::Actor;
use crate::application::ports::RecentMedicalRecord;

/// 获取仪表盘统计
#[derive(Debug, Clone)]
pub struct GetDashboardStats {
    pub actor: Actor,
    pub today: NaiveDate,
}

/// 仪表盘统计结果
#[derive(Debug, Clone)]
pub struct DashboardStats {
    pub active_patients: u64,
    /// 今日预约数（按状态，包含计数为 0 的状态）
    pub appointments_today: BTreeMap<&'static str, u64>,
    pub upcoming_appointments: u64,
    pub revenue_month_cents: i64,
    pub outstanding_cents: i64,
    pub low_stock_products: u64,
    pub recent_medical_records: Vec<RecentMedicalRecord>,
}

impl DashboardStats {
    pub fn appointments_today_total(&self) -> u64 {
        self.appointments_today.values().sum()
    }
}

