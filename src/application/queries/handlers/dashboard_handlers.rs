//! Dashboard Query Handlers

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::access::AccessPolicy;
use crate::application::error::ApplicationError;
use crate::application::ports::DashboardRepositoryPort;
use crate::application::queries::{DashboardStats, GetDashboardStats};
use crate::domain::scheduling::AppointmentStatus;
use crate::domain::Permission;

const RECENT_RECORDS: u32 = 5;
const UPCOMING_DAYS: i64 = 7;

/// 当月第一天与下月第一天
fn month_bounds(today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = today.with_day(1)?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    Some((first, next))
}

/// GetDashboardStats Handler
pub struct GetDashboardStatsHandler {
    policy: AccessPolicy,
    dashboard_repo: Arc<dyn DashboardRepositoryPort>,
}

impl GetDashboardStatsHandler {
    pub fn new(policy: AccessPolicy, dashboard_repo: Arc<dyn DashboardRepositoryPort>) -> Self {
        Self {
            policy,
            dashboard_repo,
        }
    }

    pub async fn handle(&self, query: GetDashboardStats) -> Result<DashboardStats, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        let clinic_id = query.actor.clinic_id;
        let today = query.today;
        let repo = &self.dashboard_repo;

        let (month_start, next_month) = month_bounds(today)
            .ok_or_else(|| ApplicationError::validation("today: date out of range"))?;
        let from = Utc.from_utc_datetime(&month_start.and_time(NaiveTime::MIN));
        let to = Utc.from_utc_datetime(&next_month.and_time(NaiveTime::MIN));

        let mut appointments_today: BTreeMap<&'static str, u64> = AppointmentStatus::ALL
            .iter()
            .map(|status| (status.as_str(), 0))
            .collect();
        for (status, count) in repo.appointment_counts_on(clinic_id, today).await? {
            appointments_today.insert(status.as_str(), count);
        }

        let stats = DashboardStats {
            active_patients: repo.count_active_patients(clinic_id).await?,
            appointments_today,
            upcoming_appointments: repo
                .count_upcoming(
                    clinic_id,
                    today + Duration::days(1),
                    today + Duration::days(UPCOMING_DAYS),
                )
                .await?,
            revenue_month_cents: repo.revenue_between(clinic_id, from, to).await?,
            outstanding_cents: repo.outstanding_balance(clinic_id).await?,
            low_stock_products: repo.count_low_stock(clinic_id).await?,
            recent_medical_records: repo
                .recent_medical_records(clinic_id, RECENT_RECORDS)
                .await?,
        };

        tracing::debug!(
            clinic_id = %clinic_id,
            active_patients = stats.active_patients,
            appointments_today = stats.appointments_today_total(),
            "Dashboard stats computed"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::access::Actor;
    use crate::application::commands::{
        AdjustStock, CreateAppointment, CreateInvoice, CreateProduct, LineItemInput,
        RecordPayment, SendInvoice,
    };
    use crate::domain::billing::PaymentMethod;
    use crate::domain::inventory::ProductCategory;
    use crate::test_support::TestApp;

    #[test]
    fn test_month_bounds_wraps_year() {
        let (start, next) = month_bounds(NaiveDate::from_ymd_opt(2030, 12, 17).unwrap()).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2030, 12, 1).unwrap());
        assert_eq!(next, NaiveDate::from_ymd_opt(2031, 1, 1).unwrap());
    }

    #[tokio::test]
    async fn test_dashboard_aggregates_clinic_activity() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let actor = Actor::new(owner.id, app.clinic(owner.id).await);
        let patient = app.patient(actor, "Rex").await;
        app.patient(actor, "Luna").await;
        let today = Utc::now().date_naive();

        for (offset, start) in [(0, "09:00"), (0, "10:00"), (2, "09:00"), (10, "09:00")] {
            app.state
                .create_appointment_handler
                .handle(CreateAppointment {
                    actor,
                    patient_id: patient.id,
                    veterinarian_id: owner.id,
                    date: today + Duration::days(offset),
                    start_time: start.to_string(),
                    duration_minutes: 30,
                    reason: None,
                    notes: None,
                })
                .await
                .unwrap();
        }

        let invoice = app
            .state
            .create_invoice_handler
            .handle(CreateInvoice {
                actor,
                patient_id: Some(patient.id),
                items: vec![LineItemInput {
                    description: "Surgery".to_string(),
                    quantity: 1,
                    unit_price_cents: 20_000,
                    product_id: None,
                }],
                tax_rate_bp: 0,
                discount_cents: 0,
                due_date: None,
                notes: None,
            })
            .await
            .unwrap();
        app.state
            .send_invoice_handler
            .handle(SendInvoice {
                actor,
                invoice_id: invoice.id,
            })
            .await
            .unwrap();
        app.state
            .record_payment_handler
            .handle(RecordPayment {
                actor,
                invoice_id: invoice.id,
                amount_cents: 5_000,
                method: PaymentMethod::Cash,
                reference: None,
                paid_at: None,
            })
            .await
            .unwrap();

        let product = app
            .state
            .create_product_handler
            .handle(CreateProduct {
                actor,
                name: "Gauze".to_string(),
                sku: None,
                category: ProductCategory::Supply,
                description: None,
                unit: Some("box".to_string()),
                price_cents: 300,
                cost_cents: None,
                stock_quantity: 4,
                min_stock: 2,
            })
            .await
            .unwrap();
        app.state
            .adjust_stock_handler
            .handle(AdjustStock {
                actor,
                product_id: product.id,
                delta: -3,
                reason: None,
            })
            .await
            .unwrap();

        let stats = app
            .state
            .get_dashboard_stats_handler
            .handle(GetDashboardStats { actor, today })
            .await
            .unwrap();

        assert_eq!(stats.active_patients, 2);
        assert_eq!(stats.appointments_today["SCHEDULED"], 2);
        assert_eq!(stats.appointments_today["COMPLETED"], 0);
        assert_eq!(stats.appointments_today_total(), 2);
        assert_eq!(stats.upcoming_appointments, 1);
        assert_eq!(stats.revenue_month_cents, 5_000);
        assert_eq!(stats.outstanding_cents, 15_000);
        assert_eq!(stats.low_stock_products, 1);
        assert!(stats.recent_medical_records.is_empty());
    }
}
