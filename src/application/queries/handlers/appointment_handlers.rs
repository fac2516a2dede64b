//! Appointment Query Handlers

use std::sync::Arc;
use uuid::Uuid;

use crate::application::access::AccessPolicy;
use crate::application::error::ApplicationError;
use crate::application::ports::{AppointmentRecord, AppointmentRepositoryPort, Page};
use crate::application::queries::{
    Availability, CheckAvailability, GetAppointment, ListAppointments,
};
use crate::domain::scheduling::{find_conflicts, parse_time_of_day, BookedSlot, TimeSlot};
use crate::domain::Permission;

/// 兽医当天与候选时段重叠的预约 id
pub(crate) async fn conflicting_appointments(
    repo: &dyn AppointmentRepositoryPort,
    clinic_id: Uuid,
    veterinarian_id: Uuid,
    slot: &TimeSlot,
    exclude: Option<Uuid>,
) -> Result<Vec<Uuid>, ApplicationError> {
    let booked = repo
        .find_for_veterinarian_on(clinic_id, veterinarian_id, slot.date())
        .await?
        .iter()
        .map(AppointmentRecord::booked_slot)
        .collect::<Result<Vec<BookedSlot>, _>>()?;

    Ok(find_conflicts(slot, &booked, exclude))
}

/// GetAppointment Handler
pub struct GetAppointmentHandler {
    policy: AccessPolicy,
    appointment_repo: Arc<dyn AppointmentRepositoryPort>,
}

impl GetAppointmentHandler {
    pub fn new(policy: AccessPolicy, appointment_repo: Arc<dyn AppointmentRepositoryPort>) -> Self {
        Self {
            policy,
            appointment_repo,
        }
    }

    pub async fn handle(&self, query: GetAppointment) -> Result<AppointmentRecord, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        self.appointment_repo
            .find(query.actor.clinic_id, query.appointment_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Appointment", query.appointment_id))
    }
}

/// ListAppointments Handler
pub struct ListAppointmentsHandler {
    policy: AccessPolicy,
    appointment_repo: Arc<dyn AppointmentRepositoryPort>,
}

impl ListAppointmentsHandler {
    pub fn new(policy: AccessPolicy, appointment_repo: Arc<dyn AppointmentRepositoryPort>) -> Self {
        Self {
            policy,
            appointment_repo,
        }
    }

    pub async fn handle(
        &self,
        query: ListAppointments,
    ) -> Result<Page<AppointmentRecord>, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        if let (Some(from), Some(to)) = (query.filter.date_from, query.filter.date_to) {
            if from > to {
                return Err(ApplicationError::validation(
                    "date_from: must not be after date_to",
                ));
            }
        }

        Ok(self
            .appointment_repo
            .list(query.actor.clinic_id, &query.filter, query.page)
            .await?)
    }
}

/// CheckAvailability Handler
pub struct CheckAvailabilityHandler {
    policy: AccessPolicy,
    appointment_repo: Arc<dyn AppointmentRepositoryPort>,
}

impl CheckAvailabilityHandler {
    pub fn new(policy: AccessPolicy, appointment_repo: Arc<dyn AppointmentRepositoryPort>) -> Self {
        Self {
            policy,
            appointment_repo,
        }
    }

    pub async fn handle(&self, query: CheckAvailability) -> Result<Availability, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        let start = parse_time_of_day(&query.start_time)?;
        let slot = TimeSlot::new(query.date, start, query.duration_minutes)?;

        let conflicts = conflicting_appointments(
            self.appointment_repo.as_ref(),
            query.actor.clinic_id,
            query.veterinarian_id,
            &slot,
            query.exclude_id,
        )
        .await?;

        Ok(Availability {
            available: conflicts.is_empty(),
            conflicts,
        })
    }
}
