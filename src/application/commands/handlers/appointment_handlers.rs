//! Appointment Command Handlers
//!
//! 创建与改期都会做排班冲突检查：
//! 同一兽医、同一天、未取消/未爽约的有效预约之间不能重叠

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::access::AccessPolicy;
use crate::application::commands::{
    CreateAppointment, DeleteAppointment, UpdateAppointment, UpdateAppointmentStatus,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AppointmentNotice, AppointmentRecord, AppointmentRepositoryPort, ClinicEvent,
    ClinicNotifierPort, PatientRepositoryPort,
};
use crate::application::queries::handlers::conflicting_appointments;
use crate::domain::scheduling::{format_time_of_day, parse_time_of_day, AppointmentStatus, TimeSlot};
use crate::domain::validation::optional_text;
use crate::domain::Permission;

const REASON_MAX: usize = 255;
const NOTES_MAX: usize = 2000;

pub(crate) fn appointment_notice(appointment: &AppointmentRecord) -> AppointmentNotice {
    AppointmentNotice {
        appointment_id: appointment.id,
        patient_id: appointment.patient_id,
        veterinarian_id: appointment.veterinarian_id,
        date: appointment.date,
        start_time: format_time_of_day(appointment.start_time),
        duration_minutes: appointment.duration_minutes,
        status: appointment.status,
    }
}

fn conflict_error(conflicts: &[Uuid]) -> ApplicationError {
    let ids: Vec<String> = conflicts.iter().map(Uuid::to_string).collect();
    ApplicationError::conflict(format!(
        "Veterinarian is already booked at this time (appointments: {})",
        ids.join(", ")
    ))
}

/// 预约涉及的患者与兽医校验
struct BookingGuard {
    policy: AccessPolicy,
    patient_repo: Arc<dyn PatientRepositoryPort>,
    appointment_repo: Arc<dyn AppointmentRepositoryPort>,
}

impl BookingGuard {
    async fn ensure_patient(&self, clinic_id: Uuid, patient_id: Uuid) -> Result<(), ApplicationError> {
        self.patient_repo
            .find(clinic_id, patient_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| ApplicationError::not_found("Patient", patient_id))
    }

    async fn ensure_veterinarian(
        &self,
        clinic_id: Uuid,
        veterinarian_id: Uuid,
    ) -> Result<(), ApplicationError> {
        match self.policy.role_of(veterinarian_id, clinic_id).await? {
            Some(role) if role.can_attend_appointments() => Ok(()),
            _ => Err(ApplicationError::validation(
                "veterinarian_id: user is not a veterinarian of this clinic",
            )),
        }
    }

    async fn ensure_free(
        &self,
        clinic_id: Uuid,
        veterinarian_id: Uuid,
        slot: &TimeSlot,
        exclude: Option<Uuid>,
    ) -> Result<(), ApplicationError> {
        let conflicts = conflicting_appointments(
            self.appointment_repo.as_ref(),
            clinic_id,
            veterinarian_id,
            slot,
            exclude,
        )
        .await?;

        if conflicts.is_empty() {
            Ok(())
        } else {
            tracing::warn!(
                clinic_id = %clinic_id,
                veterinarian_id = %veterinarian_id,
                date = %slot.date(),
                conflicts = conflicts.len(),
                "Appointment slot conflict"
            );
            Err(conflict_error(&conflicts))
        }
    }

    /// 写入时时间段已被并发请求占用
    async fn slot_taken(
        &self,
        clinic_id: Uuid,
        veterinarian_id: Uuid,
        slot: &TimeSlot,
        exclude: Option<Uuid>,
    ) -> ApplicationError {
        match self.ensure_free(clinic_id, veterinarian_id, slot, exclude).await {
            Err(e) => e,
            Ok(()) => ApplicationError::conflict("Veterinarian is already booked at this time"),
        }
    }
}

// ============================================================================
// CreateAppointment
// ============================================================================

pub struct CreateAppointmentHandler {
    guard: BookingGuard,
    notifier: Arc<dyn ClinicNotifierPort>,
}

impl CreateAppointmentHandler {
    pub fn new(
        policy: AccessPolicy,
        patient_repo: Arc<dyn PatientRepositoryPort>,
        appointment_repo: Arc<dyn AppointmentRepositoryPort>,
        notifier: Arc<dyn ClinicNotifierPort>,
    ) -> Self {
        Self {
            guard: BookingGuard {
                policy,
                patient_repo,
                appointment_repo,
            },
            notifier,
        }
    }

    pub async fn handle(&self, cmd: CreateAppointment) -> Result<AppointmentRecord, ApplicationError> {
        self.guard
            .policy
            .authorize(&cmd.actor, Permission::WriteAppointments)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let start_time = parse_time_of_day(&cmd.start_time)?;
        let slot = TimeSlot::new(cmd.date, start_time, cmd.duration_minutes)?;
        let reason = optional_text("reason", cmd.reason.as_deref(), REASON_MAX)?;
        let notes = optional_text("notes", cmd.notes.as_deref(), NOTES_MAX)?;

        self.guard.ensure_patient(clinic_id, cmd.patient_id).await?;
        self.guard
            .ensure_veterinarian(clinic_id, cmd.veterinarian_id)
            .await?;
        self.guard
            .ensure_free(clinic_id, cmd.veterinarian_id, &slot, None)
            .await?;

        let now = Utc::now();
        let appointment = AppointmentRecord {
            id: Uuid::new_v4(),
            clinic_id,
            patient_id: cmd.patient_id,
            veterinarian_id: cmd.veterinarian_id,
            date: slot.date(),
            start_time: slot.start(),
            duration_minutes: slot.duration_minutes(),
            reason,
            notes,
            status: AppointmentStatus::Scheduled,
            is_active: true,
            created_by: cmd.actor.user_id,
            created_at: now,
            updated_at: now,
        };

        if !self.guard.appointment_repo.insert(&appointment).await? {
            return Err(self
                .guard
                .slot_taken(clinic_id, appointment.veterinarian_id, &slot, None)
                .await);
        }

        tracing::info!(
            clinic_id = %clinic_id,
            appointment_id = %appointment.id,
            veterinarian_id = %appointment.veterinarian_id,
            date = %appointment.date,
            start_time = %format_time_of_day(appointment.start_time),
            "Appointment created"
        );

        self.notifier.publish(
            clinic_id,
            ClinicEvent::AppointmentCreated(appointment_notice(&appointment)),
        );

        Ok(appointment)
    }
}

// ============================================================================
// UpdateAppointment
// ============================================================================

pub struct UpdateAppointmentHandler {
    guard: BookingGuard,
    notifier: Arc<dyn ClinicNotifierPort>,
}

impl UpdateAppointmentHandler {
    pub fn new(
        policy: AccessPolicy,
        patient_repo: Arc<dyn PatientRepositoryPort>,
        appointment_repo: Arc<dyn AppointmentRepositoryPort>,
        notifier: Arc<dyn ClinicNotifierPort>,
    ) -> Self {
        Self {
            guard: BookingGuard {
                policy,
                patient_repo,
                appointment_repo,
            },
            notifier,
        }
    }

    pub async fn handle(&self, cmd: UpdateAppointment) -> Result<AppointmentRecord, ApplicationError> {
        self.guard
            .policy
            .authorize(&cmd.actor, Permission::WriteAppointments)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut appointment = self
            .guard
            .appointment_repo
            .find(clinic_id, cmd.appointment_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Appointment", cmd.appointment_id))?;

        if appointment.status.is_terminal() {
            return Err(ApplicationError::invalid_state(format!(
                "Appointment is {} and can no longer be edited",
                appointment.status
            )));
        }

        if let Some(patient_id) = cmd.patient_id {
            if patient_id != appointment.patient_id {
                self.guard.ensure_patient(clinic_id, patient_id).await?;
                appointment.patient_id = patient_id;
            }
        }

        let rescheduled = cmd.veterinarian_id.is_some()
            || cmd.date.is_some()
            || cmd.start_time.is_some()
            || cmd.duration_minutes.is_some();

        let mut new_slot = None;
        if rescheduled {
            let veterinarian_id = cmd.veterinarian_id.unwrap_or(appointment.veterinarian_id);
            let start_time = match cmd.start_time.as_deref() {
                Some(raw) => parse_time_of_day(raw)?,
                None => appointment.start_time,
            };
            let slot = TimeSlot::new(
                cmd.date.unwrap_or(appointment.date),
                start_time,
                cmd.duration_minutes.unwrap_or(appointment.duration_minutes),
            )?;

            if veterinarian_id != appointment.veterinarian_id {
                self.guard
                    .ensure_veterinarian(clinic_id, veterinarian_id)
                    .await?;
            }
            self.guard
                .ensure_free(clinic_id, veterinarian_id, &slot, Some(appointment.id))
                .await?;

            appointment.veterinarian_id = veterinarian_id;
            appointment.date = slot.date();
            appointment.start_time = slot.start();
            appointment.duration_minutes = slot.duration_minutes();
            new_slot = Some(slot);
        }

        if let Some(reason) = cmd.reason.as_deref() {
            appointment.reason = optional_text("reason", Some(reason), REASON_MAX)?;
        }
        if let Some(notes) = cmd.notes.as_deref() {
            appointment.notes = optional_text("notes", Some(notes), NOTES_MAX)?;
        }
        appointment.updated_at = Utc::now();

        match new_slot {
            Some(slot) => {
                if !self.guard.appointment_repo.reschedule(&appointment).await? {
                    let exclude = Some(appointment.id);
                    return Err(self
                        .guard
                        .slot_taken(clinic_id, appointment.veterinarian_id, &slot, exclude)
                        .await);
                }
            }
            None => self.guard.appointment_repo.update(&appointment).await?,
        }

        tracing::info!(
            clinic_id = %clinic_id,
            appointment_id = %appointment.id,
            rescheduled = rescheduled,
            "Appointment updated"
        );

        self.notifier.publish(
            clinic_id,
            ClinicEvent::AppointmentUpdated(appointment_notice(&appointment)),
        );

        Ok(appointment)
    }
}

// ============================================================================
// UpdateAppointmentStatus
// ============================================================================

pub struct UpdateAppointmentStatusHandler {
    policy: AccessPolicy,
    appointment_repo: Arc<dyn AppointmentRepositoryPort>,
    notifier: Arc<dyn ClinicNotifierPort>,
}

impl UpdateAppointmentStatusHandler {
    pub fn new(
        policy: AccessPolicy,
        appointment_repo: Arc<dyn AppointmentRepositoryPort>,
        notifier: Arc<dyn ClinicNotifierPort>,
    ) -> Self {
        Self {
            policy,
            appointment_repo,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: UpdateAppointmentStatus,
    ) -> Result<AppointmentRecord, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteAppointments)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut appointment = self
            .appointment_repo
            .find(clinic_id, cmd.appointment_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Appointment", cmd.appointment_id))?;

        let previous = appointment.status;
        appointment.status = previous.transition(cmd.status)?;
        appointment.updated_at = Utc::now();

        self.appointment_repo.update(&appointment).await?;

        tracing::info!(
            clinic_id = %clinic_id,
            appointment_id = %appointment.id,
            from = %previous,
            to = %appointment.status,
            "Appointment status changed"
        );

        self.notifier.publish(
            clinic_id,
            ClinicEvent::AppointmentUpdated(appointment_notice(&appointment)),
        );

        Ok(appointment)
    }
}

// ============================================================================
// DeleteAppointment
// ============================================================================

pub struct DeleteAppointmentHandler {
    policy: AccessPolicy,
    appointment_repo: Arc<dyn AppointmentRepositoryPort>,
    notifier: Arc<dyn ClinicNotifierPort>,
}

impl DeleteAppointmentHandler {
    pub fn new(
        policy: AccessPolicy,
        appointment_repo: Arc<dyn AppointmentRepositoryPort>,
        notifier: Arc<dyn ClinicNotifierPort>,
    ) -> Self {
        Self {
            policy,
            appointment_repo,
            notifier,
        }
    }

    pub async fn handle(&self, cmd: DeleteAppointment) -> Result<(), ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteAppointments)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut appointment = self
            .appointment_repo
            .find(clinic_id, cmd.appointment_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Appointment", cmd.appointment_id))?;

        appointment.is_active = false;
        appointment.updated_at = Utc::now();
        self.appointment_repo.update(&appointment).await?;

        tracing::info!(clinic_id = %clinic_id, appointment_id = %appointment.id, "Appointment deleted");

        self.notifier.publish(
            clinic_id,
            ClinicEvent::AppointmentCancelled(appointment_notice(&appointment)),
        );

        Ok(())
    }
}
