//! Medical Record Command Handlers

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::access::AccessPolicy;
use super::appointment_handlers::appointment_notice;
use crate::application::commands::{CreateMedicalRecord, DeleteMedicalRecord, UpdateMedicalRecord};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AppointmentRepositoryPort, ClinicEvent, ClinicNotifierPort, MedicalRecordEntry,
    MedicalRecordNotice, MedicalRecordRepositoryPort, PatientRepositoryPort,
};
use crate::domain::scheduling::AppointmentStatus;
use crate::domain::validation::{optional_text, positive_measure, required_text};
use crate::domain::{DomainError, Permission};

const TEXT_MAX: usize = 4000;

/// 体温合理范围（摄氏度）
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 25.0..=45.0;

fn validate_temperature(value: Option<f64>) -> Result<Option<f64>, DomainError> {
    match value {
        Some(t) if !TEMPERATURE_RANGE.contains(&t) => Err(DomainError::invalid(
            "temperature_c",
            "must be between 25.0 and 45.0",
        )),
        other => Ok(other),
    }
}

fn record_notice(record: &MedicalRecordEntry) -> MedicalRecordNotice {
    MedicalRecordNotice {
        record_id: record.id,
        patient_id: record.patient_id,
        veterinarian_id: record.veterinarian_id,
        appointment_id: record.appointment_id,
    }
}

// ============================================================================
// CreateMedicalRecord
// ============================================================================

pub struct CreateMedicalRecordHandler {
    policy: AccessPolicy,
    patient_repo: Arc<dyn PatientRepositoryPort>,
    appointment_repo: Arc<dyn AppointmentRepositoryPort>,
    record_repo: Arc<dyn MedicalRecordRepositoryPort>,
    notifier: Arc<dyn ClinicNotifierPort>,
}

impl CreateMedicalRecordHandler {
    pub fn new(
        policy: AccessPolicy,
        patient_repo: Arc<dyn PatientRepositoryPort>,
        appointment_repo: Arc<dyn AppointmentRepositoryPort>,
        record_repo: Arc<dyn MedicalRecordRepositoryPort>,
        notifier: Arc<dyn ClinicNotifierPort>,
    ) -> Self {
        Self {
            policy,
            patient_repo,
            appointment_repo,
            record_repo,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateMedicalRecord,
    ) -> Result<MedicalRecordEntry, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteMedicalRecords)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let now = Utc::now();

        let record = MedicalRecordEntry {
            id: Uuid::new_v4(),
            clinic_id,
            patient_id: cmd.patient_id,
            veterinarian_id: cmd.actor.user_id,
            appointment_id: cmd.appointment_id,
            visit_date: cmd.visit_date.unwrap_or_else(|| now.date_naive()),
            chief_complaint: required_text("chief_complaint", &cmd.chief_complaint, TEXT_MAX)?,
            diagnosis: optional_text("diagnosis", cmd.diagnosis.as_deref(), TEXT_MAX)?,
            treatment: optional_text("treatment", cmd.treatment.as_deref(), TEXT_MAX)?,
            prescriptions: optional_text("prescriptions", cmd.prescriptions.as_deref(), TEXT_MAX)?,
            weight_kg: positive_measure("weight_kg", cmd.weight_kg)?,
            temperature_c: validate_temperature(cmd.temperature_c)?,
            notes: optional_text("notes", cmd.notes.as_deref(), TEXT_MAX)?,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        if self
            .patient_repo
            .find(clinic_id, cmd.patient_id)
            .await?
            .is_none()
        {
            return Err(ApplicationError::not_found("Patient", cmd.patient_id));
        }

        let appointment = match cmd.appointment_id {
            Some(appointment_id) => {
                let appointment = self
                    .appointment_repo
                    .find(clinic_id, appointment_id)
                    .await?
                    .ok_or_else(|| ApplicationError::not_found("Appointment", appointment_id))?;
                if appointment.patient_id != cmd.patient_id {
                    return Err(ApplicationError::validation(
                        "appointment_id: appointment belongs to another patient",
                    ));
                }
                Some(appointment)
            }
            None => None,
        };

        self.record_repo.insert(&record).await?;

        tracing::info!(
            clinic_id = %clinic_id,
            record_id = %record.id,
            patient_id = %record.patient_id,
            "Medical record created"
        );

        self.notifier.publish(
            clinic_id,
            ClinicEvent::MedicalRecordCreated(record_notice(&record)),
        );

        // 就诊中的预约随病历完成
        if let Some(mut appointment) = appointment {
            if appointment.status == AppointmentStatus::InProgress {
                appointment.status = appointment.status.transition(AppointmentStatus::Completed)?;
                appointment.updated_at = now;
                self.appointment_repo.update(&appointment).await?;

                tracing::info!(
                    clinic_id = %clinic_id,
                    appointment_id = %appointment.id,
                    "Appointment completed by medical record"
                );

                self.notifier.publish(
                    clinic_id,
                    ClinicEvent::AppointmentUpdated(appointment_notice(&appointment)),
                );
            }
        }

        Ok(record)
    }
}

// ============================================================================
// UpdateMedicalRecord
// ============================================================================

pub struct UpdateMedicalRecordHandler {
    policy: AccessPolicy,
    record_repo: Arc<dyn MedicalRecordRepositoryPort>,
    notifier: Arc<dyn ClinicNotifierPort>,
}

impl UpdateMedicalRecordHandler {
    pub fn new(
        policy: AccessPolicy,
        record_repo: Arc<dyn MedicalRecordRepositoryPort>,
        notifier: Arc<dyn ClinicNotifierPort>,
    ) -> Self {
        Self {
            policy,
            record_repo,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: UpdateMedicalRecord,
    ) -> Result<MedicalRecordEntry, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteMedicalRecords)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut record = self
            .record_repo
            .find(clinic_id, cmd.record_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("MedicalRecord", cmd.record_id))?;

        if let Some(visit_date) = cmd.visit_date {
            record.visit_date = visit_date;
        }
        if let Some(complaint) = cmd.chief_complaint.as_deref() {
            record.chief_complaint = required_text("chief_complaint", complaint, TEXT_MAX)?;
        }
        if let Some(diagnosis) = cmd.diagnosis.as_deref() {
            record.diagnosis = optional_text("diagnosis", Some(diagnosis), TEXT_MAX)?;
        }
        if let Some(treatment) = cmd.treatment.as_deref() {
            record.treatment = optional_text("treatment", Some(treatment), TEXT_MAX)?;
        }
        if let Some(prescriptions) = cmd.prescriptions.as_deref() {
            record.prescriptions = optional_text("prescriptions", Some(prescriptions), TEXT_MAX)?;
        }
        if cmd.weight_kg.is_some() {
            record.weight_kg = positive_measure("weight_kg", cmd.weight_kg)?;
        }
        if cmd.temperature_c.is_some() {
            record.temperature_c = validate_temperature(cmd.temperature_c)?;
        }
        if let Some(notes) = cmd.notes.as_deref() {
            record.notes = optional_text("notes", Some(notes), TEXT_MAX)?;
        }
        record.updated_at = Utc::now();

        self.record_repo.update(&record).await?;

        tracing::info!(clinic_id = %clinic_id, record_id = %record.id, "Medical record updated");

        self.notifier.publish(
            clinic_id,
            ClinicEvent::MedicalRecordUpdated(record_notice(&record)),
        );

        Ok(record)
    }
}

// ============================================================================
// DeleteMedicalRecord
// ============================================================================

pub struct DeleteMedicalRecordHandler {
    policy: AccessPolicy,
    record_repo: Arc<dyn MedicalRecordRepositoryPort>,
}

impl DeleteMedicalRecordHandler {
    pub fn new(policy: AccessPolicy, record_repo: Arc<dyn MedicalRecordRepositoryPort>) -> Self {
        Self {
            policy,
            record_repo,
        }
    }

    pub async fn handle(&self, cmd: DeleteMedicalRecord) -> Result<(), ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteMedicalRecords)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut record = self
            .record_repo
            .find(clinic_id, cmd.record_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("MedicalRecord", cmd.record_id))?;

        record.is_active = false;
        record.updated_at = Utc::now();
        self.record_repo.update(&record).await?;

        tracing::info!(clinic_id = %clinic_id, record_id = %record.id, "Medical record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::access::Actor;
    use crate::application::commands::{CreateAppointment, UpdateAppointmentStatus};
    use crate::application::queries::GetAppointment;
    use crate::domain::ClinicRole;
    use crate::test_support::TestApp;
    use chrono::NaiveDate;

    fn record_cmd(actor: Actor, patient_id: Uuid) -> CreateMedicalRecord {
        CreateMedicalRecord {
            actor,
            patient_id,
            appointment_id: None,
            visit_date: None,
            chief_complaint: "Limping on front left leg".to_string(),
            diagnosis: None,
            treatment: None,
            prescriptions: None,
            weight_kg: Some(21.5),
            temperature_c: Some(38.6),
            notes: None,
        }
    }

    #[test]
    fn test_temperature_range() {
        assert!(validate_temperature(Some(38.5)).is_ok());
        assert!(validate_temperature(Some(25.0)).is_ok());
        assert!(validate_temperature(Some(45.1)).is_err());
        assert!(validate_temperature(None).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_completes_in_progress_appointment() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let actor = Actor::new(owner.id, app.clinic(owner.id).await);
        let patient = app.patient(actor, "Rex").await;

        let appointment = app
            .state
            .create_appointment_handler
            .handle(CreateAppointment {
                actor,
                patient_id: patient.id,
                veterinarian_id: owner.id,
                date: NaiveDate::from_ymd_opt(2030, 1, 10).unwrap(),
                start_time: "09:00".to_string(),
                duration_minutes: 30,
                reason: None,
                notes: None,
            })
            .await
            .unwrap();
        app.state
            .update_appointment_status_handler
            .handle(UpdateAppointmentStatus {
                actor,
                appointment_id: appointment.id,
                status: AppointmentStatus::InProgress,
            })
            .await
            .unwrap();

        let mut cmd = record_cmd(actor, patient.id);
        cmd.appointment_id = Some(appointment.id);
        let record = app
            .state
            .create_medical_record_handler
            .handle(cmd)
            .await
            .unwrap();
        assert_eq!(record.veterinarian_id, owner.id);

        let appointment = app
            .state
            .get_appointment_handler
            .handle(GetAppointment {
                actor,
                appointment_id: appointment.id,
            })
            .await
            .unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn test_appointment_of_other_patient_is_rejected() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let actor = Actor::new(owner.id, app.clinic(owner.id).await);
        let rex = app.patient(actor, "Rex").await;
        let luna = app.patient(actor, "Luna").await;

        let appointment = app
            .state
            .create_appointment_handler
            .handle(CreateAppointment {
                actor,
                patient_id: rex.id,
                veterinarian_id: owner.id,
                date: NaiveDate::from_ymd_opt(2030, 1, 10).unwrap(),
                start_time: "09:00".to_string(),
                duration_minutes: 30,
                reason: None,
                notes: None,
            })
            .await
            .unwrap();

        let mut cmd = record_cmd(actor, luna.id);
        cmd.appointment_id = Some(appointment.id);
        let err = app
            .state
            .create_medical_record_handler
            .handle(cmd)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_staff_cannot_write_medical_records() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let staff = app.user("staff@example.com").await;
        let clinic_id = app.clinic(owner.id).await;
        app.member(clinic_id, owner.id, "staff@example.com", ClinicRole::Staff)
            .await;
        let patient = app.patient(Actor::new(owner.id, clinic_id), "Rex").await;

        let err = app
            .state
            .create_medical_record_handler
            .handle(record_cmd(Actor::new(staff.id, clinic_id), patient.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Forbidden(_)));
    }
}
