//! Patient Command Handlers

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::access::AccessPolicy;
use crate::application::commands::{CreatePatient, DeletePatient, UpdatePatient};
use crate::application::error::ApplicationError;
use crate::application::ports::{PatientRecord, PatientRepositoryPort};
use crate::domain::patient::{normalize_microchip, validate_birth_date};
use crate::domain::validation::{optional_email, optional_text, positive_measure, required_text};
use crate::domain::{Email, Permission};

const NAME_MAX: usize = 120;
const NOTES_MAX: usize = 2000;

async fn ensure_microchip_free(
    repo: &dyn PatientRepositoryPort,
    clinic_id: Uuid,
    microchip_id: Option<&str>,
    exclude: Option<Uuid>,
) -> Result<(), ApplicationError> {
    if let Some(chip) = microchip_id {
        if repo.microchip_taken(clinic_id, chip, exclude).await? {
            return Err(ApplicationError::conflict(format!(
                "Microchip {} is already registered in this clinic",
                chip
            )));
        }
    }
    Ok(())
}

// ============================================================================
// CreatePatient
// ============================================================================

pub struct CreatePatientHandler {
    policy: AccessPolicy,
    patient_repo: Arc<dyn PatientRepositoryPort>,
}

impl CreatePatientHandler {
    pub fn new(policy: AccessPolicy, patient_repo: Arc<dyn PatientRepositoryPort>) -> Self {
        Self {
            policy,
            patient_repo,
        }
    }

    pub async fn handle(&self, cmd: CreatePatient) -> Result<PatientRecord, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WritePatients)
            .await?;

        let now = Utc::now();
        let clinic_id = cmd.actor.clinic_id;
        let patient = PatientRecord {
            id: Uuid::new_v4(),
            clinic_id,
            name: required_text("name", &cmd.name, NAME_MAX)?,
            species: cmd.species,
            breed: optional_text("breed", cmd.breed.as_deref(), NAME_MAX)?,
            sex: cmd.sex.unwrap_or_default(),
            birth_date: validate_birth_date(cmd.birth_date, now.date_naive())?,
            weight_kg: positive_measure("weight_kg", cmd.weight_kg)?,
            microchip_id: normalize_microchip(cmd.microchip_id.as_deref())?,
            color: optional_text("color", cmd.color.as_deref(), NAME_MAX)?,
            owner_name: required_text("owner_name", &cmd.owner_name, NAME_MAX)?,
            owner_phone: optional_text("owner_phone", cmd.owner_phone.as_deref(), 40)?,
            owner_email: optional_email(cmd.owner_email.as_deref())?.map(Email::into_string),
            notes: optional_text("notes", cmd.notes.as_deref(), NOTES_MAX)?,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        ensure_microchip_free(
            self.patient_repo.as_ref(),
            clinic_id,
            patient.microchip_id.as_deref(),
            None,
        )
        .await?;

        self.patient_repo.insert(&patient).await?;

        tracing::info!(
            clinic_id = %clinic_id,
            patient_id = %patient.id,
            species = %patient.species,
            "Patient created"
        );

        Ok(patient)
    }
}

// ============================================================================
// UpdatePatient
// ============================================================================

pub struct UpdatePatientHandler {
    policy: AccessPolicy,
    patient_repo: Arc<dyn PatientRepositoryPort>,
}

impl UpdatePatientHandler {
    pub fn new(policy: AccessPolicy, patient_repo: Arc<dyn PatientRepositoryPort>) -> Self {
        Self {
            policy,
            patient_repo,
        }
    }

    pub async fn handle(&self, cmd: UpdatePatient) -> Result<PatientRecord, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WritePatients)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut patient = self
            .patient_repo
            .find(clinic_id, cmd.patient_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Patient", cmd.patient_id))?;

        let now = Utc::now();

        if let Some(name) = cmd.name.as_deref() {
            patient.name = required_text("name", name, NAME_MAX)?;
        }
        if let Some(species) = cmd.species {
            patient.species = species;
        }
        if let Some(breed) = cmd.breed.as_deref() {
            patient.breed = optional_text("breed", Some(breed), NAME_MAX)?;
        }
        if let Some(sex) = cmd.sex {
            patient.sex = sex;
        }
        if cmd.birth_date.is_some() {
            patient.birth_date = validate_birth_date(cmd.birth_date, now.date_naive())?;
        }
        if cmd.weight_kg.is_some() {
            patient.weight_kg = positive_measure("weight_kg", cmd.weight_kg)?;
        }
        if let Some(chip) = cmd.microchip_id.as_deref() {
            let chip = normalize_microchip(Some(chip))?;
            ensure_microchip_free(
                self.patient_repo.as_ref(),
                clinic_id,
                chip.as_deref(),
                Some(patient.id),
            )
            .await?;
            patient.microchip_id = chip;
        }
        if let Some(color) = cmd.color.as_deref() {
            patient.color = optional_text("color", Some(color), NAME_MAX)?;
        }
        if let Some(owner_name) = cmd.owner_name.as_deref() {
            patient.owner_name = required_text("owner_name", owner_name, NAME_MAX)?;
        }
        if let Some(owner_phone) = cmd.owner_phone.as_deref() {
            patient.owner_phone = optional_text("owner_phone", Some(owner_phone), 40)?;
        }
        if let Some(owner_email) = cmd.owner_email.as_deref() {
            patient.owner_email = optional_email(Some(owner_email))?.map(Email::into_string);
        }
        if let Some(notes) = cmd.notes.as_deref() {
            patient.notes = optional_text("notes", Some(notes), NOTES_MAX)?;
        }
        patient.updated_at = now;

        self.patient_repo.update(&patient).await?;

        tracing::info!(clinic_id = %clinic_id, patient_id = %patient.id, "Patient updated");
        Ok(patient)
    }
}

// ============================================================================
// DeletePatient
// ============================================================================

pub struct DeletePatientHandler {
    policy: AccessPolicy,
    patient_repo: Arc<dyn PatientRepositoryPort>,
}

impl DeletePatientHandler {
    pub fn new(policy: AccessPolicy, patient_repo: Arc<dyn PatientRepositoryPort>) -> Self {
        Self {
            policy,
            patient_repo,
        }
    }

    pub async fn handle(&self, cmd: DeletePatient) -> Result<(), ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WritePatients)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut patient = self
            .patient_repo
            .find(clinic_id, cmd.patient_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Patient", cmd.patient_id))?;

        patient.is_active = false;
        patient.updated_at = Utc::now();
        self.patient_repo.update(&patient).await?;

        tracing::info!(clinic_id = %clinic_id, patient_id = %patient.id, "Patient deleted");
        Ok(())
    }
}
