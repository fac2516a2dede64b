//! Medical Record Query Handlers

use std::sync::Arc;

use crate::application::access::AccessPolicy;
use crate::application::error::ApplicationError;
use crate::application::ports::{MedicalRecordEntry, MedicalRecordRepositoryPort, Page};
use crate::application::queries::{GetMedicalRecord, ListMedicalRecords};
use crate::domain::Permission;

/// GetMedicalRecord Handler
pub struct GetMedicalRecordHandler {
    policy: AccessPolicy,
    record_repo: Arc<dyn MedicalRecordRepositoryPort>,
}

impl GetMedicalRecordHandler {
    pub fn new(policy: AccessPolicy, record_repo: Arc<dyn MedicalRecordRepositoryPort>) -> Self {
        Self {
            policy,
            record_repo,
        }
    }

    pub async fn handle(
        &self,
        query: GetMedicalRecord,
    ) -> Result<MedicalRecordEntry, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        self.record_repo
            .find(query.actor.clinic_id, query.record_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("MedicalRecord", query.record_id))
    }
}

/// ListMedicalRecords Handler
pub struct ListMedicalRecordsHandler {
    policy: AccessPolicy,
    record_repo: Arc<dyn MedicalRecordRepositoryPort>,
}

impl ListMedicalRecordsHandler {
    pub fn new(policy: AccessPolicy, record_repo: Arc<dyn MedicalRecordRepositoryPort>) -> Self {
        Self {
            policy,
            record_repo,
        }
    }

    pub async fn handle(
        &self,
        query: ListMedicalRecords,
    ) -> Result<Page<MedicalRecordEntry>, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        Ok(self
            .record_repo
            .list(query.actor.clinic_id, &query.filter, query.page)
            .await?)
    }
}
