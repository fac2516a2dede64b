//! Medical Record Queries

use uuid::Uuid;

use crate::application::access::Actor;
use crate::application::ports::{MedicalRecordFilter, PageRequest};

#[derive(Debug, Clone)]
pub struct GetMedicalRecord {
    pub actor: Actor,
    pub record_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct ListMedicalRecords {
    pub actor: Actor,
    pub filter: MedicalRecordFilter,
    pub page: PageRequest,
}
