//! Patient Queries

use uuid::Uuid;

use crate::application::access::Actor;
use crate::application::ports::{PageRequest, PatientFilter};

#[derive(Debug, Clone)]
pub struct GetPatient {
    pub actor: Actor,
    pub patient_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct ListPatients {
    pub actor: Actor,
    pub filter: PatientFilter,
    pub page: PageRequest,
}
