//! Patient Query Handlers

use std::sync::Arc;

use crate::application::access::AccessPolicy;
use crate::application::error::ApplicationError;
use crate::application::ports::{Page, PatientRecord, PatientRepositoryPort};
use crate::application::queries::{GetPatient, ListPatients};
use crate::domain::Permission;

/// GetPatient Handler
pub struct GetPatientHandler {
    policy: AccessPolicy,
    patient_repo: Arc<dyn PatientRepositoryPort>,
}

impl GetPatientHandler {
    pub fn new(policy: AccessPolicy, patient_repo: Arc<dyn PatientRepositoryPort>) -> Self {
        Self {
            policy,
            patient_repo,
        }
    }

    pub async fn handle(&self, query: GetPatient) -> Result<PatientRecord, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        self.patient_repo
            .find(query.actor.clinic_id, query.patient_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Patient", query.patient_id))
    }
}

/// ListPatients Handler
pub struct ListPatientsHandler {
    policy: AccessPolicy,
    patient_repo: Arc<dyn PatientRepositoryPort>,
}

impl ListPatientsHandler {
    pub fn new(policy: AccessPolicy, patient_repo: Arc<dyn PatientRepositoryPort>) -> Self {
        Self {
            policy,
            patient_repo,
        }
    }

    pub async fn handle(&self, query: ListPatients) -> Result<Page<PatientRecord>, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        Ok(self
            .patient_repo
            .list(query.actor.clinic_id, &query.filter, query.page)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::access::Actor;
    use crate::application::ports::{PageRequest, PatientFilter};
    use crate::domain::patient::Species;
    use crate::test_support::{create_patient_cmd, TestApp};

    #[tokio::test]
    async fn test_list_patients_search_species_and_paging() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let actor = Actor::new(owner.id, app.clinic(owner.id).await);

        for name in ["Rex", "Luna", "Max"] {
            app.patient(actor, name).await;
        }
        let mut cat = create_patient_cmd(actor, "Misha");
        cat.species = Species::Cat;
        cat.owner_name = "Rexford Brown".to_string();
        app.state.create_patient_handler.handle(cat).await.unwrap();

        let page = app
            .state
            .list_patients_handler
            .handle(ListPatients {
                actor,
                filter: PatientFilter {
                    search: Some("rex".to_string()),
                    species: None,
                },
                page: PageRequest::default(),
            })
            .await
            .unwrap();
        // 名字或主人名匹配
        assert_eq!(page.total, 2);

        let page = app
            .state
            .list_patients_handler
            .handle(ListPatients {
                actor,
                filter: PatientFilter {
                    search: None,
                    species: Some(Species::Cat),
                },
                page: PageRequest::default(),
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Misha");

        let page = app
            .state
            .list_patients_handler
            .handle(ListPatients {
                actor,
                filter: PatientFilter::default(),
                page: PageRequest::new(Some(2), Some(3)),
            })
            .await
            .unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages(), 2);
    }
}
