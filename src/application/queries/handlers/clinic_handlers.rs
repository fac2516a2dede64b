//! Clinic Query Handlers

use std::sync::Arc;

use crate::application::access::AccessPolicy;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ClinicAccessRepositoryPort, ClinicMember, ClinicMembership, ClinicRepositoryPort,
};
use crate::application::queries::{GetClinic, ListClinicMembers, ListMyClinics};
use crate::domain::Permission;

/// GetClinic Handler（附带调用者的角色）
pub struct GetClinicHandler {
    policy: AccessPolicy,
    clinic_repo: Arc<dyn ClinicRepositoryPort>,
}

impl GetClinicHandler {
    pub fn new(policy: AccessPolicy, clinic_repo: Arc<dyn ClinicRepositoryPort>) -> Self {
        Self {
            policy,
            clinic_repo,
        }
    }

    pub async fn handle(&self, query: GetClinic) -> Result<ClinicMembership, ApplicationError> {
        let role = self
            .policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        let clinic = self
            .clinic_repo
            .find_active(query.actor.clinic_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Clinic", query.actor.clinic_id))?;

        Ok(ClinicMembership { clinic, role })
    }
}

/// ListMyClinics Handler
pub struct ListMyClinicsHandler {
    clinic_repo: Arc<dyn ClinicRepositoryPort>,
}

impl ListMyClinicsHandler {
    pub fn new(clinic_repo: Arc<dyn ClinicRepositoryPort>) -> Self {
        Self { clinic_repo }
    }

    pub async fn handle(
        &self,
        query: ListMyClinics,
    ) -> Result<Vec<ClinicMembership>, ApplicationError> {
        Ok(self.clinic_repo.list_for_user(query.user_id).await?)
    }
}

/// ListClinicMembers Handler
pub struct ListClinicMembersHandler {
    policy: AccessPolicy,
    access_repo: Arc<dyn ClinicAccessRepositoryPort>,
}

impl ListClinicMembersHandler {
    pub fn new(policy: AccessPolicy, access_repo: Arc<dyn ClinicAccessRepositoryPort>) -> Self {
        Self {
            policy,
            access_repo,
        }
    }

    pub async fn handle(
        &self,
        query: ListClinicMembers,
    ) -> Result<Vec<ClinicMember>, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        Ok(self.access_repo.list_members(query.actor.clinic_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::access::Actor;
    use crate::domain::ClinicRole;
    use crate::test_support::TestApp;

    #[tokio::test]
    async fn test_list_my_clinics_returns_role_per_clinic() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let vet = app.user("vet@example.com").await;
        let own_clinic = app.clinic(owner.id).await;
        app.clinic(vet.id).await;
        app.member(own_clinic, owner.id, "vet@example.com", ClinicRole::Veterinarian)
            .await;

        let clinics = app
            .state
            .list_my_clinics_handler
            .handle(ListMyClinics { user_id: vet.id })
            .await
            .unwrap();
        assert_eq!(clinics.len(), 2);
        let joined = clinics.iter().find(|m| m.clinic.id == own_clinic).unwrap();
        assert_eq!(joined.role, ClinicRole::Veterinarian);
    }

    #[tokio::test]
    async fn test_outsider_cannot_view_clinic() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let outsider = app.user("outsider@example.com").await;
        let clinic_id = app.clinic(owner.id).await;

        let err = app
            .state
            .get_clinic_handler
            .handle(GetClinic {
                actor: Actor::new(outsider.id, clinic_id),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Forbidden(_)));

        let members = app
            .state
            .list_clinic_members_handler
            .handle(ListClinicMembers {
                actor: Actor::new(owner.id, clinic_id),
            })
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, ClinicRole::Owner);
    }
}
