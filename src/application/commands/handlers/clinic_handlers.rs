//! Clinic / Member Command Handlers

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::access::AccessPolicy;
use crate::application::commands::{
    AddClinicMember, CreateClinic, DeactivateClinic, RemoveMember, UpdateClinic, UpdateMemberRole,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ClinicAccessRecord, ClinicAccessRepositoryPort, ClinicMember, ClinicMembership, ClinicRecord,
    ClinicRepositoryPort, UserRecord, UserRepositoryPort,
};
use crate::domain::validation::{optional_email, optional_text, required_text};
use crate::domain::{ClinicRole, Email, Permission};

fn member_view(user: &UserRecord, access: &ClinicAccessRecord) -> ClinicMember {
    ClinicMember {
        user_id: user.id,
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        role: access.role,
        joined_at: access.created_at,
    }
}

// ============================================================================
// CreateClinic
// ============================================================================

pub struct CreateClinicHandler {
    clinic_repo: Arc<dyn ClinicRepositoryPort>,
}

impl CreateClinicHandler {
    pub fn new(clinic_repo: Arc<dyn ClinicRepositoryPort>) -> Self {
        Self { clinic_repo }
    }

    pub async fn handle(&self, cmd: CreateClinic) -> Result<ClinicMembership, ApplicationError> {
        let now = Utc::now();
        let clinic = ClinicRecord {
            id: Uuid::new_v4(),
            name: required_text("name", &cmd.name, 120)?,
            address: optional_text("address", cmd.address.as_deref(), 255)?,
            phone: optional_text("phone", cmd.phone.as_deref(), 40)?,
            email: optional_email(cmd.email.as_deref())?.map(Email::into_string),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let owner_access = ClinicAccessRecord {
            id: Uuid::new_v4(),
            user_id: cmd.owner_id,
            clinic_id: clinic.id,
            role: ClinicRole::Owner,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.clinic_repo
            .create_with_owner(&clinic, &owner_access)
            .await?;

        tracing::info!(
            clinic_id = %clinic.id,
            owner_id = %cmd.owner_id,
            name = %clinic.name,
            "Clinic created"
        );

        Ok(ClinicMembership {
            clinic,
            role: ClinicRole::Owner,
        })
    }
}

// ============================================================================
// UpdateClinic
// ============================================================================

pub struct UpdateClinicHandler {
    policy: AccessPolicy,
    clinic_repo: Arc<dyn ClinicRepositoryPort>,
}

impl UpdateClinicHandler {
    pub fn new(policy: AccessPolicy, clinic_repo: Arc<dyn ClinicRepositoryPort>) -> Self {
        Self {
            policy,
            clinic_repo,
        }
    }

    pub async fn handle(&self, cmd: UpdateClinic) -> Result<ClinicRecord, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::ManageClinic)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut clinic = self
            .clinic_repo
            .find_active(clinic_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Clinic", clinic_id))?;

        if let Some(name) = cmd.name.as_deref() {
            clinic.name = required_text("name", name, 120)?;
        }
        if let Some(address) = cmd.address.as_deref() {
            clinic.address = optional_text("address", Some(address), 255)?;
        }
        if let Some(phone) = cmd.phone.as_deref() {
            clinic.phone = optional_text("phone", Some(phone), 40)?;
        }
        if let Some(email) = cmd.email.as_deref() {
            clinic.email = optional_email(Some(email))?.map(Email::into_string);
        }
        clinic.updated_at = Utc::now();

        self.clinic_repo.update(&clinic).await?;

        tracing::info!(clinic_id = %clinic.id, user_id = %cmd.actor.user_id, "Clinic updated");
        Ok(clinic)
    }
}

// ============================================================================
// DeactivateClinic
// ============================================================================

pub struct DeactivateClinicHandler {
    policy: AccessPolicy,
    clinic_repo: Arc<dyn ClinicRepositoryPort>,
}

impl DeactivateClinicHandler {
    pub fn new(policy: AccessPolicy, clinic_repo: Arc<dyn ClinicRepositoryPort>) -> Self {
        Self {
            policy,
            clinic_repo,
        }
    }

    pub async fn handle(&self, cmd: DeactivateClinic) -> Result<(), ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::ManageClinic)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut clinic = self
            .clinic_repo
            .find_active(clinic_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Clinic", clinic_id))?;

        clinic.is_active = false;
        clinic.updated_at = Utc::now();
        self.clinic_repo.update(&clinic).await?;

        tracing::info!(clinic_id = %clinic_id, user_id = %cmd.actor.user_id, "Clinic deactivated");
        Ok(())
    }
}

// ============================================================================
// AddClinicMember
// ============================================================================

pub struct AddClinicMemberHandler {
    policy: AccessPolicy,
    access_repo: Arc<dyn ClinicAccessRepositoryPort>,
    user_repo: Arc<dyn UserRepositoryPort>,
}

impl AddClinicMemberHandler {
    pub fn new(
        policy: AccessPolicy,
        access_repo: Arc<dyn ClinicAccessRepositoryPort>,
        user_repo: Arc<dyn UserRepositoryPort>,
    ) -> Self {
        Self {
            policy,
            access_repo,
            user_repo,
        }
    }

    pub async fn handle(&self, cmd: AddClinicMember) -> Result<ClinicMember, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::ManageMembers)
            .await?;

        let email = Email::parse(&cmd.email)?;
        let user = self
            .user_repo
            .find_by_email(email.as_str())
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| {
                ApplicationError::validation(format!("email: no active user with email {}", email))
            })?;

        let clinic_id = cmd.actor.clinic_id;
        let now = Utc::now();
        let access = match self.access_repo.find(user.id, clinic_id).await? {
            Some(existing) if existing.is_active => {
                return Err(ApplicationError::conflict(
                    "User is already a member of this clinic",
                ));
            }
            // 曾被移除的成员：重新激活
            Some(mut existing) => {
                existing.role = cmd.role;
                existing.is_active = true;
                existing.updated_at = now;
                existing
            }
            None => ClinicAccessRecord {
                id: Uuid::new_v4(),
                user_id: user.id,
                clinic_id,
                role: cmd.role,
                is_active: true,
                created_at: now,
                updated_at: now,
            },
        };

        self.access_repo.save(&access).await?;

        tracing::info!(
            clinic_id = %clinic_id,
            member_id = %user.id,
            role = %access.role,
            "Clinic member added"
        );

        Ok(member_view(&user, &access))
    }
}

// ============================================================================
// UpdateMemberRole
// ============================================================================

pub struct UpdateMemberRoleHandler {
    policy: AccessPolicy,
    access_repo: Arc<dyn ClinicAccessRepositoryPort>,
    user_repo: Arc<dyn UserRepositoryPort>,
}

impl UpdateMemberRoleHandler {
    pub fn new(
        policy: AccessPolicy,
        access_repo: Arc<dyn ClinicAccessRepositoryPort>,
        user_repo: Arc<dyn UserRepositoryPort>,
    ) -> Self {
        Self {
            policy,
            access_repo,
            user_repo,
        }
    }

    pub async fn handle(&self, cmd: UpdateMemberRole) -> Result<ClinicMember, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::ManageMembers)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut access = self
            .access_repo
            .find(cmd.user_id, clinic_id)
            .await?
            .filter(|a| a.is_active)
            .ok_or_else(|| ApplicationError::not_found("ClinicMember", cmd.user_id))?;

        if access.role == ClinicRole::Owner
            && cmd.role != ClinicRole::Owner
            && self.access_repo.count_active_owners(clinic_id).await? <= 1
        {
            return Err(ApplicationError::business_rule(
                "The last owner of a clinic cannot be demoted",
            ));
        }

        let user = self
            .user_repo
            .find_by_id(cmd.user_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("User", cmd.user_id))?;

        access.role = cmd.role;
        access.updated_at = Utc::now();
        self.access_repo.save(&access).await?;

        tracing::info!(
            clinic_id = %clinic_id,
            member_id = %cmd.user_id,
            role = %cmd.role,
            "Clinic member role updated"
        );

        Ok(member_view(&user, &access))
    }
}

// ============================================================================
// RemoveMember
// ============================================================================

pub struct RemoveMemberHandler {
    policy: AccessPolicy,
    access_repo: Arc<dyn ClinicAccessRepositoryPort>,
}

impl RemoveMemberHandler {
    pub fn new(policy: AccessPolicy, access_repo: Arc<dyn ClinicAccessRepositoryPort>) -> Self {
        Self {
            policy,
            access_repo,
        }
    }

    pub async fn handle(&self, cmd: RemoveMember) -> Result<(), ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::ManageMembers)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut access = self
            .access_repo
            .find(cmd.user_id, clinic_id)
            .await?
            .filter(|a| a.is_active)
            .ok_or_else(|| ApplicationError::not_found("ClinicMember", cmd.user_id))?;

        if access.role == ClinicRole::Owner
            && self.access_repo.count_active_owners(clinic_id).await? <= 1
        {
            return Err(ApplicationError::business_rule(
                "The last owner of a clinic cannot be removed",
            ));
        }

        access.is_active = false;
        access.updated_at = Utc::now();
        self.access_repo.save(&access).await?;

        tracing::info!(clinic_id = %clinic_id, member_id = %cmd.user_id, "Clinic member removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::access::Actor;
    use crate::test_support::TestApp;

    #[tokio::test]
    async fn test_create_clinic_makes_creator_owner() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;

        let membership = app
            .state
            .create_clinic_handler
            .handle(CreateClinic {
                owner_id: owner.id,
                name: "  Happy Paws ".to_string(),
                address: None,
                phone: Some("".to_string()),
                email: Some("Front@HappyPaws.test".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(membership.role, ClinicRole::Owner);
        assert_eq!(membership.clinic.name, "Happy Paws");
        assert_eq!(membership.clinic.phone, None);
        assert_eq!(membership.clinic.email.as_deref(), Some("front@happypaws.test"));
    }

    #[tokio::test]
    async fn test_last_owner_cannot_be_demoted_or_removed() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let clinic_id = app.clinic(owner.id).await;
        let actor = Actor::new(owner.id, clinic_id);

        let err = app
            .state
            .update_member_role_handler
            .handle(UpdateMemberRole {
                actor,
                user_id: owner.id,
                role: ClinicRole::Staff,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::BusinessRuleViolation(_)));

        let err = app
            .state
            .remove_member_handler
            .handle(RemoveMember {
                actor,
                user_id: owner.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::BusinessRuleViolation(_)));

        // 有第二个 OWNER 之后可以降级
        let partner = app.user("partner@example.com").await;
        app.member(clinic_id, owner.id, "partner@example.com", ClinicRole::Owner)
            .await;
        let member = app
            .state
            .update_member_role_handler
            .handle(UpdateMemberRole {
                actor,
                user_id: partner.id,
                role: ClinicRole::Veterinarian,
            })
            .await
            .unwrap();
        assert_eq!(member.role, ClinicRole::Veterinarian);
    }

    #[tokio::test]
    async fn test_add_member_conflict_and_reactivation() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let staff = app.user("staff@example.com").await;
        let clinic_id = app.clinic(owner.id).await;
        let actor = Actor::new(owner.id, clinic_id);

        app.member(clinic_id, owner.id, "staff@example.com", ClinicRole::Staff)
            .await;

        let err = app
            .state
            .add_clinic_member_handler
            .handle(AddClinicMember {
                actor,
                email: "staff@example.com".to_string(),
                role: ClinicRole::Viewer,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Conflict(_)));

        app.state
            .remove_member_handler
            .handle(RemoveMember {
                actor,
                user_id: staff.id,
            })
            .await
            .unwrap();

        let member = app
            .state
            .add_clinic_member_handler
            .handle(AddClinicMember {
                actor,
                email: "staff@example.com".to_string(),
                role: ClinicRole::Viewer,
            })
            .await
            .unwrap();
        assert_eq!(member.role, ClinicRole::Viewer);
    }

    #[tokio::test]
    async fn test_staff_cannot_manage_members() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let staff = app.user("staff@example.com").await;
        app.user("other@example.com").await;
        let clinic_id = app.clinic(owner.id).await;
        app.member(clinic_id, owner.id, "staff@example.com", ClinicRole::Staff)
            .await;

        let err = app
            .state
            .add_clinic_member_handler
            .handle(AddClinicMember {
                actor: Actor::new(staff.id, clinic_id),
                email: "other@example.com".to_string(),
                role: ClinicRole::Viewer,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_deactivated_clinic_is_not_accessible() {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let clinic_id = app.clinic(owner.id).await;
        let actor = Actor::new(owner.id, clinic_id);

        app.state
            .deactivate_clinic_handler
            .handle(DeactivateClinic { actor })
            .await
            .unwrap();

        let err = app
            .state
            .update_clinic_handler
            .handle(UpdateClinic {
                actor,
                name: Some("Renamed".to_string()),
                address: None,
                phone: None,
                email: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Forbidden(_)));
    }
}
