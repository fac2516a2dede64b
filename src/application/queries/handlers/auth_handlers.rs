//! Auth Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{UserRecord, UserRepositoryPort};
use crate::application::queries::GetMe;

/// GetMe Handler
pub struct GetMeHandler {
    user_repo: Arc<dyn UserRepositoryPort>,
}

impl GetMeHandler {
    pub fn new(user_repo: Arc<dyn UserRepositoryPort>) -> Self {
        Self { user_repo }
    }

    pub async fn handle(&self, query: GetMe) -> Result<UserRecord, ApplicationError> {
        match self.user_repo.find_by_id(query.user_id).await? {
            Some(user) if user.is_active => Ok(user),
            Some(_) => Err(ApplicationError::unauthorized("Account is disabled")),
            None => Err(ApplicationError::not_found("User", query.user_id)),
        }
    }
}
