//! User account service

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, Entity},
    models::user::{UpdateUser, UserChanges, UserSummary},
    repository::UserStore,
};

use super::auth::hash_password;

#[derive(Clone)]
pub struct UsersService {
    users: Arc<dyn UserStore>,
}

impl UsersService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn list(&self) -> AppResult<Vec<UserSummary>> {
        self.users.list().await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<UserSummary> {
        self.users
            .get(id)
            .await?
            .map(UserSummary::from)
            .ok_or(AppError::NotFound(Entity::User))
    }

    /// Update the acting user's own account
    pub async fn update(&self, actor: &UserSummary, id: Uuid, update: UpdateUser) -> AppResult<UserSummary> {
        require_self(actor, id)?;

        let changes = UserChanges {
            name: update.name,
            email: update.email,
            password_hash: update.password.as_deref().map(hash_password).transpose()?,
        };

        let user = self.users.update(id, &changes).await?;
        Ok(user.into())
    }

    /// Delete the acting user's own account
    pub async fn delete(&self, actor: &UserSummary, id: Uuid) -> AppResult<UserSummary> {
        require_self(actor, id)?;

        let user = self.users.delete(id).await?;
        tracing::info!(user_id = %id, "User deleted");
        Ok(user.into())
    }
}

fn require_self(actor: &UserSummary, id: Uuid) -> AppResult<()> {
    if actor.id != id {
        return Err(AppError::Forbidden(
            "You can only modify your own account".to_string(),
        ));
    }
    Ok(())
}
