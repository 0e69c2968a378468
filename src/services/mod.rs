//! Business logic services

pub mod auth;
pub mod borrows;
pub mod catalog;
pub mod users;

use std::sync::Arc;

use mockable::Clock;

use crate::{config::AuthConfig, repository::Repository};

/// Time source injected into services that stamp records
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub borrows: borrows::BorrowLedger,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig, clock: SharedClock) -> Self {
        Self {
            auth: auth::AuthService::new(repository.users.clone(), auth_config),
            users: users::UsersService::new(repository.users.clone()),
            catalog: catalog::CatalogService::new(repository.books.clone()),
            borrows: borrows::BorrowLedger::new(&repository, clock),
            repository,
        }
    }

    /// Check that the entity store is reachable
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.repository.ping().await
    }
}
