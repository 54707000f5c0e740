//! Business logic services

pub mod catalog;
pub mod loans;
pub mod rules;
pub mod users;

use crate::config::{AuthConfig, LoyaltyConfig};
use crate::repository::Repository;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub loans: loans::LoansService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig, loyalty_config: LoyaltyConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), auth_config),
            loans: loans::LoansService::new(repository, loyalty_config),
        }
    }
}
