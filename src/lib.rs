//! SCIM 2.0 provisioning bridge for OpenFGA.
//!
//! Identity providers push user and group changes over SCIM 2.0; this
//! service persists canonical records in PostgreSQL and mirrors group
//! membership facts into an OpenFGA store as `(user, member, group)` tuples,
//! so downstream services can answer "is user X a member of group Y".
//!
//! The two stores are kept in lockstep by the provisioning engine
//! ([`services::ProvisioningService`]): for every (user, group) pair, a
//! membership row exists in the relational store iff the corresponding tuple
//! exists in the authorization store, up to the documented partial-failure
//! windows.

pub mod auth;
pub mod config;
pub mod db;
pub mod fga;
pub mod routes;
pub mod scim;
pub mod services;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use config::Config;

/// Shared application state for the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repo: db::Repository,
    pub services: services::Services,
}

impl AppState {
    /// Connect the stores and assemble services from configuration.
    pub async fn from_config(config: Config) -> Result<Self, db::DbError> {
        let repo = db::Repository::connect(&config.database.url, config.database.max_connections)
            .await?;

        let fga = Arc::new(fga::OpenFgaClient::new(
            config.fga.api_url.clone(),
            config.fga.store_id.clone(),
        ));

        let services = services::Services::new(repo.clone(), fga, (&config.argon2).into());

        Ok(Self {
            config: Arc::new(config),
            repo,
            services,
        })
    }
}
