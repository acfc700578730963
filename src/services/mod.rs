mod credentials;
mod provisioning;

use std::sync::Arc;

pub use credentials::CredentialService;
pub use provisioning::{ProvisioningError, ProvisioningResult, ProvisioningService};

use crate::{auth::Generator, db::Repository, fga::Authorizer};

/// Container for all services.
#[derive(Clone)]
pub struct Services {
    pub provisioning: ProvisioningService,
    pub credentials: CredentialService,
}

impl Services {
    pub fn new(repo: Repository, fga: Arc<dyn Authorizer>, generator: Generator) -> Self {
        Self {
            provisioning: ProvisioningService::new(repo.clone(), fga),
            credentials: CredentialService::new(repo, generator),
        }
    }
}
