//! SCIM credential verification and rotation.

use crate::{
    auth::{Generator, compare_argon2_hash},
    db::{ApiKey, Repository},
};

use super::provisioning::ProvisioningResult;

/// Manages the single SCIM API credential.
#[derive(Clone)]
pub struct CredentialService {
    repo: Repository,
    generator: Generator,
}

impl CredentialService {
    pub fn new(repo: Repository, generator: Generator) -> Self {
        Self { repo, generator }
    }

    /// Verify a presented bearer token against the stored SCIM credential.
    ///
    /// "No credential configured" is an authentication failure, not a server
    /// error; so is a token that does not match. Only a malformed stored
    /// hash is surfaced as an error.
    pub async fn verify_token(&self, token: &str) -> ProvisioningResult<bool> {
        let Some(api_key) = self.repo.find_scim_api_key().await? else {
            return Ok(false);
        };

        Ok(compare_argon2_hash(token, &api_key.encoded_hash)?)
    }

    /// Rotate the SCIM credential: generate a new key and swap it in with
    /// delete-before-insert inside one transaction, keeping at most one
    /// active credential at any time.
    ///
    /// Returns the stored key row and the plaintext token. The plaintext is
    /// shown exactly once and never persisted.
    pub async fn rotate(&self) -> ProvisioningResult<(ApiKey, String)> {
        let (encoded_hash, plaintext) = self.generator.generate()?;

        let mut tx = self.repo.begin().await?;
        tx.delete_scim_api_key().await?;
        let api_key = tx.insert_scim_api_key(encoded_hash).await?;
        tx.commit().await?;

        Ok((api_key, plaintext))
    }
}
