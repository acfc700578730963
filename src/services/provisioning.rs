//! User and group provisioning engine.
//!
//! Orchestrates the dual write between the relational store and the
//! authorization store. Every membership mutation touches both; the two must
//! agree that a membership row exists iff the matching tuple exists.
//!
//! Write ordering is part of the contract:
//!
//! - Membership mutations (add / remove / replace, group deletion) write the
//!   authorization store FIRST, then the relational store inside one
//!   transaction. If the relational half fails after the authorization half
//!   succeeded, the transaction rolls back and the store is left with tuples
//!   that have no backing row. That residual skew is accepted and logged; it
//!   is never silently repaired here.
//! - User deletion runs the other way: delete and COMMIT the relational row
//!   first, then purge the user's tuples. A failure between the two leaves
//!   orphaned tuples for a nonexistent user, again logged and surfaced.
//!
//! Concurrent requests mutating the same group are not serialized beyond the
//! relational transaction; two interleaved replaces can produce a final tuple
//! set matching neither caller's intent.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::ApiKeyError,
    db::{DbError, Group, GroupMember, Repository, User, UserParams},
    fga::{Authorizer, FgaError},
    scim::{
        Filter, GroupPatchAction, GroupPatchRequest, PatchError, ScimError, UserPatchRequest,
        UserPayload, types::Page,
    },
};

/// Provisioning failure taxonomy.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Malformed payload, filter, or patch operation. Client error, never
    /// retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unique-constraint violation (duplicate userName).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Lookup by identifier yielded no row.
    #[error("resource not found")]
    NotFound,

    /// PATCH operation failed to parse into a supported shape.
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// Relational store failure.
    #[error(transparent)]
    Db(DbError),

    /// Authorization store failure.
    #[error(transparent)]
    Fga(#[from] FgaError),

    /// Stored credential could not be processed.
    #[error(transparent)]
    ApiKey(#[from] ApiKeyError),
}

impl From<DbError> for ProvisioningError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound => ProvisioningError::NotFound,
            DbError::Conflict(detail) => ProvisioningError::Conflict(detail),
            other => ProvisioningError::Db(other),
        }
    }
}

impl From<ProvisioningError> for ScimError {
    fn from(e: ProvisioningError) -> Self {
        match e {
            ProvisioningError::Validation(detail) => ScimError::invalid_value(detail),
            ProvisioningError::Conflict(detail) => ScimError::uniqueness(detail),
            ProvisioningError::NotFound => ScimError::not_found("resource not found"),
            ProvisioningError::Patch(PatchError::InvalidPath(path)) => {
                ScimError::invalid_path(format!("invalid path: {path}"))
            }
            ProvisioningError::Patch(patch_err) => ScimError::invalid_value(patch_err.to_string()),
            ProvisioningError::Db(db_err) => {
                ScimError::internal(format!("database error: {db_err}"))
            }
            ProvisioningError::Fga(fga_err) => {
                ScimError::internal(format!("authorization store error: {fga_err}"))
            }
            ProvisioningError::ApiKey(key_err) => {
                ScimError::internal(format!("credential error: {key_err}"))
            }
        }
    }
}

pub type ProvisioningResult<T> = Result<T, ProvisioningError>;

/// The provisioning engine.
#[derive(Clone)]
pub struct ProvisioningService {
    repo: Repository,
    fga: Arc<dyn Authorizer>,
}

impl ProvisioningService {
    pub fn new(repo: Repository, fga: Arc<dyn Authorizer>) -> Self {
        Self { repo, fga }
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Create a user from a SCIM payload.
    pub async fn create_user(&self, payload: &UserPayload) -> ProvisioningResult<User> {
        if payload.user_name.is_empty() {
            return Err(ProvisioningError::Validation(
                "attribute 'userName' is required".to_string(),
            ));
        }

        let mut tx = self.repo.begin().await?;
        let user = tx.create_user(UserParams::from(payload)).await?;
        tx.commit().await?;

        Ok(user)
    }

    /// Look up a user by identifier.
    pub async fn find_user(&self, id: Uuid) -> ProvisioningResult<User> {
        Ok(self.repo.find_user(id).await?)
    }

    /// Replace a user's attributes (SCIM PUT).
    pub async fn update_user(&self, id: Uuid, payload: &UserPayload) -> ProvisioningResult<User> {
        Ok(self.repo.update_user(id, UserParams::from(payload)).await?)
    }

    /// Apply a SCIM user PATCH. Only `replace` of the `active` flag is
    /// supported; any other verb fails the request.
    pub async fn patch_user(
        &self,
        id: Uuid,
        request: &UserPatchRequest,
    ) -> ProvisioningResult<User> {
        for op in &request.operations {
            match op.op.as_str() {
                "replace" => self.repo.patch_user_active(id, op.value.active).await?,
                other => {
                    return Err(ProvisioningError::Validation(format!(
                        "unsupported operation: {other}"
                    )));
                }
            }
        }

        Ok(self.repo.find_user(id).await?)
    }

    /// Delete a user and purge their authorization tuples.
    ///
    /// The relational delete commits before the tuple cleanup starts; a
    /// failure in between leaves orphaned tuples behind.
    pub async fn delete_user(&self, id: Uuid) -> ProvisioningResult<()> {
        let mut tx = self.repo.begin().await?;
        tx.delete_user(id).await?;
        tx.commit().await?;

        if let Err(e) = self.fga.remove_user(id).await {
            warn!(
                user_id = %id,
                error = %e,
                "user row deleted but tuple cleanup failed; orphaned tuples remain"
            );
            return Err(e.into());
        }

        Ok(())
    }

    /// List users, honoring an optional `userName eq` filter.
    pub async fn get_users(
        &self,
        filters: &[Filter],
        page: &Page,
    ) -> ProvisioningResult<(i64, Vec<User>)> {
        Ok(self.repo.get_scim_users(filters, page).await?)
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Create an empty group.
    pub async fn create_group(&self, display_name: &str) -> ProvisioningResult<Group> {
        Ok(self.repo.create_group(display_name).await?)
    }

    /// Look up a group by identifier.
    pub async fn find_group(&self, id: Uuid) -> ProvisioningResult<Group> {
        Ok(self.repo.find_group(id).await?)
    }

    /// List groups.
    pub async fn get_groups(&self, page: &Page) -> ProvisioningResult<(i64, Vec<Group>)> {
        Ok(self.repo.get_groups(page).await?)
    }

    /// Read a group's membership projection.
    pub async fn get_group_membership(
        &self,
        group_id: Uuid,
    ) -> ProvisioningResult<Vec<GroupMember>> {
        Ok(self.repo.get_group_membership(group_id).await?)
    }

    /// Apply a SCIM group PATCH: the dual-write state machine.
    ///
    /// Operations run strictly in request order inside one relational
    /// transaction. The first failure stops processing, rolls the relational
    /// changes back, and propagates; authorization-store writes already made
    /// for earlier operations are not undone.
    pub async fn patch_group(
        &self,
        group_id: Uuid,
        request: &GroupPatchRequest,
    ) -> ProvisioningResult<Group> {
        let mut tx = self.repo.begin().await?;

        for op in &request.operations {
            match op.action()? {
                GroupPatchAction::AddMembers(members) => {
                    self.fga.add_users_to_group(&members, group_id).await?;
                    if let Err(e) = tx.add_users_to_group(group_id, &members).await {
                        warn!(
                            %group_id,
                            error = %e,
                            "membership tuples written but relational add failed; dangling tuples remain"
                        );
                        return Err(e.into());
                    }
                }
                GroupPatchAction::RemoveMember(user_id) => {
                    self.fga.remove_user_from_group(user_id, group_id).await?;
                    if let Err(e) = tx.remove_user_from_group(user_id, group_id).await {
                        warn!(
                            %group_id,
                            %user_id,
                            error = %e,
                            "membership tuple removed but relational delete failed"
                        );
                        return Err(e.into());
                    }
                }
                GroupPatchAction::ReplaceMembers(members) => {
                    self.fga.replace_users_in_group(&members, group_id).await?;
                    if let Err(e) = tx.replace_users_in_group(group_id, &members).await {
                        warn!(
                            %group_id,
                            error = %e,
                            "membership tuples replaced but relational replace failed; stores disagree"
                        );
                        return Err(e.into());
                    }
                }
                GroupPatchAction::ReplaceDisplayName(display_name) => {
                    tx.patch_group_display_name(group_id, &display_name).await?;
                }
            }
        }

        tx.commit().await?;

        Ok(self.repo.find_group(group_id).await?)
    }

    /// Delete a group: purge its member tuples, then the relational row.
    pub async fn delete_group(&self, group_id: Uuid) -> ProvisioningResult<()> {
        self.fga.remove_all_users_in_group(group_id).await?;

        let mut tx = self.repo.begin().await?;
        if let Err(e) = tx.delete_group(group_id).await {
            warn!(
                %group_id,
                error = %e,
                "member tuples purged but relational group delete failed"
            );
            return Err(e.into());
        }
        tx.commit().await?;

        Ok(())
    }
}

impl From<&UserPayload> for UserParams {
    fn from(payload: &UserPayload) -> Self {
        UserParams {
            username: payload.user_name.clone(),
            external_id: payload.external_id.clone(),
            name: payload.name.clone(),
            display_name: payload.display_name.clone(),
            locale: payload.locale.clone(),
            active: payload.active,
            emails: payload.emails.clone(),
        }
    }
}
