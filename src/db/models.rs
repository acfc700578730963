//! Relational store records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::scim::ScimEmail;

/// A provisioned user account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub external_id: Option<String>,
    /// Structured name components as pushed by the IdP, stored opaquely.
    pub name: Option<HashMap<String, String>>,
    pub display_name: Option<String>,
    pub locale: Option<String>,
    pub active: bool,
    pub emails: Vec<ScimEmail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attributes for creating or replacing a user.
#[derive(Debug, Clone)]
pub struct UserParams {
    pub username: String,
    pub external_id: Option<String>,
    pub name: Option<HashMap<String, String>>,
    pub display_name: Option<String>,
    pub locale: Option<String>,
    pub active: bool,
    pub emails: Vec<ScimEmail>,
}

/// A provisioned group.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of a group's membership projection.
///
/// Derived from the user/group many-to-many relation; never mutated
/// directly, only through membership patch operations.
#[derive(Debug, Clone)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub user_id: Uuid,
    /// Denormalized for display in SCIM group resources.
    pub username: Option<String>,
}

/// A stored API key. Only the Argon2id encoded hash is persisted; the
/// plaintext key is shown once at generation time.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: Uuid,
    pub encoded_hash: String,
    pub owner: String,
    pub system: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attributes for inserting an API key.
#[derive(Debug, Clone)]
pub struct InsertApiKeyParams {
    pub encoded_hash: String,
    pub owner: String,
    pub system: bool,
    pub description: Option<String>,
}
