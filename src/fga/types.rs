//! Wire types for the authorization store's read/write API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The relation this bridge writes for group membership.
pub const MEMBER_RELATION: &str = "member";

/// The object kind that group tuples live under.
pub const GROUP_OBJECT_KIND: &str = "group";

/// A (subject, relation, object) key.
///
/// Read queries may leave fields unset to match partially; write and delete
/// requests carry fully specified keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
}

impl TupleKey {
    /// Fully specified membership tuple for (user, group).
    pub fn membership(user_id: Uuid, group_id: Uuid) -> Self {
        Self {
            user: Some(user_id.to_string()),
            relation: Some(MEMBER_RELATION.to_string()),
            object: Some(group_object(group_id)),
        }
    }

    /// Partial key matching every `member` tuple on a group.
    pub fn group_members(group_id: Uuid) -> Self {
        Self {
            user: None,
            relation: Some(MEMBER_RELATION.to_string()),
            object: Some(group_object(group_id)),
        }
    }

    /// Partial key matching every tuple where the subject is the given user
    /// and the object is of the given kind.
    pub fn user_on_kind(user_id: Uuid, object_kind: &str) -> Self {
        Self {
            user: Some(user_id.to_string()),
            relation: None,
            object: Some(format!("{object_kind}:")),
        }
    }
}

/// Format a group identifier as an authorization store object.
pub fn group_object(group_id: Uuid) -> String {
    format!("{GROUP_OBJECT_KIND}:{group_id}")
}

/// `POST /stores/{store_id}/read` request body.
#[derive(Debug, Clone, Serialize)]
pub struct ReadRequest {
    pub tuple_key: TupleKey,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// A stored tuple as returned by a read.
#[derive(Debug, Clone, Deserialize)]
pub struct Tuple {
    pub key: TupleKey,
}

/// `POST /stores/{store_id}/read` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResponse {
    #[serde(default)]
    pub tuples: Vec<Tuple>,

    #[serde(default)]
    pub continuation_token: Option<String>,
}

/// A batch of tuple keys inside a write request.
#[derive(Debug, Clone, Serialize)]
pub struct TupleKeys {
    pub tuple_keys: Vec<TupleKey>,
}

/// `POST /stores/{store_id}/write` request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writes: Option<TupleKeys>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletes: Option<TupleKeys>,
}
