//! SCIM PATCH operation parsing.
//!
//! PATCH bodies arrive as loosely-typed JSON (RFC 7644 Section 3.5.2). Each
//! operation is resolved into a typed [`GroupPatchAction`] at this boundary,
//! so the provisioning engine only ever sees one of a small closed set of
//! shapes: a member list, a single member reference, or a display-name
//! object. Shape violations fail here with a typed [`PatchError`].

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// A SCIM PATCH request for a Group resource.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupPatchRequest {
    #[serde(default)]
    pub schemas: Vec<String>,

    #[serde(rename = "Operations")]
    pub operations: Vec<GroupPatchOp>,
}

/// A single raw PATCH operation against a Group.
///
/// The verb is kept as a string so an unrecognized verb surfaces as
/// [`PatchError::UnknownOperation`] rather than a deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupPatchOp {
    pub op: String,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub value: Option<Value>,
}

/// A group PATCH operation resolved to its typed shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupPatchAction {
    /// `add` with an implicit `members` path: add the listed users.
    AddMembers(Vec<Uuid>),

    /// `remove` with a `members[value eq "<id>"]` path: remove one user.
    RemoveMember(Uuid),

    /// `replace` with path `members`: replace the full membership set.
    ReplaceMembers(Vec<Uuid>),

    /// `replace` with any other (or no) path: update the display name.
    ReplaceDisplayName(String),
}

/// PATCH operation parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

fn member_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^members\[value eq "(\S+)"\]$"#).expect("member path regex is valid")
    })
}

impl GroupPatchOp {
    /// Resolve this operation into its typed action.
    pub fn action(&self) -> Result<GroupPatchAction, PatchError> {
        match self.op.as_str() {
            "add" => Ok(GroupPatchAction::AddMembers(self.member_values()?)),
            "remove" => Ok(GroupPatchAction::RemoveMember(self.member_id_from_path()?)),
            "replace" => match self.path.as_deref() {
                Some("members") => Ok(GroupPatchAction::ReplaceMembers(self.member_values()?)),
                _ => Ok(GroupPatchAction::ReplaceDisplayName(self.display_name()?)),
            },
            other => Err(PatchError::UnknownOperation(other.to_string())),
        }
    }

    /// Extract the member-reference list from the operation value. Each entry
    /// must be an object whose `value` field parses as a user identifier.
    fn member_values(&self) -> Result<Vec<Uuid>, PatchError> {
        let members = self
            .value
            .as_ref()
            .and_then(Value::as_array)
            .ok_or_else(|| PatchError::InvalidValue("expected a member list".to_string()))?;

        let mut ids = Vec::with_capacity(members.len());
        for member in members {
            let value = member
                .get("value")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    PatchError::InvalidValue("member entry is missing a 'value' field".to_string())
                })?;

            let id = Uuid::parse_str(value).map_err(|_| {
                PatchError::InvalidValue(format!("'{value}' is not a valid user identifier"))
            })?;

            ids.push(id);
        }

        Ok(ids)
    }

    /// Extract the target user identifier from a
    /// `members[value eq "<id>"]` path.
    fn member_id_from_path(&self) -> Result<Uuid, PatchError> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| PatchError::InvalidPath("remove requires a path".to_string()))?;

        let captures = member_path_regex()
            .captures(path)
            .ok_or_else(|| PatchError::InvalidPath(path.to_string()))?;

        Uuid::parse_str(&captures[1]).map_err(|_| {
            PatchError::InvalidValue(format!("'{}' is not a valid user identifier", &captures[1]))
        })
    }

    /// Extract the display name from a top-level replace value object.
    fn display_name(&self) -> Result<String, PatchError> {
        self.value
            .as_ref()
            .and_then(|v| v.get("displayName"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PatchError::InvalidValue("expected an object with a 'displayName' string".to_string())
            })
    }
}

/// A SCIM PATCH request for a User resource.
///
/// Only `replace` of the `active` flag is supported; identity providers use
/// this to deactivate users without deleting them.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPatchRequest {
    #[serde(default)]
    pub schemas: Vec<String>,

    #[serde(rename = "Operations")]
    pub operations: Vec<UserPatchOp>,
}

/// A single PATCH operation against a User.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPatchOp {
    pub op: String,

    pub value: UserPatchValue,
}

/// The value payload of a user PATCH operation.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPatchValue {
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(op: &str, path: Option<&str>, value: Option<Value>) -> GroupPatchOp {
        GroupPatchOp {
            op: op.to_string(),
            path: path.map(str::to_string),
            value,
        }
    }

    #[test]
    fn test_add_members() {
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let action = op(
            "add",
            Some("members"),
            Some(json!([
                {"value": u1.to_string(), "display": "jdoe"},
                {"value": u2.to_string()},
            ])),
        )
        .action()
        .unwrap();

        assert_eq!(action, GroupPatchAction::AddMembers(vec![u1, u2]));
    }

    #[test]
    fn test_add_rejects_malformed_member_entries() {
        let err = op("add", None, Some(json!([{"display": "no value"}])))
            .action()
            .unwrap_err();
        assert!(matches!(err, PatchError::InvalidValue(_)));

        let err = op("add", None, Some(json!([{"value": "not-a-uuid"}])))
            .action()
            .unwrap_err();
        assert!(matches!(err, PatchError::InvalidValue(_)));

        let err = op("add", None, Some(json!({"value": "not-a-list"})))
            .action()
            .unwrap_err();
        assert!(matches!(err, PatchError::InvalidValue(_)));
    }

    #[test]
    fn test_remove_parses_member_path() {
        let id = Uuid::new_v4();
        let action = op(
            "remove",
            Some(&format!(r#"members[value eq "{id}"]"#)),
            None,
        )
        .action()
        .unwrap();

        assert_eq!(action, GroupPatchAction::RemoveMember(id));
    }

    #[test]
    fn test_remove_rejects_other_paths() {
        for path in ["members", r#"emails[value eq "a@b.c"]"#, "displayName"] {
            let err = op("remove", Some(path), None).action().unwrap_err();
            assert!(matches!(err, PatchError::InvalidPath(_)), "{path}");
        }

        let err = op("remove", None, None).action().unwrap_err();
        assert!(matches!(err, PatchError::InvalidPath(_)));
    }

    #[test]
    fn test_replace_members() {
        let id = Uuid::new_v4();
        let action = op(
            "replace",
            Some("members"),
            Some(json!([{"value": id.to_string()}])),
        )
        .action()
        .unwrap();

        assert_eq!(action, GroupPatchAction::ReplaceMembers(vec![id]));
    }

    #[test]
    fn test_replace_without_members_path_targets_display_name() {
        for path in [None, Some("displayName")] {
            let action = op("replace", path, Some(json!({"displayName": "Engineers"})))
                .action()
                .unwrap();
            assert_eq!(
                action,
                GroupPatchAction::ReplaceDisplayName("Engineers".to_string())
            );
        }
    }

    #[test]
    fn test_replace_display_name_requires_string() {
        let err = op("replace", None, Some(json!({"displayName": 7})))
            .action()
            .unwrap_err();
        assert!(matches!(err, PatchError::InvalidValue(_)));

        let err = op("replace", None, Some(json!({})))
            .action()
            .unwrap_err();
        assert!(matches!(err, PatchError::InvalidValue(_)));
    }

    #[test]
    fn test_unknown_operation() {
        let err = op("move", None, None).action().unwrap_err();
        assert_eq!(err, PatchError::UnknownOperation("move".to_string()));
    }

    #[test]
    fn test_request_deserializes_operations_key() {
        let request: GroupPatchRequest = serde_json::from_value(json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
            "Operations": [
                {"op": "replace", "value": {"displayName": "Platform"}},
            ],
        }))
        .unwrap();

        assert_eq!(request.operations.len(), 1);
        assert_eq!(
            request.operations[0].action().unwrap(),
            GroupPatchAction::ReplaceDisplayName("Platform".to_string())
        );
    }
}
