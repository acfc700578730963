//! SCIM 2.0 Resource and Protocol Types
//!
//! Core resource payloads (User, Group) and protocol envelopes
//! (ListResponse, resource metadata) per RFC 7643/7644. Inbound payloads
//! deserialize the attributes this bridge persists; everything else an IdP
//! sends is ignored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Schema URIs
// =============================================================================

/// SCIM Core User schema URI
pub const SCHEMA_USER: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// SCIM Core Group schema URI
pub const SCHEMA_GROUP: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";

/// SCIM ListResponse schema URI
pub const SCHEMA_LIST_RESPONSE: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";

/// SCIM Error schema URI
pub const SCHEMA_ERROR: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// SCIM PatchOp schema URI
pub const SCHEMA_PATCH_OP: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

// =============================================================================
// Shared attribute types
// =============================================================================

/// Email address with type and primary flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScimEmail {
    pub value: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default)]
    pub primary: bool,
}

/// Resource metadata common to all SCIM resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimMeta {
    /// The resource type (e.g., "User", "Group")
    pub resource_type: String,

    /// When the resource was created
    pub created: DateTime<Utc>,

    /// When the resource was last modified
    pub last_modified: DateTime<Utc>,

    /// The absolute URI of the resource
    pub location: String,
}

impl ScimMeta {
    /// Metadata for a User resource.
    pub fn user(created: DateTime<Utc>, last_modified: DateTime<Utc>, location: String) -> Self {
        Self {
            resource_type: "User".to_string(),
            created,
            last_modified,
            location,
        }
    }

    /// Metadata for a Group resource.
    pub fn group(created: DateTime<Utc>, last_modified: DateTime<Utc>, location: String) -> Self {
        Self {
            resource_type: "Group".to_string(),
            created,
            last_modified,
            location,
        }
    }
}

// =============================================================================
// Inbound payloads
// =============================================================================

/// User payload for POST /Users and PUT /Users/{id}.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    #[serde(default)]
    pub schemas: Vec<String>,

    pub user_name: String,

    #[serde(default)]
    pub external_id: Option<String>,

    /// Structured name components, kept as an opaque key/value mapping.
    #[serde(default)]
    pub name: Option<HashMap<String, String>>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub locale: Option<String>,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub emails: Vec<ScimEmail>,
}

/// Group payload for POST /Groups.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
    #[serde(default)]
    pub schemas: Vec<String>,

    pub display_name: String,
}

// =============================================================================
// Outbound resources
// =============================================================================

/// User resource as rendered in responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResource {
    /// Present on single-resource responses, omitted inside list envelopes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,

    pub id: Uuid,

    pub user_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<HashMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    pub active: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<ScimEmail>,

    pub meta: ScimMeta,
}

/// A group member reference inside a Group resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMemberRef {
    /// The member's user identifier.
    pub value: Uuid,

    /// Denormalized display value (the member's username).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Group resource as rendered in responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResource {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,

    pub id: Uuid,

    pub display_name: String,

    pub members: Vec<GroupMemberRef>,

    pub meta: ScimMeta,
}

/// SCIM list envelope per RFC 7644 Section 3.4.2.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub schemas: Vec<String>,

    pub total_results: i64,

    pub items_per_page: i64,

    pub start_index: i64,

    #[serde(rename = "Resources")]
    pub resources: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(total_results: i64, page: &Page, resources: Vec<T>) -> Self {
        Self {
            schemas: vec![SCHEMA_LIST_RESPONSE.to_string()],
            total_results,
            items_per_page: page.limit,
            start_index: page.offset + 1,
            resources,
        }
    }
}

// =============================================================================
// Pagination
// =============================================================================

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 200;

/// Query parameters accepted by SCIM list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListParams {
    /// SCIM filter expression (e.g., `userName eq "jdoe@example.com"`)
    #[serde(default)]
    pub filter: Option<String>,

    /// 1-based index of the first result (default: 1)
    #[serde(default)]
    pub start_index: Option<i64>,

    /// Results per page (default: 100, max: 200)
    #[serde(default)]
    pub count: Option<i64>,
}

/// Offset/limit window derived from SCIM pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl ScimListParams {
    /// Convert SCIM's 1-based `startIndex`/`count` into an offset/limit
    /// window, clamping out-of-range values rather than rejecting them.
    pub fn page(&self) -> Page {
        let offset = self.start_index.unwrap_or(1).max(1) - 1;
        let limit = self
            .count
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        Page { offset, limit }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_payload_defaults_active_true() {
        let payload: UserPayload = serde_json::from_str(
            r#"{"schemas":["urn:ietf:params:scim:schemas:core:2.0:User"],"userName":"jdoe"}"#,
        )
        .unwrap();

        assert!(payload.active);
        assert!(payload.emails.is_empty());
        assert!(payload.name.is_none());
    }

    #[test]
    fn test_user_payload_full() {
        let payload: UserPayload = serde_json::from_str(
            r#"{
                "userName": "jdoe@example.com",
                "externalId": "00u1a2b3c4",
                "name": {"givenName": "Jane", "familyName": "Doe"},
                "displayName": "Jane Doe",
                "locale": "en-US",
                "active": false,
                "emails": [{"value": "jdoe@example.com", "type": "work", "primary": true}]
            }"#,
        )
        .unwrap();

        assert_eq!(payload.user_name, "jdoe@example.com");
        assert_eq!(payload.external_id.as_deref(), Some("00u1a2b3c4"));
        assert_eq!(
            payload.name.as_ref().unwrap().get("givenName").unwrap(),
            "Jane"
        );
        assert!(!payload.active);
        assert!(payload.emails[0].primary);
        assert_eq!(payload.emails[0].kind.as_deref(), Some("work"));
    }

    #[test]
    fn test_page_defaults() {
        let params = ScimListParams::default();
        assert_eq!(
            params.page(),
            Page {
                offset: 0,
                limit: 100
            }
        );
    }

    #[test]
    fn test_page_clamps() {
        let params = ScimListParams {
            filter: None,
            start_index: Some(0),
            count: Some(10_000),
        };
        assert_eq!(
            params.page(),
            Page {
                offset: 0,
                limit: 200
            }
        );

        let params = ScimListParams {
            filter: None,
            start_index: Some(11),
            count: Some(5),
        };
        assert_eq!(
            params.page(),
            Page {
                offset: 10,
                limit: 5
            }
        );
    }

    #[test]
    fn test_list_response_start_index_is_one_based() {
        let page = Page {
            offset: 10,
            limit: 5,
        };
        let resp: ListResponse<()> = ListResponse::new(42, &page, vec![]);

        assert_eq!(resp.start_index, 11);
        assert_eq!(resp.items_per_page, 5);
        assert_eq!(resp.schemas, vec![SCHEMA_LIST_RESPONSE.to_string()]);
    }
}
