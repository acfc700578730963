//! SCIM Group resource endpoints.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::users::ScimJson;
use crate::{
    AppState,
    db::{Group, GroupMember},
    scim::{
        GroupMemberRef, GroupPatchRequest, GroupPayload, GroupResource, ListResponse, ScimError,
        ScimListParams, ScimMeta, types::SCHEMA_GROUP,
    },
};

fn group_resource(
    group: Group,
    members: Vec<GroupMember>,
    base_url: &str,
    single: bool,
) -> GroupResource {
    let location = format!("{base_url}/scim/v2/Groups/{}", group.id);
    GroupResource {
        schemas: if single {
            vec![SCHEMA_GROUP.to_string()]
        } else {
            Vec::new()
        },
        id: group.id,
        display_name: group.display_name,
        members: members
            .into_iter()
            .map(|m| GroupMemberRef {
                value: m.user_id,
                display: m.username,
            })
            .collect(),
        meta: ScimMeta::group(group.created_at, group.updated_at, location),
    }
}

async fn read_body<T: serde::de::DeserializeOwned>(request: Request<Body>) -> Result<T, ScimError> {
    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 1024)
        .await
        .map_err(|e| ScimError::invalid_syntax(format!("failed to read request body: {e}")))?;

    serde_json::from_slice(&bytes).map_err(|e| ScimError::invalid_syntax(format!("invalid JSON: {e}")))
}

/// `GET /scim/v2/Groups`
#[tracing::instrument(name = "scim.groups.list", skip_all)]
pub async fn list_groups(
    State(state): State<AppState>,
    Query(params): Query<ScimListParams>,
) -> Response {
    let page = params.page();
    match state.services.provisioning.get_groups(&page).await {
        Ok((total, groups)) => {
            let base_url = &state.config.server.base_url;
            let resources = groups
                .into_iter()
                .map(|g| group_resource(g, Vec::new(), base_url, false))
                .collect();
            ScimJson(StatusCode::OK, ListResponse::new(total, &page, resources)).into_response()
        }
        Err(e) => ScimError::from(e).into_response(),
    }
}

/// `POST /scim/v2/Groups`
#[tracing::instrument(name = "scim.groups.create", skip_all)]
pub async fn create_group(State(state): State<AppState>, request: Request<Body>) -> Response {
    let payload: GroupPayload = match read_body(request).await {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    match state
        .services
        .provisioning
        .create_group(&payload.display_name)
        .await
    {
        Ok(group) => ScimJson(
            StatusCode::CREATED,
            group_resource(group, Vec::new(), &state.config.server.base_url, true),
        )
        .into_response(),
        Err(e) => ScimError::from(e).into_response(),
    }
}

/// `GET /scim/v2/Groups/{id}`
#[tracing::instrument(name = "scim.groups.get", skip_all, fields(%id))]
pub async fn get_group(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let group = match state.services.provisioning.find_group(id).await {
        Ok(group) => group,
        Err(e) => return ScimError::from(e).into_response(),
    };

    match state.services.provisioning.get_group_membership(id).await {
        Ok(members) => ScimJson(
            StatusCode::OK,
            group_resource(group, members, &state.config.server.base_url, true),
        )
        .into_response(),
        Err(e) => ScimError::from(e).into_response(),
    }
}

/// `PATCH /scim/v2/Groups/{id}`
///
/// Applies the membership/display-name operations through the provisioning
/// engine's dual-write sequence.
#[tracing::instrument(name = "scim.groups.patch", skip_all, fields(%id))]
pub async fn patch_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Request<Body>,
) -> Response {
    // Resolve the group first so an unknown id is a 404, not a patch error.
    if let Err(e) = state.services.provisioning.find_group(id).await {
        return ScimError::from(e).into_response();
    }

    let patch: GroupPatchRequest = match read_body(request).await {
        Ok(patch) => patch,
        Err(e) => return e.into_response(),
    };

    match state.services.provisioning.patch_group(id, &patch).await {
        Ok(group) => ScimJson(
            StatusCode::OK,
            group_resource(group, Vec::new(), &state.config.server.base_url, true),
        )
        .into_response(),
        Err(e) => ScimError::from(e).into_response(),
    }
}

/// `DELETE /scim/v2/Groups/{id}`
#[tracing::instrument(name = "scim.groups.delete", skip_all, fields(%id))]
pub async fn delete_group(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    if let Err(e) = state.services.provisioning.find_group(id).await {
        return ScimError::from(e).into_response();
    }

    match state.services.provisioning.delete_group(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ScimError::from(e).into_response(),
    }
}
