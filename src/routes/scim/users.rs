//! SCIM User resource endpoints.

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AppState,
    db::User,
    scim::{
        ListResponse, ScimError, ScimListParams, ScimMeta, UserPatchRequest, UserPayload,
        UserResource, parse_filter, types::SCHEMA_USER,
    },
};

/// JSON response with the SCIM media type.
pub struct ScimJson<T>(pub StatusCode, pub T);

impl<T: Serialize> IntoResponse for ScimJson<T> {
    fn into_response(self) -> Response {
        let mut response = (self.0, Json(self.1)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/scim+json"),
        );
        response
    }
}

/// Render a user record as a SCIM resource.
///
/// List envelopes omit the per-resource `schemas` attribute; single-resource
/// responses carry it.
pub(super) fn user_resource(user: User, base_url: &str, single: bool) -> UserResource {
    let location = format!("{base_url}/scim/v2/Users/{}", user.id);
    UserResource {
        schemas: if single {
            vec![SCHEMA_USER.to_string()]
        } else {
            Vec::new()
        },
        id: user.id,
        user_name: user.username,
        external_id: user.external_id,
        name: user.name,
        display_name: user.display_name,
        locale: user.locale,
        active: user.active,
        emails: user.emails,
        meta: ScimMeta::user(user.created_at, user.updated_at, location),
    }
}

async fn read_body<T: serde::de::DeserializeOwned>(request: Request<Body>) -> Result<T, ScimError> {
    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 1024)
        .await
        .map_err(|e| ScimError::invalid_syntax(format!("failed to read request body: {e}")))?;

    serde_json::from_slice(&bytes).map_err(|e| ScimError::invalid_syntax(format!("invalid JSON: {e}")))
}

/// `GET /scim/v2/Users`
#[tracing::instrument(name = "scim.users.list", skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ScimListParams>,
) -> Response {
    let filters = match parse_filter(params.filter.as_deref().unwrap_or_default()) {
        Ok(filters) => filters,
        Err(e) => return ScimError::invalid_filter(e.to_string()).into_response(),
    };

    let page = params.page();
    match state.services.provisioning.get_users(&filters, &page).await {
        Ok((total, users)) => {
            let base_url = &state.config.server.base_url;
            let resources = users
                .into_iter()
                .map(|u| user_resource(u, base_url, false))
                .collect();
            ScimJson(StatusCode::OK, ListResponse::new(total, &page, resources)).into_response()
        }
        Err(e) => ScimError::from(e).into_response(),
    }
}

/// `POST /scim/v2/Users`
#[tracing::instrument(name = "scim.users.create", skip_all)]
pub async fn create_user(State(state): State<AppState>, request: Request<Body>) -> Response {
    let payload: UserPayload = match read_body(request).await {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    match state.services.provisioning.create_user(&payload).await {
        Ok(user) => ScimJson(
            StatusCode::CREATED,
            user_resource(user, &state.config.server.base_url, true),
        )
        .into_response(),
        Err(e) => ScimError::from(e).into_response(),
    }
}

/// `GET /scim/v2/Users/{id}`
#[tracing::instrument(name = "scim.users.get", skip_all, fields(%id))]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.services.provisioning.find_user(id).await {
        Ok(user) => ScimJson(
            StatusCode::OK,
            user_resource(user, &state.config.server.base_url, true),
        )
        .into_response(),
        Err(e) => ScimError::from(e).into_response(),
    }
}

/// `PUT /scim/v2/Users/{id}`
#[tracing::instrument(name = "scim.users.replace", skip_all, fields(%id))]
pub async fn replace_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Request<Body>,
) -> Response {
    let payload: UserPayload = match read_body(request).await {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    match state.services.provisioning.update_user(id, &payload).await {
        Ok(user) => ScimJson(
            StatusCode::OK,
            user_resource(user, &state.config.server.base_url, true),
        )
        .into_response(),
        Err(e) => ScimError::from(e).into_response(),
    }
}

/// `PATCH /scim/v2/Users/{id}`
#[tracing::instrument(name = "scim.users.patch", skip_all, fields(%id))]
pub async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Request<Body>,
) -> Response {
    let patch: UserPatchRequest = match read_body(request).await {
        Ok(patch) => patch,
        Err(e) => return e.into_response(),
    };

    match state.services.provisioning.patch_user(id, &patch).await {
        Ok(user) => ScimJson(
            StatusCode::OK,
            user_resource(user, &state.config.server.base_url, true),
        )
        .into_response(),
        Err(e) => ScimError::from(e).into_response(),
    }
}

/// `DELETE /scim/v2/Users/{id}`
#[tracing::instrument(name = "scim.users.delete", skip_all, fields(%id))]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.services.provisioning.delete_user(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ScimError::from(e).into_response(),
    }
}
