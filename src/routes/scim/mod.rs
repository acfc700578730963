//! SCIM 2.0 protocol routes.
//!
//! Everything lives under `/scim/v2/` behind bearer token authentication:
//!
//! - `GET/POST /Users`, `GET/PUT/PATCH/DELETE /Users/{id}`
//! - `GET/POST /Groups`, `GET/PATCH/DELETE /Groups/{id}`

pub mod groups;
pub mod middleware;
pub mod users;

use axum::{Router, routing::get};

use crate::AppState;

/// Build the SCIM v2 routes with authentication applied.
pub fn scim_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/Users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/Users/{id}",
            get(users::get_user)
                .put(users::replace_user)
                .patch(users::patch_user)
                .delete(users::delete_user),
        )
        .route(
            "/Groups",
            get(groups::list_groups).post(groups::create_group),
        )
        .route(
            "/Groups/{id}",
            get(groups::get_group)
                .patch(groups::patch_group)
                .delete(groups::delete_group),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::scim_auth_middleware,
        ))
}
