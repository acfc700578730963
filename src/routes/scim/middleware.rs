//! SCIM bearer token authentication middleware.
//!
//! Every SCIM route requires the rotating SCIM API key, presented as a
//! bearer token and checked against its stored Argon2id hash.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{AppState, scim::ScimError};

/// Authenticate the request's bearer token before letting it through.
///
/// A missing header, an unknown token, or an unconfigured credential all map
/// to 401; only a failure while checking (database down, unreadable stored
/// hash) maps to 500.
pub async fn scim_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer_token(&request) {
        Some(token) => token.to_string(),
        None => {
            return ScimError::unauthorized(
                "Missing or invalid Authorization header. Expected: Bearer <token>",
            )
            .into_response();
        }
    };

    match state.services.credentials.verify_token(&token).await {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            tracing::debug!("SCIM authentication failed: invalid token");
            ScimError::unauthorized("Invalid SCIM bearer token").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "SCIM authentication error");
            ScimError::internal("Authentication service error").into_response()
        }
    }
}

/// Extract the bearer token from the Authorization header.
///
/// Expects `Authorization: Bearer <token>`; the scheme match is
/// case-insensitive. Token validation happens in the credential service.
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    let auth_header = request.headers().get(header::AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;

    if auth_str.len() >= 7 && auth_str[..7].eq_ignore_ascii_case("Bearer ") {
        Some(&auth_str[7..])
    } else {
        None
    }
}
