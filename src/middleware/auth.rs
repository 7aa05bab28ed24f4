use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the session token. Kept as the custom `Token` header
/// rather than an `Authorization: Bearer` scheme for client compatibility.
pub const TOKEN_HEADER: &str = "Token";

/// Authenticated user context extracted from a validated session token.
///
/// Handlers read identity from this extension only; the token itself is
/// never re-parsed downstream.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
            name: claims.name,
        }
    }
}

/// Token authentication middleware for protected routes.
///
/// Extracts the `Token` header, validates it, and injects an [`AuthUser`]
/// into request extensions. Requests without a valid token are rejected with
/// 401 before the wrapped handler runs.
pub async fn token_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("request rejected: no token given");
            ApiError::unauthorized("Missing Token header")
        })?;

    let claims = state.codec.validate(token).map_err(|err| {
        tracing::warn!("request rejected: {}", err);
        ApiError::unauthorized("Invalid token")
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}
