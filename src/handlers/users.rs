use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::database::store;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub identifier: String,
    pub password: String,
}

/// POST /users/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<StatusCode, ApiError> {
    tracing::info!(username = %request.username, "POST /users/register");

    store::insert_user(
        &state.pool,
        &request.email,
        &request.name,
        &request.username,
        &sha256_hex(&request.password),
    )
    .await?;

    Ok(StatusCode::OK)
}

/// POST /users/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!("POST /users/login");

    let user =
        store::find_user_by_credentials(&state.pool, &request.identifier, &sha256_hex(&request.password))
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let token = state
        .codec
        .issue(&user.id.to_string(), &user.email, &user.name)?;

    Ok(Json(json!({ "token": token })))
}

/// Hex-encoded SHA-256, matching the stored password digests.
fn sha256_hex(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_vectors() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
