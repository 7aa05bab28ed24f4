use axum::{
    extract::{Extension, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::assistant::GenerationOptions;
use crate::database::models::{Card, Set};
use crate::database::store;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Metadata form field accompanying the uploaded file.
#[derive(Debug, Deserialize)]
pub struct CreateSetRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub options: GenerationOptions,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSetRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// GET /sets
pub async fn list_sets(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Set>>, ApiError> {
    tracing::info!("GET /sets");

    let sets = store::list_sets_by_author(&state.pool, author_id(&user)?).await?;
    Ok(Json(sets))
}

/// POST /sets
///
/// Multipart form: a `file` part (the source PDF) and a `metadata` JSON part.
/// Drives the generation job synchronously, then persists the set and its
/// cards. The set insert and the per-card inserts are separate statements
/// with no enclosing transaction, so a mid-sequence failure can leave a
/// partial set behind; wrapping them is pending a product decision.
pub async fn create_set(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    tracing::info!("POST /sets");

    let author_id = author_id(&user)?;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut metadata: Option<CreateSetRequest> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart form: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Error retrieving the file: {}", e)))?;
                tracing::info!(size = bytes.len(), "received upload");
                file_bytes = Some(bytes.to_vec());
            }
            Some("metadata") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Error reading metadata: {}", e)))?;
                metadata = Some(
                    serde_json::from_str(&text).map_err(|e| {
                        ApiError::bad_request(format!("Failed to decode JSON metadata: {}", e))
                    })?,
                );
            }
            _ => {}
        }
    }

    let file_bytes = file_bytes.ok_or_else(|| ApiError::bad_request("Missing file field"))?;
    let metadata = metadata.ok_or_else(|| ApiError::bad_request("Missing metadata field"))?;

    let cancel = CancellationToken::new();
    let cards = state
        .generator
        .generate(file_bytes, &metadata.options, cancel)
        .await?;
    tracing::info!(count = cards.len(), "generation produced cards");

    let set = Set {
        id: Uuid::new_v4(),
        name: metadata.name,
        description: metadata.description,
        author_id,
    };
    store::insert_set(&state.pool, &set).await?;

    for card in cards {
        let row = Card {
            id: Uuid::new_v4(),
            set_id: set.id,
            front: card.question.into_front(),
            back: card.answer,
        };
        store::insert_card(&state.pool, &row).await?;
    }

    Ok(Json(json!({ "setId": set.id })))
}

/// GET /sets/{setId}
pub async fn get_set(
    State(state): State<AppState>,
    Path(set_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(%set_id, "GET /sets/{{setId}}");

    let set = store::get_set(&state.pool, set_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Set not found"))?;
    let cards = store::list_cards_for_set(&state.pool, set_id).await?;

    Ok(Json(json!({ "setName": set.name, "cards": cards })))
}

/// PUT /sets/{setId}
pub async fn update_set(
    State(state): State<AppState>,
    Path(set_id): Path<Uuid>,
    Json(request): Json<UpdateSetRequest>,
) -> Result<StatusCode, ApiError> {
    tracing::info!(%set_id, "PUT /sets/{{setId}}");

    store::update_set(&state.pool, set_id, &request.name, &request.description).await?;
    Ok(StatusCode::OK)
}

/// DELETE /sets/{setId}
///
/// Reports success even when the id matches nothing; there is no existence
/// check before the delete.
pub async fn delete_set(
    State(state): State<AppState>,
    Path(set_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    tracing::info!(%set_id, "DELETE /sets/{{setId}}");

    store::delete_set(&state.pool, set_id).await?;
    Ok(StatusCode::OK)
}

/// The subject claim carries the owner's row id.
fn author_id(user: &AuthUser) -> Result<Uuid, ApiError> {
    Uuid::parse_str(&user.user_id)
        .map_err(|_| ApiError::unauthorized("Token subject is not a valid user id"))
}
