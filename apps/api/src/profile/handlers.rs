use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{Profile, ProfileItem};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Profile>, AppError> {
    let items = state.store.list_profile(params.user_id).await?;
    Ok(Json(Profile::from_items(items)))
}

/// PUT /api/v1/profile/items
pub async fn handle_upsert_profile_item(
    State(state): State<AppState>,
    Json(item): Json<ProfileItem>,
) -> Result<Json<ProfileItem>, AppError> {
    item.validate().map_err(AppError::Validation)?;
    let item = state.store.upsert_profile_item(item).await?;
    info!(item_id = %item.id(), kind = item.kind().as_str(), "profile item saved");
    Ok(Json(item))
}

/// DELETE /api/v1/profile/items/:id
///
/// Also drops the item's selections on every CV.
pub async fn handle_delete_profile_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .delete_profile_item(params.user_id, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
