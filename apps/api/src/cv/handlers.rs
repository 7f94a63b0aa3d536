//! Axum route handlers for CV documents, their display settings and selections.

use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::layout::catalog::SectionKind;
use crate::models::cv::{
    validate_display_settings, validate_title, CvContent, CvDocument, DisplaySettings, PageBreaks,
};
use crate::models::profile::{ProfileItem, ProfileKind};
use crate::models::selection::{keep_stored_order, reorder_selections, Selection, SelectionIndex};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateCvRequest {
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: Option<CvContent>,
    #[serde(default)]
    pub display_settings: Option<DisplaySettings>,
}

#[derive(Debug, Deserialize)]
pub struct ListCvsQuery {
    pub user_id: Uuid,
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Deserialize)]
pub struct TogglePageBreakRequest {
    /// Section key (e.g. "experience") or item id.
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct TogglePageBreakResponse {
    pub id: String,
    pub active: bool,
    pub page_breaks: PageBreaks,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub item_ids: Vec<Uuid>,
}

// ────────────────────────────────────────────────────────────────────────────
// Documents
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/cvs
pub async fn handle_create_cv(
    State(state): State<AppState>,
    Json(req): Json<CreateCvRequest>,
) -> Result<(StatusCode, Json<CvDocument>), AppError> {
    validate_title(&req.title).map_err(AppError::Validation)?;

    let mut doc = CvDocument::new(req.user_id, req.title.trim().to_string());
    if let Some(content) = req.content {
        doc.content = content;
    }
    if let Some(settings) = req.display_settings {
        validate_display_settings(&settings).map_err(AppError::Validation)?;
        doc.display_settings = settings;
    }

    let doc = state.store.create_cv(doc).await?;
    info!(cv_id = %doc.id, user_id = %doc.user_id, "CV created");
    Ok((StatusCode::CREATED, Json(doc)))
}

/// GET /api/v1/cvs
pub async fn handle_list_cvs(
    State(state): State<AppState>,
    Query(params): Query<ListCvsQuery>,
) -> Result<Json<Vec<CvDocument>>, AppError> {
    let cvs = state
        .store
        .list_cvs(params.user_id, params.include_archived)
        .await?;
    Ok(Json(cvs))
}

/// GET /api/v1/cvs/:id
pub async fn handle_get_cv(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Json<CvDocument>, AppError> {
    Ok(Json(state.store.get_cv(cv_id).await?))
}

/// DELETE /api/v1/cvs/:id
pub async fn handle_delete_cv(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.store.delete_cv(cv_id).await?;
    info!(%cv_id, "CV deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/cvs/:id/archive
pub async fn handle_archive_cv(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Json<CvDocument>, AppError> {
    Ok(Json(state.store.set_archived(cv_id, true).await?))
}

/// POST /api/v1/cvs/:id/restore
pub async fn handle_restore_cv(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Json<CvDocument>, AppError> {
    Ok(Json(state.store.set_archived(cv_id, false).await?))
}

// ────────────────────────────────────────────────────────────────────────────
// Display settings
// ────────────────────────────────────────────────────────────────────────────

/// PUT /api/v1/cvs/:id/display-settings
pub async fn handle_update_display_settings(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Json(settings): Json<DisplaySettings>,
) -> Result<Json<CvDocument>, AppError> {
    validate_display_settings(&settings).map_err(AppError::Validation)?;
    let doc = state.store.update_display_settings(cv_id, settings).await?;
    Ok(Json(doc))
}

/// POST /api/v1/cvs/:id/page-breaks/toggle
///
/// Adds the marker if absent, removes it if present.
pub async fn handle_toggle_page_break(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Json(req): Json<TogglePageBreakRequest>,
) -> Result<Json<TogglePageBreakResponse>, AppError> {
    let id = req.id.trim().to_string();
    if SectionKind::from_key(&id).is_none() && Uuid::parse_str(&id).is_err() {
        return Err(AppError::Validation(format!(
            "'{id}' is neither a section key nor an item id"
        )));
    }

    let doc = state.store.get_cv(cv_id).await?;
    let mut settings = doc.display_settings;
    let active = settings.page_breaks.toggle(&id);
    let doc = state.store.update_display_settings(cv_id, settings).await?;

    Ok(Json(TogglePageBreakResponse {
        id,
        active,
        page_breaks: doc.display_settings.page_breaks,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Selections
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/cvs/:id/selections
pub async fn handle_list_selections(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Json<Vec<Selection>>, AppError> {
    Ok(Json(state.store.list_selections(cv_id).await?))
}

/// PUT /api/v1/cvs/:id/selections
///
/// Upserts by item id. Every item must belong to the CV owner's profile.
pub async fn handle_upsert_selections(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Json(mut selections): Json<Vec<Selection>>,
) -> Result<Json<Vec<Selection>>, AppError> {
    let item_ids: Vec<Uuid> = selections.iter().map(|s| s.item_id).collect();
    ensure_profile_items(&state, cv_id, &item_ids).await?;

    let existing = SelectionIndex::new(state.store.list_selections(cv_id).await?);
    keep_stored_order(&mut selections, &existing);

    let stored = state.store.upsert_selections(cv_id, selections).await?;
    Ok(Json(stored))
}

/// POST /api/v1/cvs/:id/selections/reorder
///
/// Persists a drag-and-drop order: `item_ids[i]` gets `display_order = i`.
pub async fn handle_reorder_selections(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<Vec<Selection>>, AppError> {
    let mut seen = HashSet::new();
    if let Some(dup) = req.item_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(AppError::Validation(format!("item {dup} listed twice")));
    }

    let profile = ensure_profile_items(&state, cv_id, &req.item_ids).await?;
    let mut existing = state.store.list_selections(cv_id).await?;

    // Siblings without a stored record still occupy their profile position,
    // so they take part in the renumbering too.
    let kinds: HashSet<ProfileKind> = profile
        .iter()
        .filter(|item| req.item_ids.contains(&item.id()))
        .map(ProfileItem::kind)
        .collect();
    let recorded: HashSet<Uuid> = existing.iter().map(|s| s.item_id).collect();
    existing.extend(
        profile
            .iter()
            .filter(|item| kinds.contains(&item.kind()) && !recorded.contains(&item.id()))
            .map(|item| Selection::default_for(cv_id, item.id(), item.display_order())),
    );

    let reordered = reorder_selections(cv_id, existing, &req.item_ids);
    let stored = state.store.upsert_selections(cv_id, reordered).await?;
    Ok(Json(stored))
}

/// Rejects item ids that are not in the CV owner's profile; returns that profile.
async fn ensure_profile_items(
    state: &AppState,
    cv_id: Uuid,
    item_ids: &[Uuid],
) -> Result<Vec<ProfileItem>, AppError> {
    let doc = state.store.get_cv(cv_id).await?;
    let profile = state.store.list_profile(doc.user_id).await?;
    let owned: HashSet<Uuid> = profile.iter().map(ProfileItem::id).collect();

    match item_ids.iter().find(|id| !owned.contains(*id)) {
        Some(unknown) => Err(AppError::Validation(format!(
            "item {unknown} is not part of this user's profile"
        ))),
        None => Ok(profile),
    }
}
