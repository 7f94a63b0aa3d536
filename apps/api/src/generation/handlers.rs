//! Axum route handlers for AI content generation.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::{GeneratedContent, GeneratedField, GenerationAction, GenerationContext};
use crate::layout::CvView;
use crate::models::cv::CvDocument;
use crate::state::AppState;
use crate::store::{load_bundle, CvBundle};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Fields to fill; all generatable fields when omitted.
    #[serde(default)]
    pub fields: Option<Vec<GeneratedField>>,
    #[serde(default)]
    pub werbeflaechen: BTreeMap<String, String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegenerateRequest {
    pub field: GeneratedField,
    #[serde(default)]
    pub werbeflaechen: BTreeMap<String, String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub generated: GeneratedContent,
    pub cv: CvDocument,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/cvs/:id/generate
///
/// Generates the requested fields and stores them like user edits.
/// A second request for the same CV while one is running gets 409.
pub async fn handle_generate(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let mut fields = request.fields.unwrap_or_else(|| GeneratedField::ALL.to_vec());
    fields.sort_unstable();
    fields.dedup();
    if fields.is_empty() {
        return Err(AppError::Validation("fields cannot be empty".to_string()));
    }

    let _guard = state
        .in_flight
        .try_begin(cv_id, GenerationAction::Generate)
        .ok_or_else(|| busy(cv_id))?;

    let bundle = load_bundle(state.store.as_ref(), cv_id).await?;
    let context = build_context(&bundle, request.werbeflaechen, request.instructions);

    let generated = state
        .generator
        .generate(&context, &fields)
        .await
        .map_err(|e| AppError::Llm(format!("Content generation failed: {e}")))?;

    let cv = store_generated(&state, bundle.doc, generated.clone()).await?;
    info!(%cv_id, fields = fields.len(), "generated content stored");

    Ok(Json(GenerateResponse { generated, cv }))
}

/// POST /api/v1/cvs/:id/regenerate
pub async fn handle_regenerate(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Json(request): Json<RegenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let _guard = state
        .in_flight
        .try_begin(cv_id, GenerationAction::Regenerate(request.field))
        .ok_or_else(|| busy(cv_id))?;

    let bundle = load_bundle(state.store.as_ref(), cv_id).await?;
    let context = build_context(&bundle, request.werbeflaechen, request.instructions);

    let generated = state
        .generator
        .regenerate(&context, request.field)
        .await
        .map_err(|e| AppError::Llm(format!("Regenerating {} failed: {e}", request.field.key())))?;

    let cv = store_generated(&state, bundle.doc, generated.clone()).await?;
    info!(%cv_id, field = request.field.key(), "regenerated content stored");

    Ok(Json(GenerateResponse { generated, cv }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn busy(cv_id: Uuid) -> AppError {
    AppError::Conflict(format!(
        "A generation request for CV {cv_id} is already in progress"
    ))
}

fn build_context(
    bundle: &CvBundle,
    werbeflaechen: BTreeMap<String, String>,
    instructions: Option<String>,
) -> GenerationContext {
    let view = CvView::build(&bundle.doc.content, &bundle.profile, &bundle.selections);
    GenerationContext::from_view(
        &view,
        bundle.doc.display_settings.locale,
        werbeflaechen,
        instructions,
    )
}

async fn store_generated(
    state: &AppState,
    mut doc: CvDocument,
    generated: GeneratedContent,
) -> Result<CvDocument, AppError> {
    for edit in generated.into_edits() {
        doc = state.store.apply_edit(doc.id, edit).await?;
    }
    Ok(doc)
}
