//! Handlers that run the layout pipeline: page plan, preview tree, overflow
//! evaluation and the two export formats.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::layout::catalog::{describe_sections, SectionDescriptor};
use crate::layout::overflow::{build_report, OverflowProbe, OverflowReport, DEFAULT_EPSILON_PX};
use crate::layout::{resolve, CvView, PagePlan};
use crate::models::cv::Locale;
use crate::render::{build_preview, render_document, PreviewDocument};
use crate::state::AppState;
use crate::store::load_bundle;

#[derive(Debug, Deserialize)]
pub struct LocaleQuery {
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Deserialize)]
pub struct OverflowRequest {
    pub probes: Vec<OverflowProbe>,
    #[serde(default)]
    pub epsilon_px: Option<f32>,
}

/// GET /api/v1/sections
pub async fn handle_list_sections(Query(params): Query<LocaleQuery>) -> Json<Vec<SectionDescriptor>> {
    Json(describe_sections(params.locale))
}

/// GET /api/v1/cvs/:id/layout
pub async fn handle_get_layout(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Json<PagePlan>, AppError> {
    let bundle = load_bundle(state.store.as_ref(), cv_id).await?;
    let view = CvView::build(&bundle.doc.content, &bundle.profile, &bundle.selections);
    Ok(Json(resolve(&view, &bundle.doc.display_settings)))
}

/// GET /api/v1/cvs/:id/preview
pub async fn handle_get_preview(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Json<PreviewDocument>, AppError> {
    let bundle = load_bundle(state.store.as_ref(), cv_id).await?;
    let view = CvView::build(&bundle.doc.content, &bundle.profile, &bundle.selections);
    let plan = resolve(&view, &bundle.doc.display_settings);
    Ok(Json(build_preview(&bundle.doc, &view, &plan)))
}

/// POST /api/v1/cvs/:id/overflow
///
/// Evaluates DOM measurements posted by the preview. Advisory only; the stored
/// CV is never modified.
pub async fn handle_check_overflow(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Json(req): Json<OverflowRequest>,
) -> Result<Json<OverflowReport>, AppError> {
    // Unknown CVs still 404 so stale previews notice.
    state.store.get_cv(cv_id).await?;

    let epsilon = match req.epsilon_px {
        Some(e) if e.is_finite() && e >= 0.0 => e,
        Some(e) => {
            return Err(AppError::Validation(format!(
                "epsilon_px must be a non-negative number, got {e}"
            )))
        }
        None => DEFAULT_EPSILON_PX,
    };
    Ok(Json(build_report(&req.probes, epsilon)))
}

/// GET /api/v1/cvs/:id/export.html
pub async fn handle_export_html(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let bundle = load_bundle(state.store.as_ref(), cv_id).await?;
    let view = CvView::build(&bundle.doc.content, &bundle.profile, &bundle.selections);
    let plan = resolve(&view, &bundle.doc.display_settings);
    Ok(Html(render_document(&bundle.doc, &view, &plan)))
}

/// GET /api/v1/cvs/:id/export.pdf
pub async fn handle_export_pdf(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let bundle = load_bundle(state.store.as_ref(), cv_id).await?;
    let (html, format) = {
        let view = CvView::build(&bundle.doc.content, &bundle.profile, &bundle.selections);
        let plan = resolve(&view, &bundle.doc.display_settings);
        (render_document(&bundle.doc, &view, &plan), plan.format)
    };

    let pdf = state
        .pdf
        .render(&html, format)
        .await
        .map_err(|e| AppError::Pdf(format!("PDF export of CV {cv_id} failed: {e}")))?;

    info!(%cv_id, bytes = pdf.len(), format = format.label(), "PDF exported");

    let disposition = format!(
        "attachment; filename=\"{}.pdf\"",
        download_name(&bundle.doc.title)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}

/// ASCII-only file name derived from the CV title.
fn download_name(title: &str) -> String {
    let mut name = String::with_capacity(title.len());
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            name.push(c);
        } else if (c.is_whitespace() || c == '.') && !name.ends_with('-') {
            name.push('-');
        }
    }
    let name = name.trim_matches('-');
    if name.is_empty() {
        "cv".to_string()
    } else {
        name.to_string()
    }
}
