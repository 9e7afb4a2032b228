use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::layout::geometry::PageMargin;
use crate::models::settings::PageConfiguration;
use crate::render::rasterizer::{export_pdf, preview_info, ExportOptions, ExportPreview, PageFailure};
use crate::render::reconciler::{reconcile, ReconcileReport};
use crate::render::tree::RenderTree;
use crate::state::AppState;

const PAGES_RENDERED_HEADER: HeaderName = HeaderName::from_static("x-pages-rendered");
const PAGES_FAILED_HEADER: HeaderName = HeaderName::from_static("x-pages-failed");

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    pub tree: RenderTree,
    #[serde(default)]
    pub settings: PageConfiguration,
    pub margin: Option<PageMargin>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub report: ReconcileReport,
    pub tree: RenderTree,
}

/// POST /api/v1/render/reconcile
pub async fn handle_reconcile(
    State(state): State<AppState>,
    Json(req): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    req.settings.validate()?;
    let margin = req.margin.unwrap_or(state.config.default_margin());
    let mut tree = req.tree;
    let report = reconcile(Some(&mut tree), &req.settings, &margin);
    Ok(Json(ReconcileResponse { report, tree }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub tree: RenderTree,
    pub options: Option<ExportOptions>,
}

/// POST /api/v1/render/export
///
/// Responds with the PDF body. Pages that could not be captured are listed
/// in `x-pages-failed` as comma-separated page numbers.
pub async fn handle_export(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> Result<Response, AppError> {
    let options = req.options.unwrap_or_else(|| state.config.export_options());
    let artifact = export_pdf(Some(&req.tree), &options, state.capturer.as_ref()).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"resume.pdf\"".to_string(),
        ),
        (PAGES_RENDERED_HEADER, artifact.pages_rendered.to_string()),
        (PAGES_FAILED_HEADER, failed_pages(&artifact.failures)),
    ];
    Ok((StatusCode::OK, headers, artifact.pdf).into_response())
}

fn failed_pages(failures: &[PageFailure]) -> String {
    failures
        .iter()
        .map(|f| f.page_number.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Deserialize)]
pub struct PreviewRequest {
    pub tree: RenderTree,
}

/// POST /api/v1/render/export/preview
pub async fn handle_export_preview(
    Json(req): Json<PreviewRequest>,
) -> Result<Json<ExportPreview>, AppError> {
    Ok(Json(preview_info(Some(&req.tree))?))
}

// ────────────────────────────────────────────────────────────────────────────
// Mounted preview
// ────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MountResponse {
    pub scheduled: bool,
    pub settle_delay_ms: u64,
}

/// PUT /api/v1/resumes/:id/layout
pub async fn handle_mount_layout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(tree): Json<RenderTree>,
) -> Result<(StatusCode, Json<MountResponse>), AppError> {
    state.workspace.mount_layout(id, tree).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MountResponse {
            scheduled: true,
            settle_delay_ms: state.config.reconcile_settle_ms,
        }),
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshotResponse {
    pub tree: RenderTree,
    pub report: Option<ReconcileReport>,
}

/// GET /api/v1/resumes/:id/layout
pub async fn handle_get_layout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LayoutSnapshotResponse>, AppError> {
    let (tree, report) = state.workspace.layout_snapshot(id).await?;
    Ok(Json(LayoutSnapshotResponse { tree, report }))
}

/// DELETE /api/v1/resumes/:id/layout
pub async fn handle_teardown_layout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.workspace.teardown_layout(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No layout mounted for resume {id}")))
    }
}
