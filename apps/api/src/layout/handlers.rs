use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::layout::estimator::EstimatedSection;
use crate::layout::geometry::{container_style, ContainerStyle, PageMargin};
use crate::layout::page_fill::{compute_page_plan, PagePlan, PlanStats};
use crate::layout::sections::ordered_sections;
use crate::layout::workspace::ResumeLayout;
use crate::models::resume::ResumeDocument;
use crate::models::settings::PageConfiguration;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    #[serde(flatten)]
    pub document: ResumeDocument,
    #[serde(default)]
    pub settings: PageConfiguration,
    pub margin: Option<PageMargin>,
    /// Measured heights in millimetres, keyed by section. Overrides estimates.
    #[serde(default)]
    pub heights: HashMap<String, f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub sections: Vec<EstimatedSection>,
    pub plan: PagePlan,
    pub stats: PlanStats,
    pub container_style: ContainerStyle,
}

/// POST /api/v1/pagination/plan
pub async fn handle_compute_plan(
    State(state): State<AppState>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, AppError> {
    req.settings.validate()?;
    let margin = req.margin.unwrap_or(state.config.default_margin());

    let estimator = state.workspace.estimator();
    let sections = ordered_sections(&req.document.resume_data, &req.document.section_order);
    let estimated = estimator.estimate_sections(&sections, &margin);
    let mut heights: HashMap<String, f64> = estimated
        .iter()
        .map(|e| (e.section.key.clone(), e.estimated_height))
        .collect();
    heights.extend(req.heights);

    let plan = compute_page_plan(&sections, &heights, &req.settings, margin.printable_height_mm());
    Ok(Json(PlanResponse {
        sections: estimated,
        stats: plan.stats(),
        container_style: container_style(req.settings.page_count, &margin),
        plan,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResponse {
    #[serde(flatten)]
    pub layout: ResumeLayout,
    pub stats: PlanStats,
    pub container_style: ContainerStyle,
}

impl From<ResumeLayout> for LayoutResponse {
    fn from(layout: ResumeLayout) -> Self {
        LayoutResponse {
            stats: layout.plan.stats(),
            container_style: container_style(layout.settings.page_count, &layout.margin),
            layout,
        }
    }
}

/// PUT /api/v1/resumes/:id/document
pub async fn handle_put_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(document): Json<ResumeDocument>,
) -> Result<Json<LayoutResponse>, AppError> {
    let layout = state.workspace.put_document(id, document).await?;
    Ok(Json(layout.into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[serde(flatten)]
    pub settings: PageConfiguration,
    pub margin: Option<PageMargin>,
}

/// PUT /api/v1/resumes/:id/settings
pub async fn handle_put_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<LayoutResponse>, AppError> {
    let layout = state
        .workspace
        .put_settings(id, req.settings, req.margin)
        .await?;
    Ok(Json(layout.into()))
}

/// GET /api/v1/resumes/:id/plan
pub async fn handle_get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LayoutResponse>, AppError> {
    let layout = state
        .workspace
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;
    Ok(Json(layout.into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBreakRequest {
    pub section_key: String,
}

/// POST /api/v1/resumes/:id/breaks
pub async fn handle_add_break(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddBreakRequest>,
) -> Result<Json<LayoutResponse>, AppError> {
    let layout = state.workspace.add_manual_break(id, &req.section_key).await?;
    Ok(Json(layout.into()))
}

/// DELETE /api/v1/resumes/:id/breaks/:section_key
pub async fn handle_remove_break(
    State(state): State<AppState>,
    Path((id, section_key)): Path<(Uuid, String)>,
) -> Result<Json<LayoutResponse>, AppError> {
    let layout = state.workspace.remove_manual_break(id, &section_key).await?;
    Ok(Json(layout.into()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneResponse {
    pub removed: Vec<String>,
    #[serde(flatten)]
    pub layout: LayoutResponse,
}

/// POST /api/v1/resumes/:id/breaks/prune
pub async fn handle_prune_breaks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PruneResponse>, AppError> {
    let (layout, removed) = state.workspace.prune_manual_breaks(id).await?;
    Ok(Json(PruneResponse {
        removed,
        layout: layout.into(),
    }))
}
