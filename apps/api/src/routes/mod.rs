pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::layout::handlers as layout;
use crate::render::handlers as render;
use crate::state::AppState;

/// Export payloads carry one base64 snapshot per page.
const EXPORT_BODY_LIMIT: usize = 32 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Stateless pagination
        .route("/api/v1/pagination/plan", post(layout::handle_compute_plan))
        // Per-resume page settings store
        .route("/api/v1/resumes/:id/document", put(layout::handle_put_document))
        .route("/api/v1/resumes/:id/settings", put(layout::handle_put_settings))
        .route("/api/v1/resumes/:id/plan", get(layout::handle_get_plan))
        .route("/api/v1/resumes/:id/breaks", post(layout::handle_add_break))
        .route(
            "/api/v1/resumes/:id/breaks/prune",
            post(layout::handle_prune_breaks),
        )
        .route(
            "/api/v1/resumes/:id/breaks/:section_key",
            delete(layout::handle_remove_break),
        )
        // Mounted live preview
        .route(
            "/api/v1/resumes/:id/layout",
            put(render::handle_mount_layout)
                .get(render::handle_get_layout)
                .delete(render::handle_teardown_layout),
        )
        // Render API
        .route("/api/v1/render/reconcile", post(render::handle_reconcile))
        .route(
            "/api/v1/render/export",
            post(render::handle_export).layer(DefaultBodyLimit::max(EXPORT_BODY_LIMIT)),
        )
        .route(
            "/api/v1/render/export/preview",
            post(render::handle_export_preview).layer(DefaultBodyLimit::max(EXPORT_BODY_LIMIT)),
        )
        .with_state(state)
}
