use std::sync::Arc;

use crate::config::{CaptureMode, Config};
use crate::layout::{HeightEstimator, PaginationWorkspace};
use crate::render::{PageCapturer, SnapshotCapturer, WireframeCapturer};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Per-resume documents, page settings, plans and mounted previews.
    pub workspace: Arc<PaginationWorkspace>,
    /// Pluggable page capturer. Default: SnapshotCapturer. Swap via CAPTURE_MODE.
    pub capturer: Arc<dyn PageCapturer>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let capturer: Arc<dyn PageCapturer> = match config.capture_mode {
            CaptureMode::Snapshot => Arc::new(SnapshotCapturer),
            CaptureMode::Wireframe => Arc::new(WireframeCapturer),
        };
        let workspace = PaginationWorkspace::new(
            HeightEstimator::new(config.calibration.clone()),
            config.default_margin(),
            config.settle_delay(),
        );
        AppState {
            config,
            workspace: Arc::new(workspace),
            capturer,
        }
    }
}
