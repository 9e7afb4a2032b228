// Render side: live preview reconciliation and PDF export.
// The browser owns the real DOM; these modules work on the measured
// `RenderTree` it posts and on the page snapshots attached to it.

pub mod capture;
pub mod handlers;
pub mod pdf;
pub mod rasterizer;
pub mod reconciler;
pub mod session;
pub mod tree;

pub use capture::{PageCapturer, SnapshotCapturer, WireframeCapturer};
