//! Export Rasterizer — captures the export container page by page and
//! assembles an A4 PDF.
//!
//! # Layouts
//! - Multi-page: every `.page` descendant becomes one PDF page, placed at the
//!   top-left margin at printable width. A raster taller than the printable
//!   area is cropped at the bottom, never squashed.
//! - Single page: the capture is fitted to printable width. Short content is
//!   centred vertically; tall content is sliced into printable-height bands,
//!   one PDF page each.
//!
//! A page whose capture fails is skipped or replaced by a blank page,
//! depending on [`CaptureFailurePolicy`]. The export as a whole fails only
//! when the container is detached or nothing could be captured.

use bytes::Bytes;
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::layout::geometry::PageMargin;
use crate::render::capture::{CaptureError, PageCapturer};
use crate::render::pdf::{assemble, PdfPage, PlacedImage};
use crate::render::tree::{RenderNode, RenderTree};

pub const DEFAULT_EXPORT_SCALE: f64 = 2.0;
pub const DEFAULT_EXPORT_QUALITY: u8 = 95;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureFailurePolicy {
    /// Leave the page out of the document.
    #[default]
    Skip,
    /// Keep a blank page in its place so numbering matches the preview.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    /// Device pixels per CSS pixel.
    pub scale: f64,
    /// JPEG quality, 1-100.
    pub quality: u8,
    pub margin: PageMargin,
    pub show_page_numbers: bool,
    pub failure_policy: CaptureFailurePolicy,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            scale: DEFAULT_EXPORT_SCALE,
            quality: DEFAULT_EXPORT_QUALITY,
            margin: PageMargin::default(),
            show_page_numbers: false,
            failure_policy: CaptureFailurePolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFailure {
    pub page_number: u32,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub pdf: Bytes,
    /// PDF pages written, placeholders included.
    pub pages_total: usize,
    /// PDF pages carrying a captured raster.
    pub pages_rendered: usize,
    pub failures: Vec<PageFailure>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export container is not attached")]
    DetachedContainer,

    #[error("no page could be captured ({} failed)", .failures.len())]
    NoPagesCaptured { failures: Vec<PageFailure> },

    #[error("margins leave no printable area")]
    NoPrintableArea,

    #[error("failed to encode page raster: {0}")]
    Encode(#[from] image::ImageError),

    #[error("export task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

// ────────────────────────────────────────────────────────────────────────────
// Export
// ────────────────────────────────────────────────────────────────────────────

pub async fn export_pdf(
    container: Option<&RenderTree>,
    options: &ExportOptions,
    capturer: &dyn PageCapturer,
) -> Result<ExportArtifact, ExportError> {
    let tree = container
        .filter(|t| t.attached)
        .ok_or(ExportError::DetachedContainer)?;
    let margin = options.margin;
    if margin.printable_width_mm() <= 0.0 || margin.printable_height_mm() <= 0.0 {
        return Err(ExportError::NoPrintableArea);
    }
    let scale = if options.scale.is_finite() && options.scale > 0.0 {
        options.scale
    } else {
        DEFAULT_EXPORT_SCALE
    };
    let quality = options.quality;

    let page_nodes = tree.root.page_containers();
    let mut output = PageOutput::new(options.failure_policy);

    if page_nodes.len() > 1 {
        for (i, node) in page_nodes.iter().enumerate() {
            let outcome = match capture_raster(capturer, node, scale).await {
                Ok(raster) => {
                    run_blocking(move || place_top_left(raster, &margin).encode(quality))
                        .await
                        .map_err(|e| e.to_string())
                }
                Err(e) => Err(e.to_string()),
            };
            output.push(i as u32 + 1, outcome);
        }
    } else {
        let node: &RenderNode = page_nodes.first().copied().unwrap_or(&tree.root);
        match capture_raster(capturer, node, scale).await {
            Ok(raster) => {
                let bands = run_blocking(move || Ok(slice_into_bands(raster, &margin))).await?;
                for (i, band) in bands.into_iter().enumerate() {
                    let outcome = run_blocking(move || band.encode(quality))
                        .await
                        .map_err(|e| e.to_string());
                    output.push(i as u32 + 1, outcome);
                }
            }
            Err(e) => output.push(1, Err(e.to_string())),
        }
    }

    let PageOutput {
        mut pages,
        failures,
        ..
    } = output;
    let pages_rendered = pages.iter().filter(|p| p.image.is_some()).count();
    if pages_rendered == 0 {
        return Err(ExportError::NoPagesCaptured { failures });
    }

    if options.show_page_numbers {
        let total = pages.len();
        for (i, page) in pages.iter_mut().enumerate() {
            page.footer = Some(format!("{} / {}", i + 1, total));
        }
    }

    let pages_total = pages.len();
    let pdf = run_blocking(move || Ok(assemble(&pages))).await?;
    info!(
        pages = pages_total,
        rendered = pages_rendered,
        failed = failures.len(),
        bytes = pdf.len(),
        "Exported PDF"
    );

    Ok(ExportArtifact {
        pdf: Bytes::from(pdf),
        pages_total,
        pages_rendered,
        failures,
    })
}

/// Runs CPU-bound raster work off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T, ExportError>
where
    F: FnOnce() -> Result<T, ExportError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

async fn capture_raster(
    capturer: &dyn PageCapturer,
    node: &RenderNode,
    scale: f64,
) -> Result<RgbImage, CaptureError> {
    let raster = capturer.capture(node, scale).await?;
    if raster.width() == 0 || raster.height() == 0 {
        return Err(CaptureError::EmptyPage {
            width: raster.width() as f64,
            height: raster.height() as f64,
        });
    }
    Ok(raster)
}

/// Collects PDF pages in order, applying the failure policy per page.
struct PageOutput {
    policy: CaptureFailurePolicy,
    pages: Vec<PdfPage>,
    failures: Vec<PageFailure>,
}

impl PageOutput {
    fn new(policy: CaptureFailurePolicy) -> Self {
        PageOutput {
            policy,
            pages: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn push(&mut self, page_number: u32, outcome: Result<PlacedImage, String>) {
        match outcome {
            Ok(image) => self.pages.push(PdfPage {
                image: Some(image),
                footer: None,
            }),
            Err(reason) => {
                warn!(page = page_number, error = %reason, "Page could not be rendered");
                self.failures.push(PageFailure {
                    page_number,
                    reason,
                });
                if self.policy == CaptureFailurePolicy::Placeholder {
                    self.pages.push(PdfPage::default());
                }
            }
        }
    }
}

/// A raster cut to its final extent and its position on the sheet, in mm.
struct Placement {
    raster: RgbImage,
    x_mm: f64,
    y_mm: f64,
    width_mm: f64,
    height_mm: f64,
}

impl Placement {
    fn encode(&self, quality: u8) -> Result<PlacedImage, ExportError> {
        Ok(PlacedImage::encode(
            &self.raster,
            quality,
            self.x_mm,
            self.y_mm,
            self.width_mm,
            self.height_mm,
        )?)
    }
}

/// Printable-width placement at the top-left margin, cropping what does not fit.
fn place_top_left(raster: RgbImage, margin: &PageMargin) -> Placement {
    let width_mm = margin.printable_width_mm();
    let max_height_mm = margin.printable_height_mm();
    let px_per_mm = raster.width() as f64 / width_mm;
    let natural_height_mm = raster.height() as f64 / px_per_mm;

    if natural_height_mm <= max_height_mm {
        return Placement {
            raster,
            x_mm: margin.left,
            y_mm: margin.top,
            width_mm,
            height_mm: natural_height_mm,
        };
    }

    let keep_px = ((max_height_mm * px_per_mm).floor() as u32).clamp(1, raster.height());
    Placement {
        raster: imageops::crop_imm(&raster, 0, 0, raster.width(), keep_px).to_image(),
        x_mm: margin.left,
        y_mm: margin.top,
        width_mm,
        height_mm: keep_px as f64 / px_per_mm,
    }
}

/// Single-page layout: centre if it fits, otherwise cut into page-height bands.
fn slice_into_bands(raster: RgbImage, margin: &PageMargin) -> Vec<Placement> {
    let width_mm = margin.printable_width_mm();
    let page_height_mm = margin.printable_height_mm();
    let px_per_mm = raster.width() as f64 / width_mm;
    let natural_height_mm = raster.height() as f64 / px_per_mm;

    if natural_height_mm <= page_height_mm {
        return vec![Placement {
            raster,
            x_mm: margin.left,
            y_mm: margin.top + (page_height_mm - natural_height_mm) / 2.0,
            width_mm,
            height_mm: natural_height_mm,
        }];
    }

    let band_px = ((page_height_mm * px_per_mm).floor() as u32).max(1);
    let mut bands = Vec::new();
    let mut top = 0;
    while top < raster.height() {
        let height = band_px.min(raster.height() - top);
        bands.push(Placement {
            raster: imageops::crop_imm(&raster, 0, top, raster.width(), height).to_image(),
            x_mm: margin.left,
            y_mm: margin.top,
            width_mm,
            height_mm: height as f64 / px_per_mm,
        });
        top += height;
    }
    bands
}

// ────────────────────────────────────────────────────────────────────────────
// Preview
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPreview {
    pub page_count: usize,
    pub is_multi_page: bool,
    pub estimated_size_kb: u32,
    pub recommended_quality: u8,
    pub recommended_scale: f64,
}

const BASE_SIZE_KB: u32 = 150;
const PER_PAGE_SIZE_KB: u32 = 200;

/// What an export of `container` would produce, without capturing anything.
pub fn preview_info(container: Option<&RenderTree>) -> Result<ExportPreview, ExportError> {
    let tree = container
        .filter(|t| t.attached)
        .ok_or(ExportError::DetachedContainer)?;
    let page_count = tree.root.page_containers().len().max(1);
    let is_multi_page = page_count > 1;

    Ok(ExportPreview {
        page_count,
        is_multi_page,
        estimated_size_kb: BASE_SIZE_KB + PER_PAGE_SIZE_KB * page_count as u32,
        recommended_quality: if is_multi_page { 90 } else { 95 },
        recommended_scale: if is_multi_page { 1.5 } else { 2.0 },
    })
}
