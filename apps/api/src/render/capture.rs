//! Page capture — turns one page container into a raster.
//!
//! `AppState` holds an `Arc<dyn PageCapturer>`, chosen at startup via
//! `CAPTURE_MODE`. The rasterizer awaits captures strictly one page at a time.

use async_trait::async_trait;
use base64::Engine as _;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use thiserror::Error;

use crate::render::tree::RenderNode;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("page has no snapshot attached")]
    MissingSnapshot,

    #[error("snapshot is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("snapshot could not be decoded: {0}")]
    Decode(#[from] image::ImageError),

    #[error("page has no laid-out size ({width}x{height} px)")]
    EmptyPage { width: f64, height: f64 },

    #[error("page raster of {width}x{height} px exceeds the export limit")]
    TooLarge { width: f64, height: f64 },

    #[error("capture task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait PageCapturer: Send + Sync {
    /// Rasterizes `page` at `scale` device pixels per CSS pixel.
    async fn capture(&self, page: &RenderNode, scale: f64) -> Result<RgbImage, CaptureError>;
}

/// JPEG cannot encode a side longer than this.
pub const MAX_RASTER_SIDE: u32 = 65_535;
/// Pixel budget for one page raster.
pub const MAX_RASTER_PIXELS: u64 = 50_000_000;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

// ────────────────────────────────────────────────────────────────────────────
// SnapshotCapturer
// ────────────────────────────────────────────────────────────────────────────

/// Decodes the canvas snapshot the editor attached to each page node.
pub struct SnapshotCapturer;

#[async_trait]
impl PageCapturer for SnapshotCapturer {
    async fn capture(&self, page: &RenderNode, scale: f64) -> Result<RgbImage, CaptureError> {
        let payload = page.snapshot.clone().ok_or(CaptureError::MissingSnapshot)?;
        let target = target_size(page, scale)?;
        // Decode and resample are CPU-bound.
        tokio::task::spawn_blocking(move || decode_snapshot(&payload, target)).await?
    }
}

fn decode_snapshot(payload: &str, target: Option<(u32, u32)>) -> Result<RgbImage, CaptureError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(strip_data_url(payload))?;
    let decoded = image::load_from_memory(&bytes)?;
    check_bounds(decoded.width() as f64, decoded.height() as f64)?;
    let raster = flatten_on_white(&decoded.to_rgba8());

    match target {
        Some((width, height)) if (width, height) != raster.dimensions() => {
            Ok(imageops::resize(&raster, width, height, FilterType::Triangle))
        }
        _ => Ok(raster),
    }
}

/// Accepts both bare base64 and `data:image/png;base64,...` URLs.
fn strip_data_url(payload: &str) -> &str {
    let payload = payload.trim();
    match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    }
}

/// Transparent canvas regions render as white paper.
fn flatten_on_white(rgba: &image::RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Device-pixel size of `page`, or `None` when the page carries no size.
fn target_size(page: &RenderNode, scale: f64) -> Result<Option<(u32, u32)>, CaptureError> {
    if page.width_px <= 0.0 || page.height_px <= 0.0 || !scale.is_finite() || scale <= 0.0 {
        return Ok(None);
    }
    let width = (page.width_px * scale).round().max(1.0);
    let height = (page.height_px * scale).round().max(1.0);
    check_bounds(width, height)?;
    Ok(Some((width as u32, height as u32)))
}

fn check_bounds(width: f64, height: f64) -> Result<(), CaptureError> {
    let side = MAX_RASTER_SIDE as f64;
    if !(width <= side && height <= side && width * height <= MAX_RASTER_PIXELS as f64) {
        return Err(CaptureError::TooLarge { width, height });
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// WireframeCapturer
// ────────────────────────────────────────────────────────────────────────────

/// Paints each child box as a grey block stacked top to bottom. Produces a
/// layout-accurate PDF without any browser snapshot.
pub struct WireframeCapturer;

const BLOCK_FILL: Rgb<u8> = Rgb([236, 236, 236]);
const BLOCK_EDGE: Rgb<u8> = Rgb([170, 170, 170]);
/// Gap between stacked blocks, in CSS px.
const BLOCK_GAP_PX: f64 = 4.0;

#[async_trait]
impl PageCapturer for WireframeCapturer {
    async fn capture(&self, page: &RenderNode, scale: f64) -> Result<RgbImage, CaptureError> {
        let (width, height) = target_size(page, scale)?.ok_or(CaptureError::EmptyPage {
            width: page.width_px,
            height: page.height_px,
        })?;
        let blocks: Vec<(f64, f64)> = page
            .children
            .iter()
            .map(|child| (child.width_px, child.height_px))
            .collect();
        let (page_width, page_height) = (page.width_px, page.height_px);

        let canvas = tokio::task::spawn_blocking(move || {
            paint_blocks(width, height, &blocks, page_width, page_height, scale)
        })
        .await?;
        Ok(canvas)
    }
}

/// Stacks `blocks` (CSS width, height) top to bottom on a white canvas.
fn paint_blocks(
    width: u32,
    height: u32,
    blocks: &[(f64, f64)],
    page_width: f64,
    page_height: f64,
    scale: f64,
) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, WHITE);
    let inset = (BLOCK_GAP_PX / 2.0) * scale;

    let mut y = 0.0;
    for &(block_width, block_height) in blocks {
        let block_width = if block_width > 0.0 {
            block_width.min(page_width)
        } else {
            page_width
        };
        draw_block(
            &mut canvas,
            inset,
            y * scale + inset,
            block_width * scale - 2.0 * inset,
            block_height * scale - 2.0 * inset,
        );
        y += block_height.max(0.0);
        if y >= page_height {
            break;
        }
    }
    canvas
}

fn draw_block(canvas: &mut RgbImage, x: f64, y: f64, w: f64, h: f64) {
    if w < 1.0 || h < 1.0 {
        return;
    }
    let x0 = x.max(0.0) as u32;
    let y0 = y.max(0.0) as u32;
    let x1 = ((x + w) as u32).min(canvas.width());
    let y1 = ((y + h) as u32).min(canvas.height());
    for py in y0..y1 {
        for px in x0..x1 {
            let edge = px == x0 || py == y0 || px + 1 == x1 || py + 1 == y1;
            canvas.put_pixel(px, py, if edge { BLOCK_EDGE } else { BLOCK_FILL });
        }
    }
}
