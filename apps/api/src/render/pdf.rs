//! A4 PDF assembly from page rasters.
//!
//! Each output page carries at most one JPEG image and an optional footer line.
//! Content streams are Flate-compressed; the footer uses the standard
//! Helvetica font so nothing needs embedding.

use image::codecs::jpeg::JpegEncoder;
use image::{ImageError, RgbImage};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str};

use crate::layout::geometry::{mm_to_pt, A4_HEIGHT_MM, A4_WIDTH_MM};

pub const FOOTER_FONT_SIZE: f32 = 8.0;
pub const FOOTER_GRAY: f32 = 0.5;
/// Baseline distance from the bottom edge.
pub const FOOTER_OFFSET_MM: f64 = 5.0;

const FONT_NAME: Name<'static> = Name(b"F1");
const IMAGE_NAME: Name<'static> = Name(b"Im1");

/// A JPEG raster and where it goes on the page, measured from the top-left.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub jpeg: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PlacedImage {
    pub fn encode(
        raster: &RgbImage,
        quality: u8,
        x_mm: f64,
        y_mm: f64,
        width_mm: f64,
        height_mm: f64,
    ) -> Result<Self, ImageError> {
        Ok(PlacedImage {
            jpeg: encode_jpeg(raster, quality)?,
            pixel_width: raster.width(),
            pixel_height: raster.height(),
            x_mm,
            y_mm,
            width_mm,
            height_mm,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfPage {
    /// `None` renders a blank page.
    pub image: Option<PlacedImage>,
    pub footer: Option<String>,
}

pub fn encode_jpeg(raster: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(raster)?;
    Ok(buf)
}

/// Writes `pages` as a multi-page A4 document. An empty slice still yields a
/// valid document with zero pages.
pub fn assemble(pages: &[PdfPage]) -> Vec<u8> {
    let mut next_id = 1;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let tree_id = alloc();
    let font_id = alloc();

    let page_width = mm_to_pt(A4_WIDTH_MM);
    let page_height = mm_to_pt(A4_HEIGHT_MM);

    let mut pdf = Pdf::new();
    pdf.type1_font(font_id).base_font(Name(b"Helvetica"));

    let mut page_ids = Vec::with_capacity(pages.len());
    for page in pages {
        let page_id = alloc();
        let content_id = alloc();
        let mut content = Content::new();

        let image_id = match &page.image {
            Some(placed) => {
                let image_id = alloc();
                let mut xobj = pdf.image_xobject(image_id, &placed.jpeg);
                xobj.filter(Filter::DctDecode);
                xobj.width(placed.pixel_width as i32);
                xobj.height(placed.pixel_height as i32);
                xobj.color_space().device_rgb();
                xobj.bits_per_component(8);
                xobj.finish();

                let width = mm_to_pt(placed.width_mm);
                let height = mm_to_pt(placed.height_mm);
                let x = mm_to_pt(placed.x_mm);
                let y = page_height - mm_to_pt(placed.y_mm) - height;
                content.save_state();
                content.transform([width, 0.0, 0.0, height, x, y]);
                content.x_object(IMAGE_NAME);
                content.restore_state();
                Some(image_id)
            }
            None => None,
        };

        if let Some(text) = &page.footer {
            let x = (page_width - helvetica_width(text, FOOTER_FONT_SIZE)) / 2.0;
            content.begin_text();
            content.set_font(FONT_NAME, FOOTER_FONT_SIZE);
            content.set_fill_gray(FOOTER_GRAY);
            content.next_line(x, mm_to_pt(FOOTER_OFFSET_MM));
            content.show(Str(text.as_bytes()));
            content.end_text();
        }

        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);

        let mut pdf_page = pdf.page(page_id);
        pdf_page
            .media_box(Rect::new(0.0, 0.0, page_width, page_height))
            .parent(tree_id)
            .contents(content_id);
        {
            let mut resources = pdf_page.resources();
            resources.fonts().pair(FONT_NAME, font_id);
            if let Some(image_id) = image_id {
                resources.x_objects().pair(IMAGE_NAME, image_id);
            }
        }
        pdf_page.finish();
        page_ids.push(page_id);
    }

    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    pdf.finish()
}

/// Advance width of `text` in Helvetica, from the standard AFM metrics.
fn helvetica_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match c {
            ' ' | '/' | '.' | ',' => 278,
            // Digits, and a fair average for anything else.
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}
