//! A4 page geometry and unit conversions shared by estimation, reconciliation
//! and export.
//!
//! All lengths are millimetres unless the name says otherwise. Browser
//! measurements arrive as CSS pixels and are converted with the CSS reference
//! ratio (96 px per inch).

use serde::{Deserialize, Serialize};

pub const A4_WIDTH_MM: f64 = 210.0;
pub const A4_HEIGHT_MM: f64 = 297.0;

/// CSS pixels per millimetre (96 / 25.4).
pub const PX_PER_MM: f64 = 3.779_527_559_1;

/// PDF points per millimetre (72 / 25.4).
pub const PT_PER_MM: f64 = 72.0 / 25.4;

pub fn px_to_mm(px: f64) -> f64 {
    px / PX_PER_MM
}

pub fn mm_to_pt(mm: f64) -> f32 {
    (mm * PT_PER_MM) as f32
}

// ────────────────────────────────────────────────────────────────────────────
// Margins
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMargin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for PageMargin {
    fn default() -> Self {
        Self::uniform(10.0)
    }
}

impl PageMargin {
    pub fn uniform(mm: f64) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }

    /// Height of the content area on one A4 page. This is the unit every page
    /// capacity check compares against.
    pub fn printable_height_mm(&self) -> f64 {
        (A4_HEIGHT_MM - self.top - self.bottom).max(0.0)
    }

    pub fn printable_width_mm(&self) -> f64 {
        (A4_WIDTH_MM - self.left - self.right).max(0.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Preview container
// ────────────────────────────────────────────────────────────────────────────

/// Sizing the live preview container should use for a given page count.
///
/// Single-page resumes get a fixed printable height with overflow clipped;
/// multi-page resumes grow with their content but never shrink below one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStyle {
    pub width_mm: f64,
    pub height_mm: Option<f64>,
    pub min_height_mm: Option<f64>,
    pub clip_overflow: bool,
}

pub fn container_style(page_count: u8, margin: &PageMargin) -> ContainerStyle {
    let page_height = margin.printable_height_mm();
    if page_count <= 1 {
        ContainerStyle {
            width_mm: A4_WIDTH_MM,
            height_mm: Some(page_height),
            min_height_mm: None,
            clip_overflow: true,
        }
    } else {
        ContainerStyle {
            width_mm: A4_WIDTH_MM,
            height_mm: None,
            min_height_mm: Some(page_height),
            clip_overflow: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable_area_subtracts_margins() {
        let margin = PageMargin {
            top: 20.0,
            right: 15.0,
            bottom: 10.0,
            left: 15.0,
        };
        assert!((margin.printable_height_mm() - 267.0).abs() < 1e-9);
        assert!((margin.printable_width_mm() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_printable_area_never_negative() {
        let margin = PageMargin::uniform(200.0);
        assert_eq!(margin.printable_height_mm(), 0.0);
        assert_eq!(margin.printable_width_mm(), 0.0);
    }

    #[test]
    fn test_px_to_mm_uses_css_reference_ratio() {
        // 96 CSS px = 1 inch = 25.4 mm
        assert!((px_to_mm(96.0) - 25.4).abs() < 1e-6);
    }

    #[test]
    fn test_a4_width_in_points() {
        assert!((mm_to_pt(A4_WIDTH_MM) - 595.28).abs() < 0.01);
    }

    #[test]
    fn test_container_style_single_page_is_clipped() {
        let style = container_style(1, &PageMargin::default());
        assert_eq!(style.height_mm, Some(277.0));
        assert!(style.clip_overflow);
        assert_eq!(style.min_height_mm, None);
    }

    #[test]
    fn test_container_style_multi_page_grows() {
        let style = container_style(3, &PageMargin::default());
        assert_eq!(style.height_mm, None);
        assert_eq!(style.min_height_mm, Some(277.0));
        assert!(!style.clip_overflow);
    }
}
