//! Height Estimator — predicts how much of a page each section will occupy.
//!
//! Costs are expressed in calibration units (CSS pixels at the editor's
//! default typography) and converted to millimetres so they compare directly
//! against `PageMargin::printable_height_mm`. This is an approximation: the
//! only guarantees are that estimates are stable for identical input and never
//! shrink when a section gains entries or text. The reconciler corrects the
//! picture with real measurements once the template has rendered.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::layout::geometry::{PageMargin, PX_PER_MM};
use crate::layout::sections::{Section, SectionKind};

// ────────────────────────────────────────────────────────────────────────────
// Calibration
// ────────────────────────────────────────────────────────────────────────────

/// Per-section cost table. Every value is a tunable, empirically chosen
/// constant; recalibrate against the template set's real typography.
/// Deserialized overrides may name only the fields they change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub personal_info: f64,
    pub summary_min: f64,
    pub summary_per_char: f64,
    pub work_experience_per_entry: f64,
    pub projects_per_entry: f64,
    pub education_per_entry: f64,
    pub skills_per_entry: f64,
    /// Skills render as a tag cloud, so they stop growing past a few rows.
    pub skills_cap: f64,
    pub certifications_per_entry: f64,
    pub languages_per_entry: f64,
    pub custom_base: f64,
    pub custom_per_entry: f64,
    /// Content width the text costs were measured at (A4 minus 10mm margins).
    pub reference_width_mm: f64,
    /// Millimetres per calibration unit.
    pub unit_to_mm: f64,
}

pub static DEFAULT_CALIBRATION: Calibration = Calibration {
    personal_info: 120.0,
    summary_min: 60.0,
    summary_per_char: 0.8,
    work_experience_per_entry: 150.0,
    projects_per_entry: 120.0,
    education_per_entry: 100.0,
    skills_per_entry: 25.0,
    skills_cap: 150.0,
    certifications_per_entry: 40.0,
    languages_per_entry: 30.0,
    custom_base: 80.0,
    custom_per_entry: 40.0,
    reference_width_mm: 190.0,
    unit_to_mm: 1.0 / PX_PER_MM,
};

impl Default for Calibration {
    fn default() -> Self {
        DEFAULT_CALIBRATION.clone()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Estimated sections
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedSection {
    #[serde(flatten)]
    pub section: Section,
    /// Millimetres, never negative.
    pub estimated_height: f64,
}

#[derive(Debug, Clone, Default)]
pub struct HeightEstimator {
    calibration: Calibration,
}

impl HeightEstimator {
    pub fn new(calibration: Calibration) -> Self {
        Self { calibration }
    }

    /// Raw cost in calibration units.
    pub fn estimate_units(&self, section: &Section, margin: &PageMargin) -> f64 {
        let c = &self.calibration;
        let data = &section.data;
        if data.is_null() {
            return 0.0;
        }

        match section.kind {
            SectionKind::PersonalInfo => c.personal_info,
            SectionKind::Summary => match data.as_str() {
                Some(text) => self.text_cost(text, margin),
                None => 0.0,
            },
            SectionKind::WorkExperience => entries(data) * c.work_experience_per_entry,
            SectionKind::Projects => entries(data) * c.projects_per_entry,
            SectionKind::Education => entries(data) * c.education_per_entry,
            SectionKind::Skills => (entries(data) * c.skills_per_entry).min(c.skills_cap),
            SectionKind::Certifications => entries(data) * c.certifications_per_entry,
            SectionKind::Languages => entries(data) * c.languages_per_entry,
            SectionKind::Custom => self.custom_cost(data, margin),
        }
    }

    /// Estimated height in millimetres.
    pub fn estimate(&self, section: &Section, margin: &PageMargin) -> f64 {
        let mm = self.estimate_units(section, margin) * self.calibration.unit_to_mm;
        sanitize_height(&section.key, mm)
    }

    pub fn estimate_sections(
        &self,
        sections: &[Section],
        margin: &PageMargin,
    ) -> Vec<EstimatedSection> {
        sections
            .iter()
            .map(|section| EstimatedSection {
                estimated_height: self.estimate(section, margin),
                section: section.clone(),
            })
            .collect()
    }

    /// Height map keyed by section key, the shape `compute_page_plan` consumes.
    pub fn heights(&self, sections: &[Section], margin: &PageMargin) -> HashMap<String, f64> {
        sections
            .iter()
            .map(|s| (s.key.clone(), self.estimate(s, margin)))
            .collect()
    }

    /// Free text grows with length and with narrower content columns.
    fn text_cost(&self, text: &str, margin: &PageMargin) -> f64 {
        let c = &self.calibration;
        let chars = text.trim().chars().count() as f64;
        if chars == 0.0 {
            return 0.0;
        }
        let width_factor = c.reference_width_mm / margin.printable_width_mm().max(1.0);
        (chars * c.summary_per_char).max(c.summary_min) * width_factor
    }

    fn custom_cost(&self, data: &Value, margin: &PageMargin) -> f64 {
        let c = &self.calibration;
        match data {
            Value::String(text) => self.text_cost(text, margin),
            Value::Array(items) => (items.len() as f64 * c.custom_per_entry).max(c.custom_base),
            Value::Object(fields) => match fields.get("items").and_then(Value::as_array) {
                Some(items) => (items.len() as f64 * c.custom_per_entry).max(c.custom_base),
                None => c.custom_base,
            },
            _ => c.custom_base,
        }
    }
}

fn entries(data: &Value) -> f64 {
    data.as_array().map_or(0.0, |items| items.len() as f64)
}

/// Replaces a non-finite or negative height with zero. Pagination proceeds
/// either way; the anomaly is only logged.
pub fn sanitize_height(section_key: &str, height: f64) -> f64 {
    if height.is_finite() && height >= 0.0 {
        height
    } else {
        warn!(section = %section_key, height, "Invalid section height estimate, treating as zero");
        0.0
    }
}
