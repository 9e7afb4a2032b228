//! Live Layout Reconciler — applies page boundaries to the rendered preview.
//!
//! Runs after the template has rendered, measures the container's direct
//! children and writes break markers (and optional page numbers) onto the
//! element that opens each page. Auto mode uses the same greedy fill as the
//! allocator, fed with measured heights. Every run starts by clearing all
//! markers, so running it twice on an unchanged container changes nothing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::layout::estimator::sanitize_height;
use crate::layout::geometry::{px_to_mm, PageMargin};
use crate::layout::page_fill::{fill_pages, PlanMode};
use crate::models::settings::{PageConfiguration, PagingMode, MAX_PAGE_COUNT};
use crate::render::tree::{ElementAnnotator, ElementMeasurer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// True when the container was absent or unmounted; nothing was touched.
    pub detached: bool,
    pub mode: PlanMode,
    /// Child indices that received a break marker, ascending.
    pub applied_breaks: Vec<usize>,
    pub page_count: usize,
    /// Measured content per page, in millimetres.
    pub page_heights_mm: Vec<f64>,
    pub overflow: Option<LayoutOverflow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOverflow {
    pub overflowing_pages: Vec<u32>,
    /// Children that had to stay on the last page because of the cap.
    pub forced_elements: Vec<usize>,
    pub ignored_breaks: Vec<String>,
}

impl ReconcileReport {
    fn detached() -> Self {
        ReconcileReport {
            detached: true,
            mode: PlanMode::SinglePage,
            applied_breaks: Vec::new(),
            page_count: 0,
            page_heights_mm: Vec::new(),
            overflow: None,
        }
    }
}

pub fn reconcile<C>(
    container: Option<&mut C>,
    config: &PageConfiguration,
    margin: &PageMargin,
) -> ReconcileReport
where
    C: ElementMeasurer + ElementAnnotator,
{
    let Some(container) = container.filter(|c| c.is_attached()) else {
        debug!("Preview container not attached, skipping reconciliation");
        return ReconcileReport::detached();
    };

    container.clear_markers();

    let page_height = margin.printable_height_mm();
    let page_count = config.page_count.clamp(1, MAX_PAGE_COUNT);
    let heights: Vec<f64> = (0..container.child_count())
        .map(|i| {
            let key = container.child_section_key(i).unwrap_or("<unkeyed>");
            sanitize_height(key, px_to_mm(container.child_height_px(i)))
        })
        .collect();

    let (mode, breaks, forced, ignored_breaks) = if page_count == 1 {
        (PlanMode::SinglePage, Vec::new(), Vec::new(), Vec::new())
    } else {
        match config.paging_mode {
            PagingMode::Auto => {
                let outcome = fill_pages(&heights, page_height, page_count);
                (PlanMode::Auto, outcome.breaks, outcome.forced, Vec::new())
            }
            PagingMode::Manual => {
                let (breaks, ignored) = manual_break_indices(&*container, config, page_count);
                (PlanMode::Manual, breaks, Vec::new(), ignored)
            }
        }
    };

    for (i, &index) in breaks.iter().enumerate() {
        container.mark_page_break(index);
        if config.show_page_numbers {
            container.set_page_number(index, i as u32 + 2);
        }
    }

    let page_heights_mm = segment_heights(&heights, &breaks);
    let overflowing_pages: Vec<u32> = if mode == PlanMode::Manual {
        Vec::new()
    } else {
        page_heights_mm
            .iter()
            .enumerate()
            .filter(|(_, h)| **h > page_height)
            .map(|(i, _)| i as u32 + 1)
            .collect()
    };
    let overflow = if overflowing_pages.is_empty() && forced.is_empty() && ignored_breaks.is_empty() {
        None
    } else {
        Some(LayoutOverflow {
            overflowing_pages,
            forced_elements: forced,
            ignored_breaks,
        })
    };

    info!(
        mode = ?mode,
        pages = page_heights_mm.len(),
        breaks = breaks.len(),
        overflow = overflow.is_some(),
        "Reconciled preview layout"
    );

    ReconcileReport {
        detached: false,
        mode,
        page_count: page_heights_mm.len(),
        applied_breaks: breaks,
        page_heights_mm,
        overflow,
    }
}

/// The element right after each named section opens a page. Keys are matched
/// against the rendered children, so a break on a hidden section is inert.
fn manual_break_indices<C: ElementMeasurer>(
    container: &C,
    config: &PageConfiguration,
    page_count: u8,
) -> (Vec<usize>, Vec<String>) {
    let active = config.active_breaks();
    let count = container.child_count();
    let mut breaks = Vec::new();
    let mut ignored = Vec::new();

    for i in 0..count.saturating_sub(1) {
        let Some(key) = container.child_section_key(i) else {
            continue;
        };
        if !active.iter().any(|k| k == key) {
            continue;
        }
        if breaks.len() + 1 < page_count as usize {
            breaks.push(i + 1);
        } else {
            ignored.push(key.to_string());
        }
    }

    (breaks, ignored)
}

fn segment_heights(heights: &[f64], breaks: &[usize]) -> Vec<f64> {
    let mut pages = vec![0.0_f64];
    for (i, &h) in heights.iter().enumerate() {
        if breaks.contains(&i) {
            pages.push(0.0);
        }
        if let Some(last) = pages.last_mut() {
            *last += h;
        }
    }
    pages
}

/// Strips every marker, break style and page number from the container.
pub fn reset<C: ElementAnnotator + ElementMeasurer>(container: Option<&mut C>) {
    if let Some(container) = container.filter(|c| c.is_attached()) {
        container.clear_markers();
    }
}

/// 1-indexed page of the child at `index`, given the applied break indices.
pub fn page_of_element(breaks: &[usize], index: usize) -> u32 {
    breaks.iter().filter(|&&b| b <= index).count() as u32 + 1
}

pub fn is_element_on_page(breaks: &[usize], index: usize, page_number: u32) -> bool {
    page_of_element(breaks, index) == page_number
}
