//! Page Allocator — assigns whole sections to physical pages.
//!
//! # Modes
//! - Single page (`page_count == 1`): everything on page 1, overflow clipped by the preview.
//! - Auto: greedy fill against the printable page height, capped at `page_count`.
//! - Manual: boundaries right after each configured break key, capped at `page_count`.
//!
//! Sections are never split and never reordered, except that `personalInfo`
//! always leads page 1. Content that does not fit the cap lands on the last
//! page and is reported through [`OverflowReport`]; nothing is dropped.
//!
//! [`fill_pages`] is shared with the live reconciler, which runs the same
//! greedy fill over measured DOM heights instead of estimates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::layout::estimator::sanitize_height;
use crate::layout::sections::{Section, PERSONAL_INFO};
use crate::models::settings::{PageConfiguration, PagingMode, MAX_PAGE_COUNT};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    SinglePage,
    Auto,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// 1-indexed, contiguous.
    pub page_number: u32,
    pub sections: Vec<String>,
    pub estimated_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePlan {
    pub mode: PlanMode,
    pub page_height: f64,
    pub pages: Vec<Page>,
    pub overflow: Option<OverflowReport>,
}

/// Content does not fit the configured page count. Surfaced to the editor as
/// a recommendation, never as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverflowReport {
    pub configured_pages: u8,
    pub suggested_pages: u8,
    pub total_height: f64,
    /// Pages whose estimated content exceeds the printable height.
    pub overflowing_pages: Vec<u32>,
    /// Sections that would have opened a new page but hit the cap.
    pub forced_sections: Vec<String>,
    /// Manual break keys that could not open a page because of the cap.
    pub ignored_breaks: Vec<String>,
    /// Lowest-priority sections, the first ones worth shortening.
    pub trim_candidates: Vec<String>,
    pub recommendation: String,
}

/// Result of one greedy fill pass over a sequence of heights.
#[derive(Debug, Clone, PartialEq)]
pub struct FillOutcome {
    /// Item indices that start a new page (never 0).
    pub breaks: Vec<usize>,
    /// Accumulated height per page, at least one entry.
    pub page_heights: Vec<f64>,
    /// Item indices that did not fit but had nowhere else to go.
    pub forced: Vec<usize>,
}

const MAX_TRIM_CANDIDATES: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Shared greedy fill
// ────────────────────────────────────────────────────────────────────────────

/// Greedy bin-fill of `heights` into at most `page_count` pages of `page_height`.
///
/// A new page opens before item `i` when it would push the current page past
/// `page_height`, the current page already holds something, and the cap has
/// not been reached. Once the cap is reached every remaining item stays on the
/// last page. An item taller than a page sits alone and overflows.
pub fn fill_pages(heights: &[f64], page_height: f64, page_count: u8) -> FillOutcome {
    let cap = page_count.max(1) as usize;
    let mut breaks = Vec::new();
    let mut forced = Vec::new();
    let mut page_heights = vec![0.0_f64];
    let mut items_on_page = 0usize;

    for (i, &height) in heights.iter().enumerate() {
        let current = page_heights.last().copied().unwrap_or(0.0);
        if items_on_page > 0 && current + height > page_height {
            if page_heights.len() < cap {
                breaks.push(i);
                page_heights.push(0.0);
                items_on_page = 0;
            } else {
                forced.push(i);
            }
        }
        if let Some(last) = page_heights.last_mut() {
            *last += height;
        }
        items_on_page += 1;
    }

    FillOutcome {
        breaks,
        page_heights,
        forced,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Allocation
// ────────────────────────────────────────────────────────────────────────────

/// Computes the page plan for ordered sections.
///
/// `heights` is keyed by section key and must use the same unit as
/// `page_height`. Missing or invalid heights count as zero. Pure and
/// deterministic: identical inputs always produce identical plans.
pub fn compute_page_plan(
    sections: &[Section],
    heights: &HashMap<String, f64>,
    config: &PageConfiguration,
    page_height: f64,
) -> PagePlan {
    let ordered = pin_personal_info(sections);
    let resolved: Vec<f64> = ordered
        .iter()
        .map(|s| resolve_height(&s.key, heights))
        .collect();
    let page_count = config.page_count.clamp(1, MAX_PAGE_COUNT);

    let (mode, breaks, forced, ignored_breaks) = if page_count == 1 {
        (PlanMode::SinglePage, Vec::new(), Vec::new(), Vec::new())
    } else {
        match config.paging_mode {
            PagingMode::Auto => {
                let outcome = fill_pages(&resolved, page_height, page_count);
                let forced: Vec<String> = outcome
                    .forced
                    .iter()
                    .map(|&i| ordered[i].key.clone())
                    .collect();
                (PlanMode::Auto, outcome.breaks, forced, Vec::new())
            }
            PagingMode::Manual => {
                let (breaks, ignored) =
                    manual_break_indices(&ordered, config.active_breaks(), page_count);
                (PlanMode::Manual, breaks, Vec::new(), ignored)
            }
        }
    };

    let pages = split_at_breaks(&ordered, &resolved, &breaks);
    let overflow = analyze_overflow(
        mode,
        &pages,
        &ordered,
        page_height,
        page_count,
        forced,
        ignored_breaks,
    );

    debug!(
        mode = ?mode,
        pages = pages.len(),
        overflow = overflow.is_some(),
        "Computed page plan"
    );

    PagePlan {
        mode,
        page_height,
        pages,
        overflow,
    }
}

fn pin_personal_info(sections: &[Section]) -> Vec<&Section> {
    let mut ordered: Vec<&Section> = sections.iter().collect();
    if let Some(pos) = ordered.iter().position(|s| s.key == PERSONAL_INFO) {
        let personal = ordered.remove(pos);
        ordered.insert(0, personal);
    }
    ordered
}

fn resolve_height(key: &str, heights: &HashMap<String, f64>) -> f64 {
    match heights.get(key) {
        Some(&height) => sanitize_height(key, height),
        None => {
            warn!(section = %key, "No height estimate for section, treating as zero");
            0.0
        }
    }
}

/// Maps break keys to "starts a new page" indices. A break after the last
/// section and keys that match no section are inert.
fn manual_break_indices(
    sections: &[&Section],
    manual_breaks: &[String],
    page_count: u8,
) -> (Vec<usize>, Vec<String>) {
    let mut breaks = Vec::new();
    let mut ignored = Vec::new();

    for (i, section) in sections.iter().enumerate() {
        if i + 1 >= sections.len() || !manual_breaks.iter().any(|k| *k == section.key) {
            continue;
        }
        if breaks.len() + 1 < page_count as usize {
            breaks.push(i + 1);
        } else {
            ignored.push(section.key.clone());
        }
    }

    (breaks, ignored)
}

fn split_at_breaks(sections: &[&Section], heights: &[f64], breaks: &[usize]) -> Vec<Page> {
    let mut pages = vec![Page {
        page_number: 1,
        sections: Vec::new(),
        estimated_height: 0.0,
    }];

    for (i, (section, &height)) in sections.iter().zip(heights).enumerate() {
        if breaks.contains(&i) {
            let page_number = pages.len() as u32 + 1;
            pages.push(Page {
                page_number,
                sections: Vec::new(),
                estimated_height: 0.0,
            });
        }
        if let Some(page) = pages.last_mut() {
            page.sections.push(section.key.clone());
            page.estimated_height += height;
        }
    }

    pages
}

// ────────────────────────────────────────────────────────────────────────────
// Overflow analysis
// ────────────────────────────────────────────────────────────────────────────

pub fn analyze_overflow(
    mode: PlanMode,
    pages: &[Page],
    sections: &[&Section],
    page_height: f64,
    page_count: u8,
    forced_sections: Vec<String>,
    ignored_breaks: Vec<String>,
) -> Option<OverflowReport> {
    let total_height: f64 = pages.iter().map(|p| p.estimated_height).sum();

    // Manual mode leaves overflow to the user; only the cap is reported there.
    let overflowing_pages: Vec<u32> = if mode == PlanMode::Manual {
        Vec::new()
    } else {
        pages
            .iter()
            .filter(|p| p.estimated_height > page_height)
            .map(|p| p.page_number)
            .collect()
    };

    if overflowing_pages.is_empty() && forced_sections.is_empty() && ignored_breaks.is_empty() {
        return None;
    }

    let by_height = if page_height > 0.0 {
        u8::try_from((total_height / page_height).ceil() as u64).unwrap_or(MAX_PAGE_COUNT)
    } else {
        MAX_PAGE_COUNT
    };
    let by_breaks = u8::try_from(pages.len() + ignored_breaks.len()).unwrap_or(MAX_PAGE_COUNT);
    let suggested_pages = by_height.max(by_breaks).clamp(1, MAX_PAGE_COUNT);

    let trim_candidates = trim_candidates(sections);
    let recommendation = if suggested_pages > page_count {
        format!(
            "Content exceeds {page_count} page(s); consider enabling {suggested_pages} pages to show everything"
        )
    } else if trim_candidates.is_empty() {
        format!("Content exceeds the {page_count}-page layout and will overflow the last page")
    } else {
        format!(
            "Content exceeds the {page_count}-page layout; consider shortening {}",
            trim_candidates.join(", ")
        )
    };

    Some(OverflowReport {
        configured_pages: page_count,
        suggested_pages,
        total_height,
        overflowing_pages,
        forced_sections,
        ignored_breaks,
        trim_candidates,
        recommendation,
    })
}

/// Optional sections ordered lowest priority first; among equals, the one
/// placed later in the resume comes first.
fn trim_candidates(sections: &[&Section]) -> Vec<String> {
    let mut candidates: Vec<(usize, &Section)> = sections
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| !s.required)
        .collect();
    candidates.sort_by(|(ia, a), (ib, b)| a.priority.cmp(&b.priority).then_with(|| ib.cmp(ia)));
    candidates
        .into_iter()
        .take(MAX_TRIM_CANDIDATES)
        .map(|(_, s)| s.key.clone())
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Plan queries
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStats {
    pub page_number: u32,
    pub section_count: usize,
    pub sections: Vec<String>,
    pub estimated_height: f64,
    /// Estimated height over printable height; above 1.0 means overflow.
    pub fill_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    pub total_pages: usize,
    pub pages: Vec<PageStats>,
}

impl PagePlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Section keys in page order.
    pub fn section_keys(&self) -> Vec<&str> {
        self.pages
            .iter()
            .flat_map(|p| p.sections.iter().map(String::as_str))
            .collect()
    }

    pub fn page_of_section(&self, key: &str) -> Option<u32> {
        self.pages
            .iter()
            .find(|p| p.sections.iter().any(|s| s == key))
            .map(|p| p.page_number)
    }

    pub fn stats(&self) -> PlanStats {
        PlanStats {
            total_pages: self.pages.len(),
            pages: self
                .pages
                .iter()
                .map(|p| PageStats {
                    page_number: p.page_number,
                    section_count: p.sections.len(),
                    sections: p.sections.clone(),
                    estimated_height: p.estimated_height,
                    fill_ratio: if self.page_height > 0.0 {
                        p.estimated_height / self.page_height
                    } else {
                        0.0
                    },
                })
                .collect(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: f64 = 1000.0;

    fn sections(keys: &[&str]) -> Vec<Section> {
        keys.iter().map(|k| Section::new(k, json!(["entry"]))).collect()
    }

    fn heights(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, h)| (k.to_string(), *h)).collect()
    }

    fn config(page_count: u8, mode: PagingMode, breaks: &[&str]) -> PageConfiguration {
        PageConfiguration {
            page_count,
            paging_mode: mode,
            show_page_numbers: false,
            manual_breaks: breaks.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn layout(plan: &PagePlan) -> Vec<Vec<&str>> {
        plan.pages
            .iter()
            .map(|p| p.sections.iter().map(String::as_str).collect())
            .collect()
    }

    const KEYS: &[&str] = &[
        "personalInfo",
        "summary",
        "education",
        "workExperience",
        "projects",
        "skills",
        "certifications",
        "languages",
    ];

    /// Height fixtures that exercise breaks, overflow and oversized sections.
    fn fixtures() -> Vec<HashMap<String, f64>> {
        vec![
            heights(&[("personalInfo", 120.0), ("summary", 80.0), ("education", 100.0)]),
            KEYS.iter().map(|k| (k.to_string(), 400.0)).collect(),
            KEYS.iter().map(|k| (k.to_string(), 1500.0)).collect(),
            KEYS.iter()
                .enumerate()
                .map(|(i, k)| (k.to_string(), (i as f64 * 137.0) % 900.0))
                .collect(),
        ]
    }

    // ── shared fill ─────────────────────────────────────────────────────────

    #[test]
    fn test_fill_pages_breaks_when_page_full() {
        let outcome = fill_pages(&[600.0, 300.0, 200.0, 900.0], PAGE, 3);
        assert_eq!(outcome.breaks, vec![2, 3]);
        assert_eq!(outcome.page_heights, vec![900.0, 200.0, 900.0]);
        assert!(outcome.forced.is_empty());
    }

    #[test]
    fn test_fill_pages_forces_onto_last_page_at_cap() {
        let outcome = fill_pages(&[800.0, 800.0, 800.0], PAGE, 2);
        assert_eq!(outcome.breaks, vec![1]);
        assert_eq!(outcome.forced, vec![2]);
        assert_eq!(outcome.page_heights.len(), 2);
    }

    #[test]
    fn test_fill_pages_never_breaks_before_first_item() {
        let outcome = fill_pages(&[5000.0, 10.0], PAGE, 3);
        assert_eq!(outcome.breaks, vec![1]);
        assert_eq!(outcome.page_heights, vec![5000.0, 10.0]);
    }

    #[test]
    fn test_fill_pages_empty_input_is_one_page() {
        let outcome = fill_pages(&[], PAGE, 3);
        assert!(outcome.breaks.is_empty());
        assert_eq!(outcome.page_heights, vec![0.0]);
    }

    // ── properties ──────────────────────────────────────────────────────────

    #[test]
    fn test_determinism() {
        let input = sections(KEYS);
        for h in fixtures() {
            for mode in [PagingMode::Auto, PagingMode::Manual] {
                for count in 1..=3 {
                    let cfg = config(count, mode, &["summary", "projects"]);
                    assert_eq!(
                        compute_page_plan(&input, &h, &cfg, PAGE),
                        compute_page_plan(&input, &h, &cfg, PAGE)
                    );
                }
            }
        }
    }

    #[test]
    fn test_order_preservation_and_atomicity() {
        let input = sections(KEYS);
        for h in fixtures() {
            for mode in [PagingMode::Auto, PagingMode::Manual] {
                for count in 1..=3 {
                    let cfg = config(count, mode, &["education", "skills"]);
                    let plan = compute_page_plan(&input, &h, &cfg, PAGE);
                    assert_eq!(plan.section_keys(), KEYS.to_vec());
                    for key in KEYS {
                        let hits = plan
                            .pages
                            .iter()
                            .filter(|p| p.sections.iter().any(|s| s == key))
                            .count();
                        assert_eq!(hits, 1, "{key} should be on exactly one page");
                    }
                }
            }
        }
    }

    #[test]
    fn test_page_count_bound_and_contiguous_numbering() {
        let input = sections(KEYS);
        for h in fixtures() {
            for mode in [PagingMode::Auto, PagingMode::Manual] {
                for count in 1..=3 {
                    let cfg = config(count, mode, &["personalInfo", "summary", "education", "skills"]);
                    let plan = compute_page_plan(&input, &h, &cfg, PAGE);
                    assert!(plan.page_count() <= count as usize);
                    for (i, page) in plan.pages.iter().enumerate() {
                        assert_eq!(page.page_number, i as u32 + 1);
                        assert!(!page.sections.is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn test_personal_info_anchors_page_one() {
        let input = sections(&["summary", "education", "personalInfo", "skills"]);
        let h = heights(&[("summary", 900.0), ("education", 900.0), ("personalInfo", 120.0), ("skills", 10.0)]);
        for mode in [PagingMode::Auto, PagingMode::Manual] {
            let plan = compute_page_plan(&input, &h, &config(3, mode, &["summary"]), PAGE);
            assert_eq!(plan.pages[0].sections[0], PERSONAL_INFO);
        }
    }

    #[test]
    fn test_manual_mode_fidelity() {
        let input = sections(&["personalInfo", "summary", "education", "workExperience", "skills"]);
        let h = heights(&[
            ("personalInfo", 120.0),
            ("summary", 80.0),
            ("education", 100.0),
            ("workExperience", 450.0),
            ("skills", 100.0),
        ]);
        let plan = compute_page_plan(
            &input,
            &h,
            &config(3, PagingMode::Manual, &["summary", "education"]),
            PAGE,
        );
        assert_eq!(plan.mode, PlanMode::Manual);
        assert_eq!(
            layout(&plan),
            vec![
                vec!["personalInfo", "summary"],
                vec!["education"],
                vec!["workExperience", "skills"]
            ]
        );
        assert!(plan.overflow.is_none());
    }

    #[test]
    fn test_manual_mode_ignores_heights() {
        let input = sections(&["personalInfo", "summary", "education"]);
        let h = heights(&[("personalInfo", 900.0), ("summary", 900.0), ("education", 900.0)]);
        let plan = compute_page_plan(&input, &h, &config(2, PagingMode::Manual, &[]), PAGE);
        assert_eq!(layout(&plan), vec![vec!["personalInfo", "summary", "education"]]);
        assert!(plan.overflow.is_none());
    }

    #[test]
    fn test_manual_breaks_beyond_cap_are_reported() {
        let input = sections(&["personalInfo", "summary", "education", "workExperience", "skills"]);
        let h = heights(&[]);
        let plan = compute_page_plan(
            &input,
            &h,
            &config(2, PagingMode::Manual, &["summary", "education"]),
            PAGE,
        );
        assert_eq!(
            layout(&plan),
            vec![
                vec!["personalInfo", "summary"],
                vec!["education", "workExperience", "skills"]
            ]
        );
        let overflow = plan.overflow.expect("ignored break should be reported");
        assert_eq!(overflow.ignored_breaks, vec!["education"]);
        assert_eq!(overflow.suggested_pages, 3);
    }

    #[test]
    fn test_suggested_pages_saturate_at_cap() {
        let pages = vec![Page {
            page_number: 1,
            sections: vec!["personalInfo".into()],
            estimated_height: PAGE * 300.0,
        }];
        let ignored: Vec<String> = (0..300).map(|i| format!("custom{i}")).collect();
        let overflow = analyze_overflow(PlanMode::Manual, &pages, &[], PAGE, 1, Vec::new(), ignored)
            .expect("ignored breaks are reported");
        assert_eq!(overflow.suggested_pages, MAX_PAGE_COUNT);
        assert_eq!(overflow.ignored_breaks.len(), 300);
    }

    #[test]
    fn test_stale_and_trailing_manual_breaks_are_inert() {
        let input = sections(&["personalInfo", "summary", "skills"]);
        let plan = compute_page_plan(
            &input,
            &heights(&[]),
            &config(3, PagingMode::Manual, &["awards", "skills"]),
            PAGE,
        );
        assert_eq!(layout(&plan), vec![vec!["personalInfo", "summary", "skills"]]);
        assert!(plan.overflow.is_none());
    }

    #[test]
    fn test_manual_breaks_ignored_in_auto_mode() {
        let input = sections(&["personalInfo", "summary", "skills"]);
        let h = heights(&[("personalInfo", 100.0), ("summary", 100.0), ("skills", 100.0)]);
        let plan = compute_page_plan(&input, &h, &config(3, PagingMode::Auto, &["summary"]), PAGE);
        assert_eq!(plan.page_count(), 1);
    }

    #[test]
    fn test_single_page_shortcut() {
        let input = sections(KEYS);
        let h: HashMap<String, f64> = KEYS.iter().map(|k| (k.to_string(), 700.0)).collect();
        for mode in [PagingMode::Auto, PagingMode::Manual] {
            let plan = compute_page_plan(&input, &h, &config(1, mode, &["summary"]), PAGE);
            assert_eq!(plan.mode, PlanMode::SinglePage);
            assert_eq!(plan.page_count(), 1);
            assert_eq!(plan.pages[0].sections.len(), KEYS.len());
            let overflow = plan.overflow.expect("clipped content is still reported");
            assert_eq!(overflow.overflowing_pages, vec![1]);
            assert_eq!(overflow.suggested_pages, 3);
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let input = sections(&["personalInfo", "summary", "workExperience"]);
        let mut h = heights(&[("personalInfo", 120.0), ("summary", 80.0), ("workExperience", 450.0)]);
        let cfg = config(2, PagingMode::Auto, &[]);

        let plan = compute_page_plan(&input, &h, &cfg, PAGE);
        assert_eq!(layout(&plan), vec![vec!["personalInfo", "summary", "workExperience"]]);
        assert_eq!(plan.pages[0].estimated_height, 650.0);

        let mut with_skills = input.clone();
        with_skills.push(Section::new("skills", json!(["Rust"])));
        h.insert("skills".into(), 700.0);
        let plan = compute_page_plan(&with_skills, &h, &cfg, PAGE);
        assert_eq!(
            layout(&plan),
            vec![vec!["personalInfo", "summary", "workExperience"], vec!["skills"]]
        );
        assert_eq!(plan.pages[1].estimated_height, 700.0);
        assert!(plan.overflow.is_none());
    }

    #[test]
    fn test_overflow_forced_onto_last_page() {
        let input = sections(&["personalInfo", "summary", "education", "skills"]);
        let h = heights(&[
            ("personalInfo", 600.0),
            ("summary", 600.0),
            ("education", 600.0),
            ("skills", 600.0),
        ]);
        let plan = compute_page_plan(&input, &h, &config(2, PagingMode::Auto, &[]), PAGE);
        assert_eq!(
            layout(&plan),
            vec![vec!["personalInfo"], vec!["summary", "education", "skills"]]
        );
        let overflow = plan.overflow.expect("overflow expected");
        assert_eq!(overflow.forced_sections, vec!["education", "skills"]);
        assert_eq!(overflow.overflowing_pages, vec![2]);
        assert_eq!(overflow.suggested_pages, 3);
        assert!(overflow.recommendation.contains("3 pages"));
    }

    #[test]
    fn test_oversized_section_sits_alone() {
        let input = sections(&["personalInfo", "workExperience", "skills"]);
        let h = heights(&[("personalInfo", 100.0), ("workExperience", 2500.0), ("skills", 50.0)]);
        let plan = compute_page_plan(&input, &h, &config(3, PagingMode::Auto, &[]), PAGE);
        assert_eq!(
            layout(&plan),
            vec![vec!["personalInfo"], vec!["workExperience"], vec!["skills"]]
        );
        let overflow = plan.overflow.expect("oversized page reported");
        assert_eq!(overflow.overflowing_pages, vec![2]);
        assert!(overflow.forced_sections.is_empty());
    }

    #[test]
    fn test_trim_candidates_when_already_at_max_pages() {
        let input = sections(&["personalInfo", "summary", "skills", "languages"]);
        let h = heights(&[
            ("personalInfo", 900.0),
            ("summary", 900.0),
            ("skills", 900.0),
            ("languages", 900.0),
        ]);
        let plan = compute_page_plan(&input, &h, &config(3, PagingMode::Auto, &[]), PAGE);
        let overflow = plan.overflow.expect("overflow expected");
        assert_eq!(overflow.suggested_pages, 3);
        assert_eq!(overflow.trim_candidates, vec!["languages", "skills", "summary"]);
        assert!(overflow.recommendation.contains("shortening"));
    }

    #[test]
    fn test_missing_and_invalid_heights_count_as_zero() {
        let input = sections(&["personalInfo", "summary", "skills"]);
        let h = heights(&[("personalInfo", f64::NAN), ("summary", -40.0)]);
        let plan = compute_page_plan(&input, &h, &config(2, PagingMode::Auto, &[]), PAGE);
        assert_eq!(plan.page_count(), 1);
        assert_eq!(plan.pages[0].estimated_height, 0.0);
    }

    #[test]
    fn test_empty_input_yields_one_empty_page() {
        let plan = compute_page_plan(&[], &HashMap::new(), &config(2, PagingMode::Auto, &[]), PAGE);
        assert_eq!(plan.page_count(), 1);
        assert!(plan.pages[0].sections.is_empty());
    }

    #[test]
    fn test_page_count_clamped_defensively() {
        let input = sections(KEYS);
        let h: HashMap<String, f64> = KEYS.iter().map(|k| (k.to_string(), 900.0)).collect();
        let plan = compute_page_plan(&input, &h, &config(9, PagingMode::Auto, &[]), PAGE);
        assert_eq!(plan.page_count(), MAX_PAGE_COUNT as usize);
    }

    // ── queries ─────────────────────────────────────────────────────────────

    #[test]
    fn test_page_of_section_and_stats() {
        let input = sections(&["personalInfo", "summary", "skills"]);
        let h = heights(&[("personalInfo", 500.0), ("summary", 600.0), ("skills", 100.0)]);
        let plan = compute_page_plan(&input, &h, &config(2, PagingMode::Auto, &[]), PAGE);
        assert_eq!(plan.page_of_section("personalInfo"), Some(1));
        assert_eq!(plan.page_of_section("skills"), Some(2));
        assert_eq!(plan.page_of_section("awards"), None);

        let stats = plan.stats();
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.pages[1].section_count, 2);
        assert!((stats.pages[0].fill_ratio - 0.5).abs() < 1e-9);
        assert!((stats.pages[1].fill_ratio - 0.7).abs() < 1e-9);
    }
}
