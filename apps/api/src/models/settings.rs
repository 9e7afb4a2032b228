use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Hard cap on physical pages a resume may span.
pub const MAX_PAGE_COUNT: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagingMode {
    #[default]
    Auto,
    Manual,
}

/// Page settings owned by the resume-level settings store.
///
/// `manual_breaks` is an ordered set of section keys; a break goes immediately
/// after the named section. It is only consulted in [`PagingMode::Manual`] and
/// kept untouched in auto mode so switching modes back and forth loses nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfiguration {
    pub page_count: u8,
    #[serde(default)]
    pub paging_mode: PagingMode,
    #[serde(default)]
    pub show_page_numbers: bool,
    #[serde(default)]
    pub manual_breaks: Vec<String>,
}

impl Default for PageConfiguration {
    fn default() -> Self {
        Self {
            page_count: 1,
            paging_mode: PagingMode::Auto,
            show_page_numbers: false,
            manual_breaks: Vec::new(),
        }
    }
}

impl PageConfiguration {
    /// Rejects page counts outside `1..=3`. The count is a cap, not a hint,
    /// so silently clamping would hide a caller bug.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.page_count == 0 || self.page_count > MAX_PAGE_COUNT {
            return Err(AppError::Validation(format!(
                "pageCount must be between 1 and {MAX_PAGE_COUNT}, got {}",
                self.page_count
            )));
        }
        Ok(())
    }

    /// Manual breaks that allocation should honour right now.
    pub fn active_breaks(&self) -> &[String] {
        match self.paging_mode {
            PagingMode::Manual => &self.manual_breaks,
            PagingMode::Auto => &[],
        }
    }

    /// Returns `false` if the key was already present.
    pub fn add_manual_break(&mut self, section_key: &str) -> bool {
        if self.manual_breaks.iter().any(|k| k == section_key) {
            return false;
        }
        self.manual_breaks.push(section_key.to_string());
        true
    }

    /// Returns `false` if the key was not present.
    pub fn remove_manual_break(&mut self, section_key: &str) -> bool {
        let before = self.manual_breaks.len();
        self.manual_breaks.retain(|k| k != section_key);
        self.manual_breaks.len() != before
    }

    /// Drops breaks that reference sections no longer in `section_order`.
    /// Returns the removed keys in their original order.
    pub fn prune_manual_breaks(&mut self, section_order: &[String]) -> Vec<String> {
        let (kept, removed): (Vec<String>, Vec<String>) = self
            .manual_breaks
            .drain(..)
            .partition(|k| section_order.iter().any(|s| s == k));
        self.manual_breaks = kept;
        removed
    }
}
