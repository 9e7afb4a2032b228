//! Section Model — the canonical, ordered list of resume sections.
//!
//! A section with no renderable content never reaches pagination, with one
//! exception: `personalInfo` is always included and always leads the order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PERSONAL_INFO: &str = "personalInfo";

/// Section order used when the editor has not stored a preference.
pub const DEFAULT_SECTION_ORDER: &[&str] = &[
    PERSONAL_INFO,
    "summary",
    "education",
    "workExperience",
    "projects",
    "skills",
    "certifications",
    "languages",
];

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    PersonalInfo,
    Summary,
    Education,
    WorkExperience,
    Projects,
    Skills,
    Certifications,
    Languages,
    /// User-defined module.
    Custom,
}

impl SectionKind {
    pub fn from_key(key: &str) -> Self {
        match key {
            PERSONAL_INFO => SectionKind::PersonalInfo,
            "summary" => SectionKind::Summary,
            "education" => SectionKind::Education,
            "workExperience" => SectionKind::WorkExperience,
            "projects" => SectionKind::Projects,
            "skills" => SectionKind::Skills,
            "certifications" => SectionKind::Certifications,
            "languages" => SectionKind::Languages,
            _ => SectionKind::Custom,
        }
    }

    /// Higher = harder to defer. Only ever a tie-break.
    pub fn default_priority(self) -> i32 {
        match self {
            SectionKind::PersonalInfo => 10,
            SectionKind::Summary => 9,
            SectionKind::WorkExperience => 8,
            SectionKind::Projects => 7,
            SectionKind::Education => 6,
            SectionKind::Skills => 5,
            SectionKind::Certifications => 4,
            SectionKind::Languages => 3,
            SectionKind::Custom => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub key: String,
    pub kind: SectionKind,
    pub data: Value,
    pub priority: i32,
    pub required: bool,
}

impl Section {
    pub fn new(key: &str, data: Value) -> Self {
        let kind = SectionKind::from_key(key);
        Section {
            key: key.to_string(),
            kind,
            data,
            priority: kind.default_priority(),
            required: kind == SectionKind::PersonalInfo,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Presence rules
// ────────────────────────────────────────────────────────────────────────────

/// Whether `section_key` has anything to render.
pub fn is_included(section_key: &str, resume_data: &Map<String, Value>) -> bool {
    if section_key == PERSONAL_INFO {
        return true;
    }
    resume_data.get(section_key).is_some_and(has_content)
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => fields.values().any(has_content),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ordering
// ────────────────────────────────────────────────────────────────────────────

/// Builds the included sections in display order.
///
/// `section_order` wins over everything except `personalInfo`, which is moved
/// to the front. Duplicate keys keep their first position. Custom modules that
/// exist in the data but were never placed in the order are appended, highest
/// priority first; built-in sections missing from the order stay hidden.
pub fn ordered_sections(resume_data: &Map<String, Value>, section_order: &[String]) -> Vec<Section> {
    let order: Vec<&str> = if section_order.is_empty() {
        DEFAULT_SECTION_ORDER.to_vec()
    } else {
        section_order.iter().map(String::as_str).collect()
    };

    let mut seen: HashSet<&str> = HashSet::new();
    let mut sections: Vec<Section> = order
        .iter()
        .copied()
        .filter(|key| seen.insert(*key))
        .filter(|key| is_included(key, resume_data))
        .map(|key| section_from_data(key, resume_data))
        .collect();

    let mut unplaced: Vec<Section> = resume_data
        .keys()
        .map(String::as_str)
        .filter(|key| !seen.contains(key))
        .filter(|key| SectionKind::from_key(key) == SectionKind::Custom)
        .filter(|key| is_included(key, resume_data))
        .map(|key| section_from_data(key, resume_data))
        .collect();
    unplaced.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.key.cmp(&b.key)));
    sections.extend(unplaced);

    if let Some(pos) = sections.iter().position(|s| s.key == PERSONAL_INFO) {
        let personal = sections.remove(pos);
        sections.insert(0, personal);
    }

    sections
}

fn section_from_data(key: &str, resume_data: &Map<String, Value>) -> Section {
    let data = resume_data.get(key).cloned().unwrap_or(Value::Null);
    Section::new(key, data)
}
