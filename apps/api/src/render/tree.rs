//! Render tree posted by the editor: the measured layout of the live preview.
//!
//! The reconciler never touches a real DOM. It sees the preview container
//! through [`ElementMeasurer`] and [`ElementAnnotator`], which [`RenderTree`]
//! implements over its root's direct children.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Marker class on the first element of every page after the first.
pub const PAGE_BREAK_CLASS: &str = "page-break-before";
/// Attribute carrying the page number on the first element of pages 2..n.
pub const PAGE_NUMBER_ATTR: &str = "data-page-number";
/// Class identifying one physical page in the export container.
pub const PAGE_CONTAINER_CLASS: &str = "page";
/// Fallback attribute for the section key when `sectionKey` is not set.
pub const SECTION_KEY_ATTR: &str = "data-section";

const BREAK_STYLES: &[(&str, &str)] = &[("break-before", "page"), ("page-break-before", "always")];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_key: Option<String>,
    #[serde(default)]
    pub classes: BTreeSet<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub styles: BTreeMap<String, String>,
    /// Laid-out CSS size.
    #[serde(default)]
    pub width_px: f64,
    #[serde(default)]
    pub height_px: f64,
    #[serde(default)]
    pub children: Vec<RenderNode>,
    /// Browser canvas capture of this node, base64 or a `data:` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

impl RenderNode {
    pub fn section(key: &str, height_px: f64) -> Self {
        RenderNode {
            section_key: Some(key.to_string()),
            height_px,
            ..Default::default()
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.section_key
            .as_deref()
            .or_else(|| self.attributes.get(SECTION_KEY_ATTR).map(String::as_str))
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn has_page_break(&self) -> bool {
        self.has_class(PAGE_BREAK_CLASS)
    }

    pub fn page_number(&self) -> Option<u32> {
        self.attributes
            .get(PAGE_NUMBER_ATTR)
            .and_then(|v| v.parse().ok())
    }

    /// Every descendant with the `page` class, in document order.
    pub fn page_containers(&self) -> Vec<&RenderNode> {
        let mut pages = Vec::new();
        for child in &self.children {
            child.collect_pages(&mut pages);
        }
        pages
    }

    fn collect_pages<'a>(&'a self, out: &mut Vec<&'a RenderNode>) {
        if self.has_class(PAGE_CONTAINER_CLASS) {
            out.push(self);
        }
        for child in &self.children {
            child.collect_pages(out);
        }
    }

    fn mark_page_break(&mut self) {
        self.classes.insert(PAGE_BREAK_CLASS.to_string());
        for (property, value) in BREAK_STYLES {
            self.styles.insert(property.to_string(), value.to_string());
        }
    }

    /// Strips break markers from this node and all descendants.
    fn clear_markers(&mut self) {
        self.classes.remove(PAGE_BREAK_CLASS);
        for (property, _) in BREAK_STYLES {
            self.styles.remove(*property);
        }
        self.attributes.remove(PAGE_NUMBER_ATTR);
        for child in &mut self.children {
            child.clear_markers();
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Container abstraction
// ────────────────────────────────────────────────────────────────────────────

/// Read side of the preview container.
pub trait ElementMeasurer {
    fn is_attached(&self) -> bool;
    fn child_count(&self) -> usize;
    /// Rendered height of the child in CSS pixels.
    fn child_height_px(&self, index: usize) -> f64;
    fn child_section_key(&self, index: usize) -> Option<&str>;
}

/// Write side of the preview container.
pub trait ElementAnnotator {
    /// Removes every break marker and page number, at any depth.
    fn clear_markers(&mut self);
    fn mark_page_break(&mut self, index: usize);
    fn set_page_number(&mut self, index: usize, page_number: u32);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTree {
    /// False once the preview container has been unmounted.
    #[serde(default = "attached_by_default")]
    pub attached: bool,
    pub root: RenderNode,
}

fn attached_by_default() -> bool {
    true
}

impl RenderTree {
    pub fn new(root: RenderNode) -> Self {
        RenderTree {
            attached: true,
            root,
        }
    }

    /// Child indices currently carrying a break marker.
    pub fn break_indices(&self) -> Vec<usize> {
        self.root
            .children
            .iter()
            .enumerate()
            .filter(|(_, child)| child.has_page_break())
            .map(|(i, _)| i)
            .collect()
    }
}

impl ElementMeasurer for RenderTree {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn child_count(&self) -> usize {
        self.root.children.len()
    }

    fn child_height_px(&self, index: usize) -> f64 {
        self.root.children.get(index).map_or(0.0, |c| c.height_px)
    }

    fn child_section_key(&self, index: usize) -> Option<&str> {
        self.root.children.get(index).and_then(RenderNode::key)
    }
}

impl ElementAnnotator for RenderTree {
    fn clear_markers(&mut self) {
        self.root.clear_markers();
    }

    fn mark_page_break(&mut self, index: usize) {
        if let Some(child) = self.root.children.get_mut(index) {
            child.mark_page_break();
        }
    }

    fn set_page_number(&mut self, index: usize, page_number: u32) {
        if let Some(child) = self.root.children.get_mut(index) {
            child
                .attributes
                .insert(PAGE_NUMBER_ATTR.to_string(), page_number.to_string());
        }
    }
}
