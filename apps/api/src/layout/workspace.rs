//! In-memory page settings store with recompute-on-change.
//!
//! Each resume id owns its document, page configuration, margin and the plan
//! derived from them. Every mutation recomputes the plan, bumps the revision,
//! publishes it on a `watch` channel and, when a preview is mounted, schedules
//! a reconciliation of that preview.

use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::layout::estimator::HeightEstimator;
use crate::layout::geometry::PageMargin;
use crate::layout::page_fill::{compute_page_plan, PagePlan};
use crate::layout::sections::ordered_sections;
use crate::models::resume::ResumeDocument;
use crate::models::settings::PageConfiguration;
use crate::render::reconciler::ReconcileReport;
use crate::render::session::LayoutSession;
use crate::render::tree::RenderTree;

/// Ordered sections -> estimated heights -> page plan.
pub fn plan_document(
    estimator: &HeightEstimator,
    document: &ResumeDocument,
    settings: &PageConfiguration,
    margin: &PageMargin,
) -> PagePlan {
    let sections = ordered_sections(&document.resume_data, &document.section_order);
    let heights = estimator.heights(&sections, margin);
    compute_page_plan(&sections, &heights, settings, margin.printable_height_mm())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeLayout {
    pub resume_id: Uuid,
    pub document: ResumeDocument,
    pub settings: PageConfiguration,
    pub margin: PageMargin,
    pub plan: PagePlan,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

struct WorkspaceEntry {
    layout: ResumeLayout,
    revisions: watch::Sender<u64>,
    session: Option<LayoutSession>,
}

pub struct PaginationWorkspace {
    entries: RwLock<HashMap<Uuid, WorkspaceEntry>>,
    estimator: HeightEstimator,
    default_margin: PageMargin,
    settle_delay: Duration,
}

impl PaginationWorkspace {
    pub fn new(estimator: HeightEstimator, default_margin: PageMargin, settle_delay: Duration) -> Self {
        PaginationWorkspace {
            entries: RwLock::new(HashMap::new()),
            estimator,
            default_margin,
            settle_delay,
        }
    }

    pub fn estimator(&self) -> &HeightEstimator {
        &self.estimator
    }

    pub fn default_margin(&self) -> PageMargin {
        self.default_margin
    }

    pub async fn get(&self, id: Uuid) -> Option<ResumeLayout> {
        self.entries.read().await.get(&id).map(|e| e.layout.clone())
    }

    /// Receiver that observes the revision after every recompute.
    pub async fn subscribe(&self, id: Uuid) -> Option<watch::Receiver<u64>> {
        self.entries.read().await.get(&id).map(|e| e.revisions.subscribe())
    }

    // ── inputs ──────────────────────────────────────────────────────────────

    pub async fn put_document(&self, id: Uuid, document: ResumeDocument) -> Result<ResumeLayout, AppError> {
        self.update(id, true, |layout| {
            layout.document = document;
            Ok(())
        })
        .await
    }

    pub async fn put_settings(
        &self,
        id: Uuid,
        settings: PageConfiguration,
        margin: Option<PageMargin>,
    ) -> Result<ResumeLayout, AppError> {
        settings.validate()?;
        self.update(id, true, |layout| {
            layout.settings = settings;
            if let Some(margin) = margin {
                layout.margin = margin;
            }
            Ok(())
        })
        .await
    }

    pub async fn add_manual_break(&self, id: Uuid, section_key: &str) -> Result<ResumeLayout, AppError> {
        if section_key.trim().is_empty() {
            return Err(AppError::Validation("sectionKey must not be empty".into()));
        }
        self.update(id, false, |layout| {
            if !layout.settings.add_manual_break(section_key) {
                debug!(section = %section_key, "Manual break already present");
            }
            Ok(())
        })
        .await
    }

    pub async fn remove_manual_break(&self, id: Uuid, section_key: &str) -> Result<ResumeLayout, AppError> {
        self.update(id, false, |layout| {
            if layout.settings.remove_manual_break(section_key) {
                Ok(())
            } else {
                Err(AppError::NotFound(format!("No manual break after '{section_key}'")))
            }
        })
        .await
    }

    /// Drops breaks naming sections that are no longer displayed. Returns the
    /// updated layout and the removed keys.
    pub async fn prune_manual_breaks(&self, id: Uuid) -> Result<(ResumeLayout, Vec<String>), AppError> {
        let mut removed = Vec::new();
        let layout = self
            .update(id, false, |layout| {
                let displayed: Vec<String> =
                    ordered_sections(&layout.document.resume_data, &layout.document.section_order)
                        .into_iter()
                        .map(|s| s.key)
                        .collect();
                removed = layout.settings.prune_manual_breaks(&displayed);
                Ok(())
            })
            .await?;
        if !removed.is_empty() {
            info!(resume_id = %id, removed = ?removed, "Pruned stale manual breaks");
        }
        Ok((layout, removed))
    }

    // ── mounted preview ─────────────────────────────────────────────────────

    /// Mounts (or replaces) the preview tree and schedules a reconciliation
    /// with the current settings.
    pub async fn mount_layout(
        &self,
        id: Uuid,
        tree: RenderTree,
    ) -> Result<JoinHandle<Option<ReconcileReport>>, AppError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;

        let session = match entry.session.clone() {
            Some(session) => {
                session.replace_tree(tree).await;
                session
            }
            None => {
                let session = LayoutSession::mount(tree, self.settle_delay);
                entry.session = Some(session.clone());
                session
            }
        };
        Ok(session.trigger(entry.layout.settings.clone(), entry.layout.margin))
    }

    pub async fn layout_snapshot(&self, id: Uuid) -> Result<(RenderTree, Option<ReconcileReport>), AppError> {
        let session = self
            .entries
            .read()
            .await
            .get(&id)
            .and_then(|e| e.session.clone())
            .ok_or_else(|| AppError::NotFound(format!("No layout mounted for resume {id}")))?;
        Ok((session.snapshot().await, session.last_report().await))
    }

    /// Unmounts the preview. Returns `false` if nothing was mounted.
    pub async fn teardown_layout(&self, id: Uuid) -> bool {
        let session = self
            .entries
            .write()
            .await
            .get_mut(&id)
            .and_then(|e| e.session.take());
        match session {
            Some(session) => {
                session.teardown().await;
                true
            }
            None => false,
        }
    }

    // ── internals ───────────────────────────────────────────────────────────

    fn new_entry(&self, id: Uuid) -> WorkspaceEntry {
        let document = ResumeDocument::default();
        let settings = PageConfiguration::default();
        let plan = plan_document(&self.estimator, &document, &settings, &self.default_margin);
        let (revisions, _) = watch::channel(0);
        WorkspaceEntry {
            layout: ResumeLayout {
                resume_id: id,
                document,
                settings,
                margin: self.default_margin,
                plan,
                revision: 0,
                updated_at: Utc::now(),
            },
            revisions,
            session: None,
        }
    }

    async fn update<F>(&self, id: Uuid, create: bool, mutate: F) -> Result<ResumeLayout, AppError>
    where
        F: FnOnce(&mut ResumeLayout) -> Result<(), AppError>,
    {
        let mut entries = self.entries.write().await;
        let entry = match entries.entry(id) {
            MapEntry::Occupied(occupied) => occupied.into_mut(),
            MapEntry::Vacant(vacant) if create => vacant.insert(self.new_entry(id)),
            MapEntry::Vacant(_) => return Err(AppError::NotFound(format!("Resume {id} not found"))),
        };

        mutate(&mut entry.layout)?;

        let layout = &mut entry.layout;
        layout.plan = plan_document(&self.estimator, &layout.document, &layout.settings, &layout.margin);
        layout.revision += 1;
        layout.updated_at = Utc::now();
        entry.revisions.send_replace(layout.revision);

        if let Some(session) = &entry.session {
            drop(session.trigger(layout.settings.clone(), layout.margin));
        }

        debug!(
            resume_id = %id,
            revision = layout.revision,
            pages = layout.plan.pages.len(),
            "Recomputed page plan"
        );
        Ok(layout.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::PagingMode;
    use crate::render::tree::RenderNode;
    use serde_json::json;

    fn workspace() -> PaginationWorkspace {
        PaginationWorkspace::new(
            HeightEstimator::default(),
            PageMargin::default(),
            Duration::from_millis(100),
        )
    }

    fn document() -> ResumeDocument {
        serde_json::from_value(json!({
            "resumeData": {
                "personalInfo": { "name": "Ada" },
                "summary": "Engineer.",
                "workExperience": [{}, {}, {}, {}],
                "projects": [{}, {}, {}],
                "education": [{}, {}]
            },
            "sectionOrder": ["personalInfo", "summary", "workExperience", "projects", "education"]
        }))
        .unwrap()
    }

    fn settings(page_count: u8, mode: PagingMode) -> PageConfiguration {
        PageConfiguration {
            page_count,
            paging_mode: mode,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_put_document_creates_entry_and_plans() {
        let ws = workspace();
        let id = Uuid::new_v4();
        let layout = ws.put_document(id, document()).await.unwrap();
        assert_eq!(layout.revision, 1);
        assert_eq!(layout.plan.pages.len(), 1);
        assert_eq!(layout.plan.pages[0].sections[0], "personalInfo");
        assert_eq!(ws.get(id).await.unwrap().revision, 1);
    }

    #[tokio::test]
    async fn test_settings_change_recomputes_plan() {
        let ws = workspace();
        let id = Uuid::new_v4();
        ws.put_document(id, document()).await.unwrap();
        let layout = ws
            .put_settings(id, settings(2, PagingMode::Auto), None)
            .await
            .unwrap();
        assert_eq!(layout.revision, 2);
        // 120 + 60 + 600 + 360 + 200 px of content is more than one 277mm page.
        assert_eq!(layout.plan.pages.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected_without_side_effects() {
        let ws = workspace();
        let id = Uuid::new_v4();
        let err = ws.put_settings(id, settings(4, PagingMode::Auto), None).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
        assert!(ws.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_subscribers_observe_revisions() {
        let ws = workspace();
        let id = Uuid::new_v4();
        ws.put_document(id, document()).await.unwrap();
        let mut rx = ws.subscribe(id).await.unwrap();
        ws.put_settings(id, settings(3, PagingMode::Manual), Some(PageMargin::uniform(15.0)))
            .await
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 2);
    }

    #[tokio::test]
    async fn test_manual_break_lifecycle() {
        let ws = workspace();
        let id = Uuid::new_v4();
        ws.put_document(id, document()).await.unwrap();
        ws.put_settings(id, settings(3, PagingMode::Manual), None).await.unwrap();

        let layout = ws.add_manual_break(id, "summary").await.unwrap();
        assert_eq!(layout.plan.pages.len(), 2);
        assert_eq!(layout.plan.page_of_section("workExperience"), Some(2));

        let layout = ws.add_manual_break(id, "summary").await.unwrap();
        assert_eq!(layout.settings.manual_breaks, vec!["summary"]);

        let layout = ws.remove_manual_break(id, "summary").await.unwrap();
        assert_eq!(layout.plan.pages.len(), 1);

        assert!(matches!(
            ws.remove_manual_break(id, "summary").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            ws.add_manual_break(id, "  ").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ws.add_manual_break(Uuid::new_v4(), "summary").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_prune_removes_hidden_sections() {
        let ws = workspace();
        let id = Uuid::new_v4();
        ws.put_document(id, document()).await.unwrap();
        ws.put_settings(id, settings(3, PagingMode::Manual), None).await.unwrap();
        ws.add_manual_break(id, "summary").await.unwrap();
        ws.add_manual_break(id, "awards").await.unwrap();
        ws.add_manual_break(id, "skills").await.unwrap();

        let (layout, removed) = ws.prune_manual_breaks(id).await.unwrap();
        assert_eq!(removed, vec!["awards", "skills"]);
        assert_eq!(layout.settings.manual_breaks, vec!["summary"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mounted_layout_follows_settings() {
        let ws = workspace();
        let id = Uuid::new_v4();
        ws.put_document(id, document()).await.unwrap();
        ws.put_settings(id, settings(2, PagingMode::Manual), None).await.unwrap();
        ws.add_manual_break(id, "personalInfo").await.unwrap();

        let tree = RenderTree::new(RenderNode {
            children: vec![
                RenderNode::section("personalInfo", 100.0),
                RenderNode::section("summary", 100.0),
            ],
            ..Default::default()
        });
        let report = ws.mount_layout(id, tree).await.unwrap().await.unwrap().unwrap();
        assert_eq!(report.applied_breaks, vec![1]);

        let (tree, last) = ws.layout_snapshot(id).await.unwrap();
        assert_eq!(tree.break_indices(), vec![1]);
        assert_eq!(last, Some(report));

        assert!(ws.teardown_layout(id).await);
        assert!(!ws.teardown_layout(id).await);
        assert!(matches!(ws.layout_snapshot(id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mount_requires_known_resume() {
        let ws = workspace();
        let result = ws.mount_layout(Uuid::new_v4(), RenderTree::new(RenderNode::default())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
