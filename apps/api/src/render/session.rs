//! A mounted preview container and its deferred reconciliation runs.
//!
//! Every input change calls [`LayoutSession::trigger`]. The run waits for the
//! settle delay (the template needs a moment to lay out) and then reconciles,
//! unless a newer trigger or a teardown arrived in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::layout::geometry::PageMargin;
use crate::models::settings::PageConfiguration;
use crate::render::reconciler::{reconcile, reset, ReconcileReport};
use crate::render::tree::RenderTree;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct LayoutSession {
    tree: Arc<Mutex<RenderTree>>,
    last_report: Arc<Mutex<Option<ReconcileReport>>>,
    generation: Arc<AtomicU64>,
    settle_delay: Duration,
}

impl LayoutSession {
    pub fn mount(tree: RenderTree, settle_delay: Duration) -> Self {
        LayoutSession {
            tree: Arc::new(Mutex::new(tree)),
            last_report: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            settle_delay,
        }
    }

    /// Schedules a reconciliation. The handle resolves to `None` when the run
    /// was superseded or torn down before it started.
    pub fn trigger(
        &self,
        config: PageConfiguration,
        margin: PageMargin,
    ) -> JoinHandle<Option<ReconcileReport>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let tree = Arc::clone(&self.tree);
        let last_report = Arc::clone(&self.last_report);
        let settle_delay = self.settle_delay;

        tokio::spawn(async move {
            tokio::time::sleep(settle_delay).await;
            if current.load(Ordering::SeqCst) != generation {
                debug!(generation, "Reconciliation superseded before it ran");
                return None;
            }

            let mut tree = tree.lock().await;
            if current.load(Ordering::SeqCst) != generation {
                debug!(generation, "Reconciliation superseded while waiting for the tree");
                return None;
            }
            let report = reconcile(Some(&mut *tree), &config, &margin);
            *last_report.lock().await = Some(report.clone());
            Some(report)
        })
    }

    /// Swaps in a freshly measured tree. Pending runs still apply, to the new tree.
    pub async fn replace_tree(&self, tree: RenderTree) {
        *self.tree.lock().await = tree;
    }

    pub async fn snapshot(&self) -> RenderTree {
        self.tree.lock().await.clone()
    }

    pub async fn last_report(&self) -> Option<ReconcileReport> {
        self.last_report.lock().await.clone()
    }

    /// Cancels pending runs and strips every marker from the tree.
    pub async fn teardown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut tree = self.tree.lock().await;
        reset(Some(&mut *tree));
        *self.last_report.lock().await = None;
        debug!("Layout session torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::geometry::PX_PER_MM;
    use crate::models::settings::PagingMode;
    use crate::render::tree::RenderNode;

    fn tall_tree() -> RenderTree {
        RenderTree::new(RenderNode {
            children: vec![
                RenderNode::section("personalInfo", 200.0 * PX_PER_MM),
                RenderNode::section("summary", 200.0 * PX_PER_MM),
            ],
            ..Default::default()
        })
    }

    fn two_pages() -> PageConfiguration {
        PageConfiguration {
            page_count: 2,
            paging_mode: PagingMode::Auto,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_runs_after_settle_delay() {
        let session = LayoutSession::mount(tall_tree(), DEFAULT_SETTLE_DELAY);
        let report = session
            .trigger(two_pages(), PageMargin::default())
            .await
            .unwrap()
            .expect("run should not be superseded");
        assert_eq!(report.applied_breaks, vec![1]);
        assert_eq!(session.snapshot().await.break_indices(), vec![1]);
        assert_eq!(session.last_report().await, Some(report));
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_trigger_supersedes_older() {
        let session = LayoutSession::mount(tall_tree(), DEFAULT_SETTLE_DELAY);
        let first = session.trigger(two_pages(), PageMargin::default());
        let second = session.trigger(PageConfiguration::default(), PageMargin::default());

        assert_eq!(first.await.unwrap(), None);
        let report = second.await.unwrap().expect("latest trigger runs");
        assert!(report.applied_breaks.is_empty());
        assert!(session.snapshot().await.break_indices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_pending_and_resets() {
        let session = LayoutSession::mount(tall_tree(), DEFAULT_SETTLE_DELAY);
        session
            .trigger(two_pages(), PageMargin::default())
            .await
            .unwrap();
        assert_eq!(session.snapshot().await.break_indices(), vec![1]);

        let pending = session.trigger(two_pages(), PageMargin::default());
        session.teardown().await;
        assert_eq!(pending.await.unwrap(), None);
        assert!(session.snapshot().await.break_indices().is_empty());
        assert_eq!(session.last_report().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_tree_is_reconciled() {
        let session = LayoutSession::mount(RenderTree::new(RenderNode::default()), DEFAULT_SETTLE_DELAY);
        session.replace_tree(tall_tree()).await;
        let report = session
            .trigger(two_pages(), PageMargin::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.page_count, 2);
    }
}
