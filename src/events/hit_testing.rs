//! Hit testing over the component tree
//!
//! Resolves which component claims a desktop-coordinate point. Hits are
//! resolved top-most first (later children render on top), and a
//! component only claims a point if it is active,
//! effectively visible, carries an event target, and that target's
//! [`is_hit_at`](crate::component::EventTarget::is_hit_at) accepts the
//! local position.

use crate::component::{ComponentId, ComponentTree};
use crate::geometry::Point;

/// Counters kept across hit tests, for tests and debugging
#[derive(Debug, Default, Clone)]
pub struct HitTestStats {
    /// Number of hit tests performed
    pub hit_tests: u64,
    /// Number of nodes tested in the last hit test
    pub nodes_tested: u32,
    /// Number of hits found in the last hit test
    pub hits_found: u32,
}

impl std::fmt::Display for HitTestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Hit Test Stats: {} tests, {} nodes tested, {} hits found",
            self.hit_tests, self.nodes_tested, self.hits_found
        )
    }
}

/// Hit testing engine for determining event targets from the tree
#[derive(Debug, Default)]
pub struct HitTester {
    pub stats: HitTestStats,
}

impl HitTester {
    pub fn new() -> Self {
        Self {
            stats: HitTestStats::default(),
        }
    }

    /// All components whose bounds contain `point`, top-most first.
    /// Invisible subtrees are skipped; children are clipped to their
    /// parent's bounds.
    pub fn hit_test(&mut self, tree: &ComponentTree, point: Point) -> Vec<ComponentId> {
        self.stats.hit_tests += 1;
        self.stats.nodes_tested = 0;

        let mut hits = Vec::new();
        self.collect(tree, tree.root(), Point::zero(), point, &mut hits);
        self.stats.hits_found = hits.len() as u32;
        hits
    }

    fn collect(
        &mut self,
        tree: &ComponentTree,
        id: ComponentId,
        parent_origin: Point,
        point: Point,
        hits: &mut Vec<ComponentId>,
    ) {
        let Some(node) = tree.get(id) else { return };
        self.stats.nodes_tested += 1;

        if !node.visible {
            return;
        }
        let origin = parent_origin + node.origin;
        let bounds = crate::geometry::Rect {
            origin,
            size: node.size,
        };
        if !bounds.contains_point(point) {
            return;
        }

        hits.insert(0, id);
        // front-insertion leaves the last-visited child at the head, and
        // the last child in source order renders on top
        for child in node.children() {
            self.collect(tree, *child, origin, point, hits);
        }
    }

    /// The top-most component that actually claims the point as an event
    /// target. Components without a target (or inactive ones) are
    /// transparent; the search continues below them.
    pub fn target_at(&mut self, tree: &ComponentTree, point: Point) -> Option<ComponentId> {
        let hits = self.hit_test(tree, point);
        for id in hits {
            let Some(node) = tree.get(id) else { continue };
            if !node.active {
                continue;
            }
            let Some(target) = node.target() else { continue };
            let origin = tree.absolute_origin(id)?;
            let local = point - origin;
            if target.borrow().is_hit_at(local, node.size) {
                log::trace!("hit test at {point:?} resolved to {id}");
                return Some(id);
            }
        }
        None
    }

    pub fn reset_stats(&mut self) {
        self.stats = HitTestStats::default();
    }
}
