//! Component tree for the dispatch core
//!
//! Components live in an id-keyed arena. Everything that routes events —
//! hit testing, focus chains, popup stacks, hot-key scans — resolves
//! [`ComponentId`]s against the tree and re-validates them before every
//! handler call, so a component destroyed mid-dispatch is observed as a
//! dead id rather than a dangling reference.

pub mod listener;
pub mod target;

pub use listener::{ListenerId, Listeners};
pub use target::{DispatchContext, DragSurrogate, EventTarget, TargetHandle};

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geometry::{Point, Rect, Size};

/// Unique identifier of a component in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Allocate a fresh id
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors from structural tree operations
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The component id does not (or no longer does) name a live component
    #[error("component {0} not found")]
    NotFound(ComponentId),

    /// The child already belongs to another parent
    #[error("component {0} is already attached to a parent")]
    AlreadyAttached(ComponentId),

    /// Attaching would make a component its own ancestor
    #[error("attaching component {0} would create a cycle")]
    WouldCycle(ComponentId),

    /// The desktop root cannot be removed
    #[error("the root component cannot be removed")]
    CannotRemoveRoot,
}

/// Popup bookkeeping carried by popup components
#[derive(Debug, Default, Clone)]
pub struct PopupState {
    /// Set once the popup has been canceled; teardown happens on a later
    /// frame via a destroy effect, and canceling again is a no-op.
    pub destroying: bool,
}

/// One node of the component tree
pub struct ComponentNode {
    id: ComponentId,
    parent: Option<ComponentId>,
    children: Vec<ComponentId>,

    /// Origin relative to the parent
    pub origin: Point,
    pub size: Size,

    /// Inactive components do not receive input
    pub active: bool,
    /// Invisible components (and their subtrees) are skipped by hit testing
    pub visible: bool,
    /// Opacity in [0,1]; driven by fade effects
    pub alpha: f32,

    /// Whether keyboard focus traversal stops here
    pub focusable: bool,
    /// Next hop of the focus chain below this component
    pub focus_child: Option<ComponentId>,

    /// Event-consuming (modal-equivalent) windows claim all keyboard input
    /// while they hold focus
    pub event_consuming: bool,
    /// Present on popup components
    pub popup: Option<PopupState>,

    /// Accelerator character, if any
    pub hot_key: Option<char>,
    /// Whether this component is an input field (hot-key bubbling target)
    pub input_field: bool,

    target: Option<TargetHandle>,

    /// Property-change listeners, owned by the component
    pub moved: Listeners<Point>,
    pub resized: Listeners<Size>,
    pub alpha_changed: Listeners<f32>,
}

impl std::fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentNode")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("origin", &self.origin)
            .field("size", &self.size)
            .field("active", &self.active)
            .field("visible", &self.visible)
            .field("popup", &self.popup)
            .finish()
    }
}

impl ComponentNode {
    /// Create a detached node with default flags (active, visible, opaque)
    pub fn new() -> Self {
        Self {
            id: ComponentId::new(),
            parent: None,
            children: Vec::new(),
            origin: Point::zero(),
            size: Size::zero(),
            active: true,
            visible: true,
            alpha: 1.0,
            focusable: false,
            focus_child: None,
            event_consuming: false,
            popup: None,
            hot_key: None,
            input_field: false,
            target: None,
            moved: Listeners::new(),
            resized: Listeners::new(),
            alpha_changed: Listeners::new(),
        }
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.origin = bounds.origin;
        self.size = bounds.size;
        self
    }

    pub fn with_target(mut self, target: TargetHandle) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_hot_key(mut self, key: char) -> Self {
        self.hot_key = Some(key);
        self
    }

    pub fn as_input_field(mut self) -> Self {
        self.input_field = true;
        self.focusable = true;
        self
    }

    pub fn as_popup(mut self) -> Self {
        self.popup = Some(PopupState::default());
        self
    }

    pub fn as_event_consuming(mut self) -> Self {
        self.event_consuming = true;
        self
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    pub fn target(&self) -> Option<TargetHandle> {
        self.target.clone()
    }

    pub fn set_target(&mut self, target: Option<TargetHandle>) {
        self.target = target;
    }

    /// Local bounds of this node (origin relative to parent)
    pub fn bounds(&self) -> Rect {
        Rect {
            origin: self.origin,
            size: self.size,
        }
    }
}

impl Default for ComponentNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Id-keyed arena of components, rooted at the desktop
pub struct ComponentTree {
    nodes: HashMap<ComponentId, ComponentNode>,
    root: ComponentId,
}

impl std::fmt::Debug for ComponentTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentTree")
            .field("root", &self.root)
            .field("nodes", &format!("[{} components]", self.nodes.len()))
            .finish()
    }
}

impl ComponentTree {
    /// Create a tree containing only the desktop root with the given size
    pub fn new(desktop_size: Size) -> Self {
        let mut root_node = ComponentNode::new();
        root_node.size = desktop_size;
        let root = root_node.id;
        let mut nodes = HashMap::new();
        nodes.insert(root, root_node);
        Self { nodes, root }
    }

    pub fn root(&self) -> ComponentId {
        self.root
    }

    pub fn is_alive(&self, id: ComponentId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: ComponentId) -> Option<&ComponentNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut ComponentNode> {
        self.nodes.get_mut(&id)
    }

    /// Insert a detached node as the last child of `parent`
    pub fn add_child(
        &mut self,
        parent: ComponentId,
        mut node: ComponentNode,
    ) -> Result<ComponentId, TreeError> {
        if node.parent.is_some() {
            return Err(TreeError::AlreadyAttached(node.id));
        }
        if !self.nodes.contains_key(&parent) {
            return Err(TreeError::NotFound(parent));
        }
        let id = node.id;
        node.parent = Some(parent);
        self.nodes.insert(id, node);
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }
        Ok(id)
    }

    /// Re-attach an already-inserted, detached component under `parent`
    pub fn attach(&mut self, parent: ComponentId, child: ComponentId) -> Result<(), TreeError> {
        let child_node = self.nodes.get(&child).ok_or(TreeError::NotFound(child))?;
        if child_node.parent.is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        if !self.nodes.contains_key(&parent) {
            return Err(TreeError::NotFound(parent));
        }
        if parent == child || self.is_descendant_of(parent, child) {
            return Err(TreeError::WouldCycle(child));
        }
        if let Some(child_node) = self.nodes.get_mut(&child) {
            child_node.parent = Some(parent);
        }
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(child);
        }
        Ok(())
    }

    /// Detach a component from its parent, leaving it in the arena
    pub fn detach(&mut self, id: ComponentId) -> Result<(), TreeError> {
        let parent = self.nodes.get(&id).ok_or(TreeError::NotFound(id))?.parent;
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|c| *c != id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
        Ok(())
    }

    /// Remove a component and its entire subtree
    pub fn remove(&mut self, id: ComponentId) -> Result<(), TreeError> {
        if id == self.root {
            return Err(TreeError::CannotRemoveRoot);
        }
        if !self.nodes.contains_key(&id) {
            return Err(TreeError::NotFound(id));
        }
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
            }
        }
        log::trace!("removed component subtree rooted at {id}");
        Ok(())
    }

    /// Absolute origin (desktop coordinates) of a component
    pub fn absolute_origin(&self, id: ComponentId) -> Option<Point> {
        let mut origin = Point::zero();
        let mut current = Some(id);
        while let Some(cid) = current {
            let node = self.nodes.get(&cid)?;
            origin = origin + node.origin;
            current = node.parent;
        }
        Some(origin)
    }

    /// Absolute bounds (desktop coordinates) of a component
    pub fn absolute_bounds(&self, id: ComponentId) -> Option<Rect> {
        let origin = self.absolute_origin(id)?;
        let node = self.nodes.get(&id)?;
        Some(Rect {
            origin,
            size: node.size,
        })
    }

    /// Whether `id` sits in the subtree rooted at `ancestor` (inclusive)
    pub fn is_descendant_of(&self, id: ComponentId, ancestor: ComponentId) -> bool {
        let mut current = Some(id);
        while let Some(cid) = current {
            if cid == ancestor {
                return true;
            }
            current = self.nodes.get(&cid).and_then(|n| n.parent);
        }
        false
    }

    /// Ancestor chain of `id`, starting at `id` itself and ending at the root
    pub fn ancestors(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        let mut current = Some(id);
        while let Some(cid) = current {
            if !self.nodes.contains_key(&cid) {
                break;
            }
            out.push(cid);
            current = self.nodes.get(&cid).and_then(|n| n.parent);
        }
        out
    }

    /// Components in source (pre)order, the order hot-key scans use
    pub fn preorder(&self) -> Vec<ComponentId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                out.push(id);
                // push in reverse so children come out in source order
                for child in node.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        out
    }

    /// Whether the component and all its ancestors are visible
    pub fn is_effectively_visible(&self, id: ComponentId) -> bool {
        let mut current = Some(id);
        while let Some(cid) = current {
            match self.nodes.get(&cid) {
                Some(node) if node.visible => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Follow the focus chain down from `start` to the deepest link
    pub fn focus_leaf(&self, start: ComponentId) -> ComponentId {
        let mut current = start;
        loop {
            match self.nodes.get(&current).and_then(|n| n.focus_child) {
                Some(next) if self.is_alive(next) && next != current => current = next,
                _ => return current,
            }
        }
    }

    /// Set a component's origin and notify its move listeners
    pub fn set_origin(&mut self, id: ComponentId, origin: Point) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(&id).ok_or(TreeError::NotFound(id))?;
        if node.origin != origin {
            node.origin = origin;
            node.moved.notify(&origin);
        }
        Ok(())
    }

    /// Set a component's size and notify its resize listeners
    pub fn set_size(&mut self, id: ComponentId, size: Size) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(&id).ok_or(TreeError::NotFound(id))?;
        if node.size != size {
            node.size = size;
            node.resized.notify(&size);
        }
        Ok(())
    }

    /// Set a component's alpha (clamped to [0,1]) and notify listeners
    pub fn set_alpha(&mut self, id: ComponentId, alpha: f32) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(&id).ok_or(TreeError::NotFound(id))?;
        let alpha = alpha.clamp(0.0, 1.0);
        if (node.alpha - alpha).abs() > f32::EPSILON {
            node.alpha = alpha;
            node.alpha_changed.notify(&alpha);
        }
        Ok(())
    }

    /// The popup root containing `id`, if any (nearest popup ancestor)
    pub fn popup_containing(&self, id: ComponentId) -> Option<ComponentId> {
        self.ancestors(id).into_iter().find(|cid| {
            self.nodes
                .get(cid)
                .map(|n| n.popup.is_some())
                .unwrap_or(false)
        })
    }

    /// Strong handle to the component's event target, if it has one
    pub fn target(&self, id: ComponentId) -> Option<TargetHandle> {
        self.nodes.get(&id).and_then(|n| n.target.clone())
    }

    /// Focusable components in source order, used by focus traversal
    pub fn focusable_in_order(&self) -> Vec<ComponentId> {
        self.preorder()
            .into_iter()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .map(|n| n.focusable && n.active && self.is_effectively_visible(*id))
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// Convenience for wrapping a concrete target into a shared handle
pub fn target_handle<T: EventTarget + 'static>(target: T) -> TargetHandle {
    Rc::new(std::cell::RefCell::new(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_subtree() {
        let mut tree = ComponentTree::new(Size::new(800, 600));
        let root = tree.root();

        let window = tree.add_child(root, ComponentNode::new()).unwrap();
        let button = tree.add_child(window, ComponentNode::new()).unwrap();
        assert_eq!(tree.len(), 3);

        tree.remove(window).unwrap();
        assert!(!tree.is_alive(window));
        assert!(!tree.is_alive(button));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_attach_already_attached_fails() {
        let mut tree = ComponentTree::new(Size::new(100, 100));
        let root = tree.root();
        let a = tree.add_child(root, ComponentNode::new()).unwrap();
        let b = tree.add_child(root, ComponentNode::new()).unwrap();

        assert!(matches!(
            tree.attach(a, b),
            Err(TreeError::AlreadyAttached(_))
        ));

        tree.detach(b).unwrap();
        tree.attach(a, b).unwrap();
        assert!(tree.is_descendant_of(b, a));
    }

    #[test]
    fn test_attach_cycle_detected() {
        let mut tree = ComponentTree::new(Size::new(100, 100));
        let root = tree.root();
        let a = tree.add_child(root, ComponentNode::new()).unwrap();
        let b = tree.add_child(a, ComponentNode::new()).unwrap();

        tree.detach(a).unwrap();
        assert!(matches!(tree.attach(b, a), Err(TreeError::WouldCycle(_))));
    }

    #[test]
    fn test_absolute_origin_sums_chain() {
        let mut tree = ComponentTree::new(Size::new(800, 600));
        let root = tree.root();
        let window = tree
            .add_child(
                root,
                ComponentNode::new().with_bounds(Rect::new(100, 50, 300, 200)),
            )
            .unwrap();
        let button = tree
            .add_child(
                window,
                ComponentNode::new().with_bounds(Rect::new(10, 20, 80, 24)),
            )
            .unwrap();

        assert_eq!(tree.absolute_origin(button), Some(Point::new(110, 70)));
        assert_eq!(
            tree.absolute_bounds(button),
            Some(Rect::new(110, 70, 80, 24))
        );
    }

    #[test]
    fn test_preorder_is_source_order() {
        let mut tree = ComponentTree::new(Size::new(100, 100));
        let root = tree.root();
        let a = tree.add_child(root, ComponentNode::new()).unwrap();
        let a1 = tree.add_child(a, ComponentNode::new()).unwrap();
        let b = tree.add_child(root, ComponentNode::new()).unwrap();

        assert_eq!(tree.preorder(), vec![root, a, a1, b]);
    }

    #[test]
    fn test_effective_visibility() {
        let mut tree = ComponentTree::new(Size::new(100, 100));
        let root = tree.root();
        let a = tree.add_child(root, ComponentNode::new()).unwrap();
        let b = tree.add_child(a, ComponentNode::new()).unwrap();

        assert!(tree.is_effectively_visible(b));
        tree.get_mut(a).unwrap().visible = false;
        assert!(!tree.is_effectively_visible(b));
        assert!(tree.is_effectively_visible(root));
    }

    #[test]
    fn test_property_listeners_fire_on_change_only() {
        let mut tree = ComponentTree::new(Size::new(100, 100));
        let root = tree.root();
        let a = tree.add_child(root, ComponentNode::new()).unwrap();

        let moves = Rc::new(std::cell::RefCell::new(0));
        let m = moves.clone();
        tree.get_mut(a).unwrap().moved.add(move |_| {
            *m.borrow_mut() += 1;
        });

        tree.set_origin(a, Point::new(5, 5)).unwrap();
        tree.set_origin(a, Point::new(5, 5)).unwrap();
        tree.set_origin(a, Point::new(6, 5)).unwrap();
        assert_eq!(*moves.borrow(), 2);
    }

    #[test]
    fn test_popup_containing_finds_nearest() {
        let mut tree = ComponentTree::new(Size::new(100, 100));
        let root = tree.root();
        let popup = tree
            .add_child(root, ComponentNode::new().as_popup())
            .unwrap();
        let item = tree.add_child(popup, ComponentNode::new()).unwrap();
        let plain = tree.add_child(root, ComponentNode::new()).unwrap();

        assert_eq!(tree.popup_containing(item), Some(popup));
        assert_eq!(tree.popup_containing(popup), Some(popup));
        assert_eq!(tree.popup_containing(plain), None);
    }
}
