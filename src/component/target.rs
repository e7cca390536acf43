//! Event target contract and the context threaded through dispatch
//!
//! [`EventTarget`] is the capability surface every interactive component
//! implements: hit-test claims plus the handler set the dispatch core calls
//! into. Handlers receive a [`DispatchContext`] instead of reaching for
//! global state; through it they may mutate the tree, spawn effects, and
//! request focus changes that the dispatcher applies after the call
//! returns.

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::{ComponentId, ComponentTree};
use crate::effects::EffectHandle;
use crate::events::event::{KeyCode, Modifiers, PointerButton, SpecialKey};
use crate::geometry::{Point, Size};

/// Shared, strong handle to a concrete event target.
///
/// Dispatch clones the handle before every call so a handler that destroys
/// its own component keeps itself alive for the remainder of the call.
pub type TargetHandle = Rc<RefCell<dyn EventTarget>>;

/// Transient proxy for an in-progress drag gesture, returned by
/// [`EventTarget::on_drag_start`] and owned by the dispatcher until the
/// gesture ends.
pub trait DragSurrogate {
    fn on_drag_move(&mut self, ctx: &mut DispatchContext<'_>, position: Point);

    fn on_dropped(&mut self, ctx: &mut DispatchContext<'_>, position: Point);

    /// The gesture was abandoned (focus loss or explicit cancel)
    fn on_cancel(&mut self, ctx: &mut DispatchContext<'_>) {
        let _ = ctx;
    }
}

/// The handler surface of anything that can receive events.
///
/// All handlers default to no-ops; the boolean-returning keyboard handlers
/// report whether the event was consumed so un-consumed keys can fall
/// through to the dispatcher's unhandled-key sink.
#[allow(unused_variables)]
pub trait EventTarget {
    /// Whether this target claims the given point. `local` is relative to
    /// the component origin. The default claims the whole rectangle;
    /// irregular targets (e.g. menu items with layout-dependent extents)
    /// override this.
    fn is_hit_at(&self, local: Point, size: Size) -> bool {
        local.x >= 0 && local.y >= 0 && local.x < size.width && local.y < size.height
    }

    fn on_click(&mut self, ctx: &mut DispatchContext<'_>, position: Point) {}

    fn on_double_click(&mut self, ctx: &mut DispatchContext<'_>, position: Point) {}

    /// A non-primary button press resolved to this target, delivered
    /// after the focus move. Secondary presses are how targets raise
    /// context menus.
    fn on_pointer_button(
        &mut self,
        ctx: &mut DispatchContext<'_>,
        button: PointerButton,
        position: Point,
    ) {
    }

    /// First crossing of the drag threshold. Returning a surrogate starts
    /// a drag; returning `None` leaves the gesture a held press.
    fn on_drag_start(
        &mut self,
        ctx: &mut DispatchContext<'_>,
        position: Point,
    ) -> Option<Box<dyn DragSurrogate>> {
        None
    }

    fn on_drag_move(&mut self, ctx: &mut DispatchContext<'_>, position: Point) {}

    fn on_dropped(&mut self, ctx: &mut DispatchContext<'_>, position: Point) {}

    fn on_cancel_drag(&mut self, ctx: &mut DispatchContext<'_>) {}

    fn on_key(&mut self, ctx: &mut DispatchContext<'_>, code: KeyCode, modifiers: Modifiers) -> bool {
        false
    }

    fn on_key_stroke(
        &mut self,
        ctx: &mut DispatchContext<'_>,
        code: KeyCode,
        pressed: bool,
        modifiers: Modifiers,
    ) -> bool {
        false
    }

    fn on_character(&mut self, ctx: &mut DispatchContext<'_>, ch: char, modifiers: Modifiers) -> bool {
        false
    }

    fn on_special(
        &mut self,
        ctx: &mut DispatchContext<'_>,
        key: SpecialKey,
        modifiers: Modifiers,
    ) -> bool {
        false
    }

    /// An accelerator matched this target. `direct` is true for an exact
    /// match and false when the match bubbled here from a label.
    fn on_matched_hot_key(&mut self, ctx: &mut DispatchContext<'_>, direct: bool) {}

    fn on_wheel(&mut self, ctx: &mut DispatchContext<'_>, delta: i32, position: Point) {}

    fn on_pointer_enter(&mut self, ctx: &mut DispatchContext<'_>) {}

    fn on_pointer_leave(&mut self, ctx: &mut DispatchContext<'_>) {}

    fn on_focus_gained(&mut self, ctx: &mut DispatchContext<'_>) {}

    fn on_focus_lost(&mut self, ctx: &mut DispatchContext<'_>) {}
}

/// Mutable context handed to every handler call
pub struct DispatchContext<'a> {
    /// The component this call is directed at
    pub component: ComponentId,
    pub tree: &'a mut ComponentTree,
    spawned: &'a mut Vec<EffectHandle>,
    focus_request: &'a mut Option<Option<ComponentId>>,
}

impl<'a> DispatchContext<'a> {
    pub fn new(
        component: ComponentId,
        tree: &'a mut ComponentTree,
        spawned: &'a mut Vec<EffectHandle>,
        focus_request: &'a mut Option<Option<ComponentId>>,
    ) -> Self {
        Self {
            component,
            tree,
            spawned,
            focus_request,
        }
    }

    /// Queue an effect to start on this frame's effect pass
    pub fn spawn_effect(&mut self, handle: EffectHandle) {
        self.spawned.push(handle);
    }

    /// Ask the dispatcher to move focus after this handler returns.
    /// The last request made during one call wins.
    pub fn request_focus(&mut self, target: Option<ComponentId>) {
        *self.focus_request = Some(target);
    }
}
