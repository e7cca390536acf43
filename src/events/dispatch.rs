//! Event routing core
//!
//! The [`Dispatcher`] decides, for every input event, which single target
//! receives it: keyboard events walk the focus chain under modal/popup
//! scoping, pointer events hit-test from the desktop root, hot keys scan
//! accelerators in source order, and wheel events follow the pointer
//! rather than focus. It also owns the press/click/drag/double-click
//! gesture machine and the popup stack with its cancel-on-focus-loss
//! rule.

use serde::{Deserialize, Serialize};

use crate::component::{ComponentId, ComponentTree, DispatchContext, DragSurrogate, EventTarget};
use crate::effects::{DestroyEffect, EffectHandle};
use crate::events::event::{InputEvent, Modifiers, PointerButton, SpecialKey};
use crate::events::hit_testing::HitTester;
use crate::geometry::Point;

/// Tunable dispatch thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Pointer travel (in either axis, from the press position) before a
    /// held press becomes a drag
    pub drag_start_distance: i32,
    /// Two clicks on the same target within this window make a double click
    pub double_click_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            drag_start_distance: 5,
            double_click_ms: 400,
        }
    }
}

/// Callback for keyboard events no target consumed.
///
/// Un-consumed keys still drive external accounting (e.g. game-style
/// event counters) instead of vanishing.
pub trait UnhandledKeySink {
    fn on_unhandled_key(&mut self, event: &InputEvent);
}

/// State of the current press gesture; reset at gesture boundaries
/// (release, cancel, focus loss)
#[derive(Default)]
struct GestureState {
    press_target: Option<ComponentId>,
    press_position: Point,
    /// The drag threshold fires `on_drag_start` at most once per gesture
    drag_tested: bool,
    surrogate: Option<Box<dyn DragSurrogate>>,
}

/// Routes queued input events to live targets
pub struct Dispatcher {
    config: DispatchConfig,
    hit_tester: HitTester,

    focus: Option<ComponentId>,
    hover: Option<ComponentId>,
    /// Open popups, bottom-most first
    popup_stack: Vec<ComponentId>,

    gesture: GestureState,
    last_click: Option<(ComponentId, u64)>,

    /// Effects spawned from handlers during dispatch; drained by the
    /// runtime into the scheduler
    spawned: Vec<EffectHandle>,
    sink: Option<Box<dyn UnhandledKeySink>>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            hit_tester: HitTester::new(),
            focus: None,
            hover: None,
            popup_stack: Vec::new(),
            gesture: GestureState::default(),
            last_click: None,
            spawned: Vec::new(),
            sink: None,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn focus(&self) -> Option<ComponentId> {
        self.focus
    }

    pub fn hover(&self) -> Option<ComponentId> {
        self.hover
    }

    pub fn set_unhandled_key_sink(&mut self, sink: Box<dyn UnhandledKeySink>) {
        self.sink = Some(sink);
    }

    /// Register an opened popup at the top of the stack
    pub fn track_popup(&mut self, id: ComponentId) {
        if !self.popup_stack.contains(&id) {
            self.popup_stack.push(id);
        }
    }

    /// Effects spawned by handlers since the last drain
    pub fn take_spawned(&mut self) -> Vec<EffectHandle> {
        std::mem::take(&mut self.spawned)
    }

    /// Route one event. `now_ms` is the frame clock used for the
    /// double-click window.
    pub fn dispatch(&mut self, tree: &mut ComponentTree, event: InputEvent, now_ms: u64) {
        self.prune(tree);
        log::trace!("dispatch {} event", event.kind());

        match event.clone() {
            InputEvent::Key {
                code,
                repeats,
                modifiers,
            } => {
                // repeats fan out into that many handler calls
                for _ in 0..repeats.max(1) {
                    let consumed =
                        self.dispatch_keyboard(tree, &|t, ctx| t.on_key(ctx, code, modifiers));
                    if !consumed {
                        self.sink_unhandled(&event);
                    }
                }
            }
            InputEvent::Character { ch, modifiers } => {
                if !self.dispatch_keyboard(tree, &|t, ctx| t.on_character(ctx, ch, modifiers)) {
                    self.sink_unhandled(&event);
                }
            }
            InputEvent::Special { key, modifiers } => {
                if !self.dispatch_keyboard(tree, &|t, ctx| t.on_special(ctx, key, modifiers)) {
                    // an unconsumed Tab drives focus traversal
                    if key == SpecialKey::Tab {
                        if modifiers.contains(Modifiers::OPTION_1) {
                            self.focus_prev(tree);
                        } else {
                            self.focus_next(tree);
                        }
                    } else {
                        self.sink_unhandled(&event);
                    }
                }
            }
            InputEvent::KeyStroke {
                code,
                pressed,
                modifiers,
            } => {
                let consumed = self
                    .dispatch_keyboard(tree, &|t, ctx| t.on_key_stroke(ctx, code, pressed, modifiers));
                if !consumed {
                    self.sink_unhandled(&event);
                }
            }
            InputEvent::HotKey { ch, .. } => {
                if !self.dispatch_hot_key(tree, ch) {
                    self.sink_unhandled(&event);
                }
            }
            InputEvent::PointerButton {
                button: PointerButton::Primary,
                pressed,
                position,
                ..
            } => {
                if pressed {
                    self.primary_press(tree, position);
                } else {
                    self.primary_release(tree, position, now_ms);
                }
            }
            InputEvent::PointerButton {
                button,
                pressed,
                position,
                ..
            } => {
                // secondary/middle presses move focus, then reach the
                // hit target so it can raise a context menu
                if pressed {
                    let hit = self.hit_tester.target_at(tree, position);
                    self.set_focus(tree, hit);
                    if let Some(hit) = hit {
                        self.with_target(tree, hit, |t, ctx| {
                            t.on_pointer_button(ctx, button, position)
                        });
                    }
                }
            }
            InputEvent::PointerMove { position, .. } => {
                self.pointer_move(tree, position);
            }
            InputEvent::PointerWheel {
                delta, position, ..
            } => {
                // wheel bypasses focus and follows the pointer
                if let Some(hit) = self.hit_tester.target_at(tree, position) {
                    self.with_target(tree, hit, |t, ctx| t.on_wheel(ctx, delta, position));
                }
            }
        }
    }

    /// Move keyboard focus. The target is resolved down its focus chain
    /// first; an unchanged focus is a no-op. A real change cancels any
    /// in-flight gesture, notifies both sides, and runs the popup
    /// auto-dismiss rule.
    pub fn set_focus(&mut self, tree: &mut ComponentTree, target: Option<ComponentId>) {
        let new = match target {
            Some(id) if tree.is_alive(id) => Some(tree.focus_leaf(id)),
            _ => None,
        };
        if new == self.focus {
            return;
        }
        log::debug!("focus {:?} -> {:?}", self.focus, new);

        self.cancel_gesture(tree);
        let old = self.focus;
        self.focus = new;

        if let Some(old) = old {
            self.with_target(tree, old, |t, ctx| t.on_focus_lost(ctx));
        }
        if let Some(new) = new {
            self.with_target(tree, new, |t, ctx| t.on_focus_gained(ctx));
        }
        self.dismiss_popups_for_focus(tree);
    }

    /// Move focus to the next focusable component in source order,
    /// wrapping around. Traversal stays inside the keyboard scope.
    pub fn focus_next(&mut self, tree: &mut ComponentTree) {
        self.traverse_focus(tree, false);
    }

    /// Move focus to the previous focusable component in source order
    pub fn focus_prev(&mut self, tree: &mut ComponentTree) {
        self.traverse_focus(tree, true);
    }

    fn traverse_focus(&mut self, tree: &mut ComponentTree, backwards: bool) {
        let scope = self.keyboard_scope(tree);
        let mut order: Vec<ComponentId> = tree
            .focusable_in_order()
            .into_iter()
            .filter(|&id| match scope {
                Some(s) => id == s || tree.is_descendant_of(id, s),
                None => true,
            })
            .collect();
        if order.is_empty() {
            return;
        }
        if backwards {
            order.reverse();
        }
        let next = match self
            .focus
            .and_then(|f| order.iter().position(|&id| id == f))
        {
            Some(pos) => order[(pos + 1) % order.len()],
            None => order[0],
        };
        self.set_focus(tree, Some(next));
    }

    /// Cancel a popup: mark it destroying and schedule the deferred
    /// teardown. Canceling an already-destroying popup is a no-op.
    pub fn cancel_popup(&mut self, tree: &mut ComponentTree, id: ComponentId) {
        let Some(state) = tree.get_mut(id).and_then(|n| n.popup.as_mut()) else {
            return;
        };
        if state.destroying {
            return;
        }
        state.destroying = true;
        log::debug!("popup {id} canceled");
        self.spawned.push(EffectHandle::new(DestroyEffect::new(id)));
    }

    // ---- pointer gesture machine ----

    fn primary_press(&mut self, tree: &mut ComponentTree, position: Point) {
        let hit = self.hit_tester.target_at(tree, position);
        // focus first: a press outside every popup dismisses them before
        // the gesture starts
        self.set_focus(tree, hit);
        self.gesture = GestureState {
            press_target: hit,
            press_position: position,
            drag_tested: false,
            surrogate: None,
        };
    }

    fn pointer_move(&mut self, tree: &mut ComponentTree, position: Point) {
        let hit = self.hit_tester.target_at(tree, position);
        if hit != self.hover {
            if let Some(old) = self.hover {
                self.with_target(tree, old, |t, ctx| t.on_pointer_leave(ctx));
            }
            if let Some(new) = hit {
                self.with_target(tree, new, |t, ctx| t.on_pointer_enter(ctx));
            }
            self.hover = hit;
        }

        let Some(press) = self.gesture.press_target else {
            return;
        };
        if !tree.is_alive(press) {
            self.gesture = GestureState::default();
            return;
        }

        if !self.gesture.drag_tested {
            // a held press becomes a drag only past the threshold, tested
            // per axis against the press position
            if position.axis_distance(self.gesture.press_position) >= self.config.drag_start_distance
            {
                self.gesture.drag_tested = true;
                let surrogate = self
                    .with_target(tree, press, |t, ctx| t.on_drag_start(ctx, position))
                    .flatten();
                self.gesture.surrogate = surrogate;
            }
        } else if self.gesture.surrogate.is_some() {
            // moves feed both the surrogate and the original target
            self.call_surrogate(tree, press, |s, ctx| s.on_drag_move(ctx, position));
            self.with_target(tree, press, |t, ctx| t.on_drag_move(ctx, position));
        }
    }

    fn primary_release(&mut self, tree: &mut ComponentTree, position: Point, now_ms: u64) {
        let Some(press) = self.gesture.press_target else {
            return;
        };

        if self.gesture.surrogate.is_some() {
            self.call_surrogate(tree, press, |s, ctx| s.on_dropped(ctx, position));
            self.with_target(tree, press, |t, ctx| t.on_dropped(ctx, position));
            self.gesture = GestureState::default();
            return;
        }

        // no surrogate took over: a release still over the press target is
        // a click (or, within the window, a double click)
        self.gesture = GestureState::default();
        if self.hit_tester.target_at(tree, position) != Some(press) {
            return;
        }
        let double = matches!(
            self.last_click,
            Some((prev, at)) if prev == press && now_ms.saturating_sub(at) <= self.config.double_click_ms
        );
        if double {
            self.last_click = None;
            self.with_target(tree, press, |t, ctx| t.on_double_click(ctx, position));
        } else {
            self.last_click = Some((press, now_ms));
            self.with_target(tree, press, |t, ctx| t.on_click(ctx, position));
        }
    }

    /// Abandon the current gesture, delivering the cancel pair if a drag
    /// was in progress
    fn cancel_gesture(&mut self, tree: &mut ComponentTree) {
        let gesture = std::mem::take(&mut self.gesture);
        let Some(press) = gesture.press_target else {
            return;
        };
        if let Some(mut surrogate) = gesture.surrogate {
            let mut request = None;
            {
                let mut ctx = DispatchContext::new(press, tree, &mut self.spawned, &mut request);
                surrogate.on_cancel(&mut ctx);
            }
            // focus requests from a dying gesture are dropped
            self.with_target(tree, press, |t, ctx| t.on_cancel_drag(ctx));
        }
    }

    // ---- keyboard routing ----

    /// The hard keyboard scope: the nearest popup or event-consuming
    /// ancestor of the focus, if any. Keyboard input never escapes it.
    fn keyboard_scope(&self, tree: &ComponentTree) -> Option<ComponentId> {
        let focus = self.focus?;
        for id in tree.ancestors(focus) {
            let node = tree.get(id)?;
            if node.event_consuming || node.popup.is_some() {
                return Some(id);
            }
        }
        None
    }

    /// Deliver a keyboard event to the focus leaf, bubbling up the
    /// ancestor chain until consumed or the scope boundary is reached.
    fn dispatch_keyboard(
        &mut self,
        tree: &mut ComponentTree,
        call: &dyn Fn(&mut dyn EventTarget, &mut DispatchContext<'_>) -> bool,
    ) -> bool {
        let Some(focus) = self.focus else {
            return false;
        };
        if !tree.is_alive(focus) {
            self.focus = None;
            return false;
        }

        let mut chain = tree.ancestors(focus);
        if let Some(scope) = self.keyboard_scope(tree) {
            if let Some(pos) = chain.iter().position(|&id| id == scope) {
                chain.truncate(pos + 1);
            }
        }
        for id in chain {
            if self.with_target(tree, id, |t, ctx| call(t, ctx)) == Some(true) {
                return true;
            }
        }
        false
    }

    /// Match an accelerator in source order. A match on an input field is
    /// delivered directly; a match on anything else bubbles to the next
    /// input field in source order, which must be active to receive it.
    fn dispatch_hot_key(&mut self, tree: &mut ComponentTree, ch: char) -> bool {
        let scope = self.keyboard_scope(tree);
        let order: Vec<ComponentId> = tree
            .preorder()
            .into_iter()
            .filter(|&id| match scope {
                Some(s) => id == s || tree.is_descendant_of(id, s),
                None => true,
            })
            .collect();

        let matches_key = |id: ComponentId| {
            tree.get(id)
                .and_then(|n| n.hot_key)
                .is_some_and(|k| k.eq_ignore_ascii_case(&ch))
        };
        let Some(pos) = order.iter().position(|&id| {
            matches_key(id)
                && tree.is_effectively_visible(id)
                && tree.get(id).is_some_and(|n| n.active)
        }) else {
            return false;
        };

        let matched = order[pos];
        if tree.get(matched).is_some_and(|n| n.input_field) {
            self.with_target(tree, matched, |t, ctx| t.on_matched_hot_key(ctx, true));
            return true;
        }
        for &id in &order[pos + 1..] {
            let Some(node) = tree.get(id) else { continue };
            if node.input_field {
                if node.active && tree.is_effectively_visible(id) {
                    self.with_target(tree, id, |t, ctx| t.on_matched_hot_key(ctx, false));
                    return true;
                }
                // the bubble stops at the first input field; an inactive
                // one swallows the match
                return false;
            }
        }
        false
    }

    fn sink_unhandled(&mut self, event: &InputEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink.on_unhandled_key(event);
        }
    }

    // ---- popup stack ----

    /// Cancel every popup above the one containing the new focus; if no
    /// popup contains it, cancel all of them.
    fn dismiss_popups_for_focus(&mut self, tree: &mut ComponentTree) {
        let keep = self.focus.and_then(|f| {
            self.popup_stack
                .iter()
                .rposition(|&p| p == f || tree.is_descendant_of(f, p))
        });
        let cutoff = match keep {
            Some(index) => index + 1,
            None => 0,
        };
        let above: Vec<ComponentId> = self.popup_stack[cutoff..].to_vec();
        for id in above {
            self.cancel_popup(tree, id);
        }
    }

    /// Drop dead ids from the dispatcher's transient state
    fn prune(&mut self, tree: &ComponentTree) {
        self.popup_stack.retain(|&id| tree.is_alive(id));
        if self.focus.is_some_and(|id| !tree.is_alive(id)) {
            self.focus = None;
        }
        if self.hover.is_some_and(|id| !tree.is_alive(id)) {
            self.hover = None;
        }
    }

    // ---- call plumbing ----

    /// Invoke one handler on a live, active target. The target handle is
    /// cloned for the duration of the call, so a handler destroying its
    /// own component stays alive until it returns; focus requests made
    /// during the call are applied after it.
    fn with_target<R>(
        &mut self,
        tree: &mut ComponentTree,
        id: ComponentId,
        call: impl FnOnce(&mut dyn EventTarget, &mut DispatchContext<'_>) -> R,
    ) -> Option<R> {
        if !tree.get(id).map(|n| n.active).unwrap_or(false) {
            return None;
        }
        let handle = tree.target(id)?;
        let mut request = None;
        let result = {
            let mut ctx = DispatchContext::new(id, tree, &mut self.spawned, &mut request);
            let mut target = handle.borrow_mut();
            call(&mut *target, &mut ctx)
        };
        if let Some(requested) = request {
            self.set_focus(tree, requested);
        }
        Some(result)
    }

    fn call_surrogate(
        &mut self,
        tree: &mut ComponentTree,
        press: ComponentId,
        call: impl FnOnce(&mut dyn DragSurrogate, &mut DispatchContext<'_>),
    ) {
        let Some(mut surrogate) = self.gesture.surrogate.take() else {
            return;
        };
        let mut request = None;
        {
            let mut ctx = DispatchContext::new(press, tree, &mut self.spawned, &mut request);
            call(surrogate.as_mut(), &mut ctx);
        }
        self.gesture.surrogate = Some(surrogate);
        if let Some(requested) = request {
            self.set_focus(tree, requested);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}
