//! Ready-made effects that animate or manage component properties.
//!
//! All of them hold a [`ComponentId`] rather than a reference; the target
//! is looked up each frame and a component removed mid-flight simply ends
//! the effect on its next step.

use crate::component::{ComponentId, PopupState};
use crate::geometry::{lerp, Point, Size};

use super::timed::{TimeCurve, TimedEffectDriver, TimedHooks};
use super::{Effect, EffectContext};

/// Slides a component from its current origin to `to` over `total_time`
/// milliseconds.
pub struct MoveEffect {
    component: ComponentId,
    from: Option<Point>,
    to: Point,
}

impl MoveEffect {
    pub fn new(component: ComponentId, to: Point, total_time: u32) -> TimedEffectDriver {
        TimedEffectDriver::once(
            total_time,
            Self {
                component,
                from: None,
                to,
            },
        )
    }

    pub fn with_curve(
        component: ComponentId,
        to: Point,
        total_time: u32,
        curve: impl TimeCurve + 'static,
    ) -> TimedEffectDriver {
        Self::new(component, to, total_time).with_curve(curve)
    }
}

impl TimedHooks for MoveEffect {
    fn on_start(&mut self, ctx: &mut EffectContext<'_>) -> bool {
        match ctx.tree.get(self.component) {
            Some(node) => {
                self.from = Some(node.origin);
                true
            }
            None => false,
        }
    }

    fn execute_timed(&mut self, ctx: &mut EffectContext<'_>, _step: u32, progress: f64) -> bool {
        let Some(from) = self.from else { return false };
        let origin = Point::new(
            lerp(from.x, self.to.x, progress),
            lerp(from.y, self.to.y, progress),
        );
        ctx.tree.set_origin(self.component, origin).is_ok()
    }
}

/// Grows or shrinks a component to `to` over `total_time` milliseconds
pub struct ResizeEffect {
    component: ComponentId,
    from: Option<Size>,
    to: Size,
}

impl ResizeEffect {
    pub fn new(component: ComponentId, to: Size, total_time: u32) -> TimedEffectDriver {
        TimedEffectDriver::once(
            total_time,
            Self {
                component,
                from: None,
                to,
            },
        )
    }
}

impl TimedHooks for ResizeEffect {
    fn on_start(&mut self, ctx: &mut EffectContext<'_>) -> bool {
        match ctx.tree.get(self.component) {
            Some(node) => {
                self.from = Some(node.size);
                true
            }
            None => false,
        }
    }

    fn execute_timed(&mut self, ctx: &mut EffectContext<'_>, _step: u32, progress: f64) -> bool {
        let Some(from) = self.from else { return false };
        let size = Size::new(
            lerp(from.width, self.to.width, progress),
            lerp(from.height, self.to.height, progress),
        );
        ctx.tree.set_size(self.component, size).is_ok()
    }
}

/// Fades a component's alpha from its current value to `to`
pub struct FadeEffect {
    component: ComponentId,
    from: Option<f32>,
    to: f32,
}

impl FadeEffect {
    pub fn new(component: ComponentId, to: f32, total_time: u32) -> TimedEffectDriver {
        TimedEffectDriver::once(
            total_time,
            Self {
                component,
                from: None,
                to: to.clamp(0.0, 1.0),
            },
        )
    }
}

impl TimedHooks for FadeEffect {
    fn on_start(&mut self, ctx: &mut EffectContext<'_>) -> bool {
        match ctx.tree.get(self.component) {
            Some(node) => {
                self.from = Some(node.alpha);
                true
            }
            None => false,
        }
    }

    fn execute_timed(&mut self, ctx: &mut EffectContext<'_>, _step: u32, progress: f64) -> bool {
        let Some(from) = self.from else { return false };
        let alpha = from as f64 + (self.to as f64 - from as f64) * progress;
        ctx.tree.set_alpha(self.component, alpha as f32).is_ok()
    }
}

/// Does nothing for `total_time` milliseconds. Useful inside an
/// [`EffectSequence`](super::EffectSequence) to hold a pause between two
/// animations.
pub struct DelayEffect;

impl DelayEffect {
    pub fn new(total_time: u32) -> TimedEffectDriver {
        TimedEffectDriver::once(total_time, Self)
    }
}

impl TimedHooks for DelayEffect {
    fn execute_timed(&mut self, _ctx: &mut EffectContext<'_>, _step: u32, _progress: f64) -> bool {
        true
    }
}

/// Removes a component subtree on the frame after it was scheduled.
///
/// Popups are dismissed from inside their own event handling; tearing the
/// subtree down immediately would pull state out from under calls still on
/// the stack. The first frame only arms the effect, the removal happens on
/// the second.
pub struct DestroyEffect {
    component: ComponentId,
    armed: bool,
}

impl DestroyEffect {
    pub fn new(component: ComponentId) -> Self {
        Self {
            component,
            armed: false,
        }
    }
}

impl Effect for DestroyEffect {
    fn on_added(&mut self, ctx: &mut EffectContext<'_>) {
        // marked destroying at once so focus changes and repeated dismiss
        // requests skip this subtree
        if let Some(node) = ctx.tree.get_mut(self.component) {
            if let Some(PopupState { destroying }) = node.popup.as_mut() {
                *destroying = true;
            }
        }
    }

    fn execute(&mut self, ctx: &mut EffectContext<'_>, _frame_time: u32) -> bool {
        if !self.armed {
            self.armed = true;
            return ctx.tree.is_alive(self.component);
        }
        if ctx.tree.is_alive(self.component) {
            if let Err(err) = ctx.tree.remove(self.component) {
                log::warn!("deferred destroy of {:?} failed: {err}", self.component);
            }
        }
        false
    }

    fn on_cancel(&mut self, ctx: &mut EffectContext<'_>) {
        if let Some(node) = ctx.tree.get_mut(self.component) {
            if let Some(PopupState { destroying }) = node.popup.as_mut() {
                *destroying = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentNode, ComponentTree};
    use crate::effects::{EffectHandle, EffectScheduler};
    use crate::geometry::Rect;

    fn tree_with_child(bounds: Rect) -> (ComponentTree, ComponentId) {
        let mut tree = ComponentTree::new(Size::new(800, 600));
        let root = tree.root();
        let id = tree
            .add_child(root, ComponentNode::new().with_bounds(bounds))
            .unwrap();
        (tree, id)
    }

    #[test]
    fn test_move_effect_reaches_destination() {
        let (mut tree, id) = tree_with_child(Rect::new(0, 0, 50, 50));
        let mut scheduler = EffectScheduler::new();
        let handle = EffectHandle::new(MoveEffect::new(id, Point::new(100, 40), 100));
        scheduler.add(handle.clone());

        scheduler.run_frame(&mut tree, 16); // zero-delta first frame
        assert_eq!(tree.get(id).unwrap().origin, Point::new(0, 0));

        for _ in 0..7 {
            scheduler.run_frame(&mut tree, 16);
        }
        assert!(handle.is_ended());
        assert_eq!(tree.get(id).unwrap().origin, Point::new(100, 40));
    }

    #[test]
    fn test_move_effect_midpoint() {
        let (mut tree, id) = tree_with_child(Rect::new(10, 10, 50, 50));
        let mut scheduler = EffectScheduler::new();
        scheduler.add(EffectHandle::new(MoveEffect::new(id, Point::new(110, 10), 100)));

        scheduler.run_frame(&mut tree, 0); // absorb the start frame
        scheduler.run_frame(&mut tree, 50);
        assert_eq!(tree.get(id).unwrap().origin, Point::new(60, 10));
    }

    #[test]
    fn test_resize_effect_reaches_target_size() {
        let (mut tree, id) = tree_with_child(Rect::new(0, 0, 20, 20));
        let mut scheduler = EffectScheduler::new();
        let handle = EffectHandle::new(ResizeEffect::new(id, Size::new(80, 60), 50));
        scheduler.add(handle.clone());

        scheduler.run_frame(&mut tree, 0);
        scheduler.run_frame(&mut tree, 50);
        assert!(handle.is_ended());
        assert_eq!(tree.get(id).unwrap().size, Size::new(80, 60));
    }

    #[test]
    fn test_fade_effect_interpolates_alpha() {
        let (mut tree, id) = tree_with_child(Rect::new(0, 0, 20, 20));
        let mut scheduler = EffectScheduler::new();
        scheduler.add(EffectHandle::new(FadeEffect::new(id, 0.0, 100)));

        scheduler.run_frame(&mut tree, 0);
        scheduler.run_frame(&mut tree, 25);
        assert!((tree.get(id).unwrap().alpha - 0.75).abs() < 1e-6);
        scheduler.run_frame(&mut tree, 75);
        assert!(tree.get(id).unwrap().alpha.abs() < 1e-6);
    }

    #[test]
    fn test_effect_ends_when_component_removed() {
        let (mut tree, id) = tree_with_child(Rect::new(0, 0, 20, 20));
        let mut scheduler = EffectScheduler::new();
        let handle = EffectHandle::new(MoveEffect::new(id, Point::new(100, 0), 100));
        scheduler.add(handle.clone());

        scheduler.run_frame(&mut tree, 0);
        scheduler.run_frame(&mut tree, 16);
        tree.remove(id).unwrap();
        scheduler.run_frame(&mut tree, 16);
        assert!(handle.is_ended());
    }

    #[test]
    fn test_destroy_effect_removes_on_second_frame() {
        let (mut tree, id) = tree_with_child(Rect::new(0, 0, 20, 20));
        let mut scheduler = EffectScheduler::new();
        scheduler.add(EffectHandle::new(DestroyEffect::new(id)));

        scheduler.run_frame(&mut tree, 16);
        assert!(tree.is_alive(id));
        scheduler.run_frame(&mut tree, 16);
        assert!(!tree.is_alive(id));
    }

    #[test]
    fn test_destroy_effect_marks_popup_destroying() {
        let mut tree = ComponentTree::new(Size::new(800, 600));
        let root = tree.root();
        let popup = tree
            .add_child(
                root,
                ComponentNode::new()
                    .with_bounds(Rect::new(10, 10, 100, 100))
                    .as_popup(),
            )
            .unwrap();

        let mut scheduler = EffectScheduler::new();
        scheduler.add(EffectHandle::new(DestroyEffect::new(popup)));
        scheduler.run_frame(&mut tree, 16);

        let state = tree.get(popup).unwrap().popup.as_ref().unwrap();
        assert!(state.destroying);
    }

    #[test]
    fn test_delay_then_move_sequence() {
        use crate::effects::EffectSequence;

        let (mut tree, id) = tree_with_child(Rect::new(0, 0, 20, 20));
        let mut scheduler = EffectScheduler::new();
        let seq = EffectSequence::new()
            .with(DelayEffect::new(40))
            .with(MoveEffect::new(id, Point::new(50, 0), 40));
        let handle = EffectHandle::new(seq);
        scheduler.add(handle.clone());

        scheduler.run_frame(&mut tree, 0); // delay start
        scheduler.run_frame(&mut tree, 40); // delay runs out exactly
        assert_eq!(tree.get(id).unwrap().origin, Point::new(0, 0));
        scheduler.run_frame(&mut tree, 0); // move start frame
        scheduler.run_frame(&mut tree, 40);
        assert_eq!(tree.get(id).unwrap().origin, Point::new(50, 0));
        scheduler.run_frame(&mut tree, 0);
        assert!(handle.is_ended());
    }
}
