//! The frame loop
//!
//! One [`Runtime::run_once`] call is one frame tick: poll the platform,
//! drain the events that were queued before the frame started, advance
//! every active effect, and hand back control. Waiting is built out of
//! repeated ticks ([`run_until`](Runtime::run_until),
//! [`wait_for`](Runtime::wait_for)) rather than blocking, so nested
//! pumps (a modal window spinning the loop from inside a handler) stay
//! plain re-entrant function calls.

use crate::component::{ComponentId, ComponentTree};
use crate::effects::{EffectHandle, EffectScheduler};
use crate::events::{DispatchConfig, Dispatcher, EventQueue, InputEvent};
use crate::geometry::Size;
use crate::platform::PlatformAdapter;

/// Owner of the engine's top-level state
pub struct Runtime<P: PlatformAdapter> {
    pub tree: ComponentTree,
    pub dispatcher: Dispatcher,
    pub scheduler: EffectScheduler,
    pub queue: EventQueue,
    pub platform: P,
    last_tick_ms: Option<u64>,
}

impl<P: PlatformAdapter> Runtime<P> {
    pub fn new(desktop_size: Size, config: DispatchConfig, platform: P) -> Self {
        Self {
            tree: ComponentTree::new(desktop_size),
            dispatcher: Dispatcher::new(config),
            scheduler: EffectScheduler::new(),
            queue: EventQueue::new(),
            platform,
            last_tick_ms: None,
        }
    }

    /// One frame tick.
    ///
    /// Only events already queued when the frame starts are dispatched;
    /// events enqueued by handlers during the frame wait for the next
    /// tick, so a re-entered loop cannot starve the outer one. If both
    /// the queue and the effect list are empty, sleeps up to
    /// `max_wait_ms` before returning.
    pub fn run_once(&mut self, max_wait_ms: u64) {
        self.platform.poll_input(&self.queue);

        let now = self.platform.now_ms();
        let frame_time = match self.last_tick_ms {
            Some(last) => now.saturating_sub(last).min(u32::MAX as u64) as u32,
            None => 0,
        };
        self.last_tick_ms = Some(now);

        let batch = self.queue.drain_frame();
        let idle = batch.is_empty() && self.scheduler.is_empty();
        for event in batch {
            // wheel routes by where the pointer is now, not where it was
            // when the rotation was queued
            let event = match event {
                InputEvent::PointerWheel {
                    delta, modifiers, ..
                } => InputEvent::PointerWheel {
                    delta,
                    position: self.platform.pointer_position(),
                    modifiers,
                },
                other => other,
            };
            self.dispatcher.dispatch(&mut self.tree, event, now);
        }
        for handle in self.dispatcher.take_spawned() {
            self.scheduler.add(handle);
        }

        self.scheduler.run_frame(&mut self.tree, frame_time);
        for handle in self.dispatcher.take_spawned() {
            self.scheduler.add(handle);
        }

        if idle && max_wait_ms > 0 {
            self.platform.sleep(max_wait_ms);
        }
    }

    /// Pump frames until `predicate` holds. `max_wait_ms` bounds the
    /// per-frame idle sleep.
    pub fn run_until(&mut self, max_wait_ms: u64, mut predicate: impl FnMut(&Self) -> bool) {
        while !predicate(self) {
            self.run_once(max_wait_ms);
        }
    }

    /// Pump frames until the given effect has ended
    pub fn wait_for(&mut self, handle: &EffectHandle) {
        let handle = handle.clone();
        self.run_until(0, move |_| handle.is_ended());
    }

    /// Start an effect and return its handle
    pub fn spawn_effect(&mut self, handle: EffectHandle) -> EffectHandle {
        self.scheduler.add(handle.clone());
        handle
    }

    /// Move keyboard focus, running the popup auto-dismiss rule
    pub fn set_focus(&mut self, target: Option<ComponentId>) {
        self.dispatcher.set_focus(&mut self.tree, target);
        for handle in self.dispatcher.take_spawned() {
            self.scheduler.add(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{target_handle, ComponentNode, DispatchContext, EventTarget};
    use crate::effects::{DelayEffect, EffectHandle, MoveEffect};
    use crate::events::{InputEvent, Modifiers};
    use crate::geometry::{Point, Rect};
    use crate::platform::FakeAdapter;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn runtime() -> Runtime<FakeAdapter> {
        Runtime::new(
            Size::new(800, 600),
            DispatchConfig::default(),
            FakeAdapter::new(),
        )
    }

    #[test]
    fn test_wait_for_pumps_until_effect_ends() {
        let mut rt = runtime();
        rt.platform.auto_advance_ms = 16;
        let handle = rt.spawn_effect(EffectHandle::new(DelayEffect::new(50)));
        rt.wait_for(&handle);
        assert!(handle.is_ended());
    }

    #[test]
    fn test_effect_moves_component_through_frames() {
        let mut rt = runtime();
        let root = rt.tree.root();
        let id = rt
            .tree
            .add_child(root, ComponentNode::new().with_bounds(Rect::new(0, 0, 10, 10)))
            .unwrap();
        let handle = rt.spawn_effect(EffectHandle::new(MoveEffect::new(id, Point::new(80, 0), 80)));

        for _ in 0..20 {
            rt.run_once(0);
            rt.platform.advance(16);
            if handle.is_ended() {
                break;
            }
        }
        assert!(handle.is_ended());
        assert_eq!(rt.tree.get(id).unwrap().origin, Point::new(80, 0));
    }

    #[test]
    fn test_events_enqueued_mid_frame_wait_for_next_tick() {
        let mut rt = runtime();
        rt.queue.enqueue(InputEvent::Character {
            ch: 'a',
            modifiers: Modifiers::empty(),
        });
        rt.run_once(0);
        assert!(rt.queue.is_empty());

        // a handler enqueueing during the frame would land here instead
        rt.queue.enqueue(InputEvent::Character {
            ch: 'b',
            modifiers: Modifiers::empty(),
        });
        assert_eq!(rt.queue.len(), 1);
    }

    #[test]
    fn test_wheel_routes_by_live_pointer_position() {
        struct Wheelie(Rc<RefCell<i32>>);
        impl EventTarget for Wheelie {
            fn on_wheel(&mut self, _ctx: &mut DispatchContext<'_>, delta: i32, _position: Point) {
                *self.0.borrow_mut() += delta;
            }
        }

        let mut rt = runtime();
        let root = rt.tree.root();
        let turns = Rc::new(RefCell::new(0));
        rt.tree
            .add_child(
                root,
                ComponentNode::new()
                    .with_bounds(Rect::new(100, 100, 50, 50))
                    .with_target(target_handle(Wheelie(turns.clone()))),
            )
            .unwrap();

        rt.platform.set_pointer_position(Point::new(120, 120));
        // the queued position is stale; the platform's pointer wins
        rt.queue.enqueue(InputEvent::PointerWheel {
            delta: 3,
            position: Point::new(0, 0),
            modifiers: Modifiers::empty(),
        });
        rt.run_once(0);
        assert_eq!(*turns.borrow(), 3);

        rt.platform.set_pointer_position(Point::new(0, 0));
        rt.queue.enqueue(InputEvent::PointerWheel {
            delta: 5,
            position: Point::new(120, 120),
            modifiers: Modifiers::empty(),
        });
        rt.run_once(0);
        assert_eq!(*turns.borrow(), 3);
    }

    #[test]
    fn test_idle_frame_sleeps() {
        let mut rt = runtime();
        rt.run_once(8);
        assert_eq!(rt.platform.slept_ms, 8);

        rt.spawn_effect(EffectHandle::new(DelayEffect::new(100)));
        rt.run_once(8);
        // a live effect suppresses the idle sleep
        assert_eq!(rt.platform.slept_ms, 8);
    }
}
