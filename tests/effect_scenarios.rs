//! Effect composition scenarios run through the scheduler and runtime

use std::cell::RefCell;
use std::rc::Rc;

use verve::effects::Acceleration;
use verve::platform::FakeAdapter;
use verve::prelude::*;

fn runtime() -> Runtime<FakeAdapter> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rt = Runtime::new(
        Size::new(800, 600),
        DispatchConfig::default(),
        FakeAdapter::new(),
    );
    rt.platform.auto_advance_ms = 16;
    rt
}

#[test]
fn sequence_of_moves_visits_waypoints_in_order() {
    let mut rt = runtime();
    let root = rt.tree.root();
    let id = rt
        .tree
        .add_child(root, ComponentNode::new().with_bounds(Rect::new(0, 0, 10, 10)))
        .unwrap();

    let seq = EffectSequence::new()
        .with(MoveEffect::new(id, Point::new(100, 0), 48))
        .with(MoveEffect::new(id, Point::new(100, 100), 48));
    let handle = rt.spawn_effect(EffectHandle::new(seq));
    rt.wait_for(&handle);

    assert_eq!(rt.tree.get(id).unwrap().origin, Point::new(100, 100));
}

#[test]
fn fork_animates_two_properties_at_once() {
    let mut rt = runtime();
    let root = rt.tree.root();
    let id = rt
        .tree
        .add_child(root, ComponentNode::new().with_bounds(Rect::new(0, 0, 10, 10)))
        .unwrap();

    let fork = EffectFork::new()
        .with(MoveEffect::new(id, Point::new(50, 50), 64))
        .with(FadeEffect::new(id, 0.0, 128));
    let handle = rt.spawn_effect(EffectHandle::new(fork));
    rt.wait_for(&handle);

    let node = rt.tree.get(id).unwrap();
    assert_eq!(node.origin, Point::new(50, 50));
    assert!(node.alpha.abs() < 1e-6);
}

#[test]
fn canceled_sequence_stops_moving() {
    let mut rt = runtime();
    let root = rt.tree.root();
    let id = rt
        .tree
        .add_child(root, ComponentNode::new().with_bounds(Rect::new(0, 0, 10, 10)))
        .unwrap();

    let seq = EffectSequence::new()
        .with(MoveEffect::new(id, Point::new(1000, 0), 10_000))
        .with(MoveEffect::new(id, Point::new(0, 1000), 10_000));
    let handle = rt.spawn_effect(EffectHandle::new(seq));

    for _ in 0..5 {
        rt.run_once(0);
    }
    let mid = rt.tree.get(id).unwrap().origin;
    assert!(mid.x > 0 && mid.x < 1000);

    handle.cancel();
    rt.run_once(0);
    assert!(handle.is_ended());
    let after = rt.tree.get(id).unwrap().origin;

    rt.run_once(0);
    rt.run_once(0);
    assert_eq!(rt.tree.get(id).unwrap().origin, after);
}

#[test]
fn looping_effect_repeats_until_loop_count() {
    struct Pulse {
        starts: Rc<RefCell<u32>>,
    }
    impl TimedHooks for Pulse {
        fn on_start(&mut self, _ctx: &mut EffectContext<'_>) -> bool {
            *self.starts.borrow_mut() += 1;
            true
        }

        fn execute_timed(&mut self, _ctx: &mut EffectContext<'_>, _step: u32, _progress: f64) -> bool {
            true
        }
    }

    let mut rt = runtime();
    let starts = Rc::new(RefCell::new(0));
    let driver = TimedEffectDriver::looping(30, 3, Pulse { starts: starts.clone() });
    let handle = rt.spawn_effect(EffectHandle::new(driver));
    rt.wait_for(&handle);

    assert_eq!(*starts.borrow(), 3);
}

#[test]
fn delay_holds_a_sequence_back() {
    let mut rt = runtime();
    let root = rt.tree.root();
    let id = rt
        .tree
        .add_child(root, ComponentNode::new().with_bounds(Rect::new(0, 0, 10, 10)))
        .unwrap();

    let seq = EffectSequence::new()
        .with(DelayEffect::new(200))
        .with(MoveEffect::new(id, Point::new(40, 0), 16));
    let handle = rt.spawn_effect(EffectHandle::new(seq));

    // well inside the delay, nothing has moved
    for _ in 0..4 {
        rt.run_once(0);
    }
    assert_eq!(rt.tree.get(id).unwrap().origin, Point::new(0, 0));

    rt.wait_for(&handle);
    assert_eq!(rt.tree.get(id).unwrap().origin, Point::new(40, 0));
}

#[test]
fn eased_move_still_lands_exactly() {
    let mut rt = runtime();
    let root = rt.tree.root();
    let id = rt
        .tree
        .add_child(root, ComponentNode::new().with_bounds(Rect::new(0, 0, 10, 10)))
        .unwrap();

    let handle = rt.spawn_effect(EffectHandle::new(MoveEffect::with_curve(
        id,
        Point::new(200, 80),
        100,
        Acceleration,
    )));
    rt.wait_for(&handle);

    assert_eq!(rt.tree.get(id).unwrap().origin, Point::new(200, 80));
}

#[test]
fn nested_fork_inside_sequence() {
    let mut rt = runtime();
    let root = rt.tree.root();
    let a = rt
        .tree
        .add_child(root, ComponentNode::new().with_bounds(Rect::new(0, 0, 10, 10)))
        .unwrap();
    let b = rt
        .tree
        .add_child(root, ComponentNode::new().with_bounds(Rect::new(0, 20, 10, 10)))
        .unwrap();

    // first both fade together, then A moves
    let seq = EffectSequence::new()
        .with(
            EffectFork::new()
                .with(FadeEffect::new(a, 0.5, 48))
                .with(FadeEffect::new(b, 0.5, 48)),
        )
        .with(MoveEffect::new(a, Point::new(60, 0), 48));
    let handle = rt.spawn_effect(EffectHandle::new(seq));
    rt.wait_for(&handle);

    assert!((rt.tree.get(a).unwrap().alpha - 0.5).abs() < 1e-6);
    assert!((rt.tree.get(b).unwrap().alpha - 0.5).abs() < 1e-6);
    assert_eq!(rt.tree.get(a).unwrap().origin, Point::new(60, 0));
}
