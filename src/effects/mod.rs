//! Frame-driven effect machinery
//!
//! An effect is a self-advancing unit of behavior executed once per frame
//! until it signals completion by returning `false` or is canceled. All
//! control-flow outcomes in this module are boolean return values; there
//! are no error paths for ordinary termination, because callers rely on
//! that to keep the single-threaded frame loop re-entrant-safe.

pub mod component_effects;
pub mod compose;
pub mod timed;

pub use component_effects::{DelayEffect, DestroyEffect, FadeEffect, MoveEffect, ResizeEffect};
pub use compose::{EffectFork, EffectSequence};
pub use timed::{Acceleration, Linear, Polynomial, TimeCurve, TimedEffectDriver, TimedHooks};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::component::ComponentTree;

/// Mutable context handed to effect hooks each frame
pub struct EffectContext<'a> {
    pub tree: &'a mut ComponentTree,
    spawned: &'a mut Vec<EffectHandle>,
}

impl<'a> EffectContext<'a> {
    pub fn new(tree: &'a mut ComponentTree, spawned: &'a mut Vec<EffectHandle>) -> Self {
        Self { tree, spawned }
    }

    /// Queue another effect; it joins the scheduler's list on the next
    /// staging pass.
    pub fn spawn(&mut self, handle: EffectHandle) {
        self.spawned.push(handle);
    }
}

/// One unit of ongoing behavior, advanced once per frame.
///
/// Hook returns mean "continue running"; returning `false` from
/// [`execute`](Effect::execute) is the only ordinary way an effect ends.
#[allow(unused_variables)]
pub trait Effect {
    /// Called once when the effect joins a scheduler, sequence or fork
    fn on_added(&mut self, ctx: &mut EffectContext<'_>) {}

    /// Advance by `frame_time` milliseconds; return `false` to end
    fn execute(&mut self, ctx: &mut EffectContext<'_>, frame_time: u32) -> bool;

    /// Called exactly once if the effect is canceled before it ended.
    /// Cancellation cannot be vetoed.
    fn on_cancel(&mut self, ctx: &mut EffectContext<'_>) {}
}

struct EffectShared {
    canceled: Cell<bool>,
    ended: Cell<bool>,
    /// Re-entrancy guard: set only for the duration of one `run` call, so
    /// an effect that indirectly causes the scheduler to revisit it within
    /// the same frame is not executed twice.
    executing: Cell<bool>,
    added: Cell<bool>,
    effect: RefCell<Box<dyn Effect>>,
}

/// Shared, cloneable handle to an effect and its lifecycle flags.
///
/// The handle keeps the effect alive while anyone (scheduler, sequences,
/// forks, or a caller waiting on completion) still references it.
#[derive(Clone)]
pub struct EffectHandle(Rc<EffectShared>);

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("canceled", &self.0.canceled.get())
            .field("ended", &self.0.ended.get())
            .field("executing", &self.0.executing.get())
            .finish()
    }
}

impl EffectHandle {
    pub fn new(effect: impl Effect + 'static) -> Self {
        Self(Rc::new(EffectShared {
            canceled: Cell::new(false),
            ended: Cell::new(false),
            executing: Cell::new(false),
            added: Cell::new(false),
            effect: RefCell::new(Box::new(effect)),
        }))
    }

    /// Flag the effect for cancellation. Idempotent; canceling an already
    /// ended effect is a no-op. `on_cancel` runs on the next frame pass.
    pub fn cancel(&self) {
        if !self.0.ended.get() {
            self.0.canceled.set(true);
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.0.canceled.get()
    }

    pub fn is_ended(&self) -> bool {
        self.0.ended.get()
    }

    pub fn is_executing(&self) -> bool {
        self.0.executing.get()
    }

    /// Deliver `on_added` exactly once
    pub(crate) fn mark_added(&self, ctx: &mut EffectContext<'_>) {
        if !self.0.added.get() {
            self.0.added.set(true);
            if let Ok(mut effect) = self.0.effect.try_borrow_mut() {
                effect.on_added(ctx);
            }
        }
    }

    /// One frame-advance step, shared by the scheduler and the
    /// sequence/fork combinators:
    ///
    /// 1. skip if ended or currently executing,
    /// 2. set the `executing` guard,
    /// 3. canceled: deliver the single `on_cancel`, mark ended,
    /// 4. otherwise `execute`; a `false` return marks ended,
    /// 5. clear the guard.
    pub fn run(&self, ctx: &mut EffectContext<'_>, frame_time: u32) {
        if self.0.ended.get() || self.0.executing.get() {
            return;
        }
        self.0.executing.set(true);
        if self.0.canceled.get() {
            if let Ok(mut effect) = self.0.effect.try_borrow_mut() {
                effect.on_cancel(ctx);
            }
            self.0.ended.set(true);
        } else {
            let keep = match self.0.effect.try_borrow_mut() {
                Ok(mut effect) => effect.execute(ctx, frame_time),
                // the guard makes this unreachable in practice
                Err(_) => true,
            };
            if !keep {
                self.0.ended.set(true);
            }
        }
        self.0.executing.set(false);
    }
}

/// Per-frame scheduler counters
#[derive(Debug, Default, Clone)]
pub struct SchedulerStats {
    /// Total frames run
    pub frames: u64,
    /// Effects executed in the last frame
    pub executed: u32,
    /// Effects that ended in the last frame
    pub ended: u32,
}

/// Owner of the active effect list; advances every effect once per frame
#[derive(Default)]
pub struct EffectScheduler {
    active: Vec<EffectHandle>,
    /// Effects handed in while a frame is running; merged at the next
    /// staging pass, which is also when they receive `on_added`.
    staged: RefCell<Vec<EffectHandle>>,
    pub stats: SchedulerStats,
}

impl std::fmt::Debug for EffectScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectScheduler")
            .field("active", &self.active.len())
            .field("staged", &self.staged.borrow().len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl EffectScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand an effect to the scheduler. Callable while a frame is in
    /// progress; the effect starts with the next staging pass.
    pub fn add(&self, handle: EffectHandle) {
        self.staged.borrow_mut().push(handle);
    }

    /// Number of live (not yet removed) effects
    pub fn len(&self) -> usize {
        self.active.len() + self.staged.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance every active effect by `frame_time` milliseconds.
    ///
    /// Staged effects are merged (and receive `on_added`) first; effects
    /// spawned during the pass are staged for the next frame. Ended
    /// effects are unlinked afterwards, releasing the scheduler's
    /// reference — other holders may keep them alive.
    pub fn run_frame(&mut self, tree: &mut ComponentTree, frame_time: u32) {
        self.stats.frames += 1;
        self.stats.executed = 0;

        // staging: on_added may itself stage more effects
        loop {
            let batch: Vec<EffectHandle> = self.staged.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                break;
            }
            for handle in batch {
                let mut spawned = Vec::new();
                let mut ctx = EffectContext::new(tree, &mut spawned);
                handle.mark_added(&mut ctx);
                self.staged.borrow_mut().extend(spawned);
                self.active.push(handle);
            }
        }

        // execute pass over a snapshot: effects joining mid-pass wait for
        // the next frame
        let snapshot = self.active.clone();
        for handle in &snapshot {
            let mut spawned = Vec::new();
            let mut ctx = EffectContext::new(tree, &mut spawned);
            handle.run(&mut ctx, frame_time);
            self.staged.borrow_mut().extend(spawned);
            self.stats.executed += 1;
        }

        // housekeeping: unlink ended effects
        let before = self.active.len();
        self.active.retain(|h| !h.is_ended());
        self.stats.ended = (before - self.active.len()) as u32;
        if self.stats.ended > 0 {
            log::trace!(
                "scheduler frame {}: {} executed, {} ended, {} remain",
                self.stats.frames,
                self.stats.executed,
                self.stats.ended,
                self.active.len()
            );
        }
    }
}
