//! Effect combinators
//!
//! [`EffectSequence`] runs children one after another; [`EffectFork`] runs
//! them concurrently. Both preserve the base effect contract, so they can
//! be nested arbitrarily and handed to the scheduler like any other
//! effect.

use std::collections::VecDeque;

use super::{Effect, EffectContext, EffectHandle};

/// Runs child effects strictly one after another.
///
/// Only the front child advances each frame; a finished child is unlinked
/// and its reference released before the next child starts. The sequence
/// itself ends when the list is empty.
#[derive(Default)]
pub struct EffectSequence {
    children: VecDeque<EffectHandle>,
    added: bool,
}

impl EffectSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, effect: impl Effect + 'static) -> Self {
        self.children.push_back(EffectHandle::new(effect));
        self
    }

    /// Append a child to the end of the sequence
    pub fn append(&mut self, ctx: &mut EffectContext<'_>, handle: EffectHandle) {
        if self.added {
            handle.mark_added(ctx);
        }
        self.children.push_back(handle);
    }

    /// Push a child to the front. If the sequence is mid-flight this
    /// preempts the current child without disturbing its state; it simply
    /// resumes once the prepended child has finished.
    pub fn prepend(&mut self, ctx: &mut EffectContext<'_>, handle: EffectHandle) {
        if self.added {
            handle.mark_added(ctx);
        }
        self.children.push_front(handle);
    }

    /// Insert at an arbitrary position (clamped to the list length)
    pub fn insert(&mut self, ctx: &mut EffectContext<'_>, index: usize, handle: EffectHandle) {
        if self.added {
            handle.mark_added(ctx);
        }
        let index = index.min(self.children.len());
        self.children.insert(index, handle);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Effect for EffectSequence {
    fn on_added(&mut self, ctx: &mut EffectContext<'_>) {
        self.added = true;
        for child in &self.children {
            child.mark_added(ctx);
        }
    }

    fn execute(&mut self, ctx: &mut EffectContext<'_>, frame_time: u32) -> bool {
        // drop children that were canceled-and-ended from outside
        while let Some(front) = self.children.front() {
            if front.is_ended() {
                self.children.pop_front();
            } else {
                break;
            }
        }
        let Some(front) = self.children.front().cloned() else {
            return false;
        };
        front.run(ctx, frame_time);
        if front.is_ended() {
            // unlink now; the handle (and the child's memory) is released
            // here, not freed mid-call
            self.children.pop_front();
        }
        !self.children.is_empty()
    }

    /// Cancellation reaches only the current front child; children that
    /// never started are dropped without any callback.
    fn on_cancel(&mut self, ctx: &mut EffectContext<'_>) {
        if let Some(front) = self.children.front().cloned() {
            front.cancel();
            front.run(ctx, 0);
        }
        self.children.clear();
    }
}

/// Runs all children concurrently; ends when every child has ended.
#[derive(Default)]
pub struct EffectFork {
    children: Vec<EffectHandle>,
    added: bool,
}

impl EffectFork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, effect: impl Effect + 'static) -> Self {
        self.children.push(EffectHandle::new(effect));
        self
    }

    /// Add a child. If the fork already started, the child receives
    /// `on_added` immediately so it can register itself with a component
    /// before its first execution.
    pub fn add(&mut self, ctx: &mut EffectContext<'_>, handle: EffectHandle) {
        if self.added {
            handle.mark_added(ctx);
        }
        self.children.push(handle);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Effect for EffectFork {
    fn on_added(&mut self, ctx: &mut EffectContext<'_>) {
        self.added = true;
        for child in &self.children {
            child.mark_added(ctx);
        }
    }

    fn execute(&mut self, ctx: &mut EffectContext<'_>, frame_time: u32) -> bool {
        let snapshot = self.children.clone();
        for child in &snapshot {
            child.run(ctx, frame_time);
        }
        self.children.retain(|c| !c.is_ended());
        !self.children.is_empty()
    }

    /// Unlike a sequence, cancellation reaches every child immediately
    fn on_cancel(&mut self, ctx: &mut EffectContext<'_>) {
        let snapshot = self.children.clone();
        for child in &snapshot {
            child.cancel();
            child.run(ctx, 0);
        }
        self.children.clear();
    }
}
