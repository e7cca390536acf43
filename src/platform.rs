//! Platform adapter contract
//!
//! The runtime never polls hardware itself. A [`PlatformAdapter`] feeds
//! already-classified [`InputEvent`]s into the event queue, answers
//! pointer-position and clock queries, and yields the thread between
//! frames so the host process stays responsive.

use crate::events::{EventQueue, InputEvent};
use crate::geometry::Point;

/// The narrow surface the runtime consumes from the host platform
pub trait PlatformAdapter {
    /// Collect pending raw input, classify it, and enqueue it.
    /// Called once at the start of every frame.
    fn poll_input(&mut self, queue: &EventQueue);

    /// Current absolute pointer position on the desktop
    fn pointer_position(&self) -> Point;

    /// Monotonic frame clock in milliseconds
    fn now_ms(&self) -> u64;

    /// Yield the thread for up to `ms` milliseconds between frames
    fn sleep(&mut self, ms: u64);
}

/// Adapter backed by the OS clock with no input source of its own;
/// events reach the queue through [`EventQueue::enqueue`] directly.
/// Suitable for hosts that push input from their own event loop.
pub struct HeadlessAdapter {
    epoch: std::time::Instant,
    pointer: Point,
}

impl HeadlessAdapter {
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
            pointer: Point::zero(),
        }
    }

    pub fn set_pointer_position(&mut self, position: Point) {
        self.pointer = position;
    }
}

impl Default for HeadlessAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformAdapter for HeadlessAdapter {
    fn poll_input(&mut self, _queue: &EventQueue) {}

    fn pointer_position(&self) -> Point {
        self.pointer
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn sleep(&mut self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }
}

/// Deterministic adapter for tests: a manually advanced clock and a
/// scripted input feed.
pub struct FakeAdapter {
    now: u64,
    pointer: Point,
    /// Events handed out on the next `poll_input`
    pub pending: Vec<InputEvent>,
    /// Clock advance applied on every `poll_input`, simulating frame pacing
    pub auto_advance_ms: u64,
    /// Total milliseconds slept, for starvation assertions
    pub slept_ms: u64,
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self {
            now: 0,
            pointer: Point::zero(),
            pending: Vec::new(),
            auto_advance_ms: 0,
            slept_ms: 0,
        }
    }

    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }

    pub fn set_pointer_position(&mut self, position: Point) {
        self.pointer = position;
    }
}

impl Default for FakeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformAdapter for FakeAdapter {
    fn poll_input(&mut self, queue: &EventQueue) {
        self.now += self.auto_advance_ms;
        for event in self.pending.drain(..) {
            queue.enqueue(event);
        }
    }

    fn pointer_position(&self) -> Point {
        self.pointer
    }

    fn now_ms(&self) -> u64 {
        self.now
    }

    fn sleep(&mut self, ms: u64) {
        self.slept_ms += ms;
        self.now += ms;
    }
}
