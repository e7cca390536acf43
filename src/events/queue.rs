//! Process-wide FIFO event queue
//!
//! Producers (the platform adapter, possibly on other threads) hand events
//! in through a single synchronized `enqueue`; the consumer is the
//! single-threaded frame tick. One tick drains only the events that were
//! queued before it began, so a nested tick re-entered from a modal loop
//! cannot starve the outer one.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::event::InputEvent;

/// FIFO queue of pending input events
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Arc<Mutex<VecDeque<InputEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Append an event; side-effect-free beyond the queue itself.
    /// Safe to call from producer threads.
    pub fn enqueue(&self, event: InputEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        log::trace!("enqueue {} (depth {})", event.kind(), events.len() + 1);
        events.push_back(event);
    }

    /// Take every event queued so far, in arrival order. Events queued
    /// while the returned batch is being dispatched wait for the next
    /// frame.
    pub fn drain_frame(&self) -> Vec<InputEvent> {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        match self.events.lock() {
            Ok(events) => events.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event::Modifiers;
    use crate::geometry::Point;

    fn mv(x: i32, y: i32) -> InputEvent {
        InputEvent::PointerMove {
            position: Point::new(x, y),
            modifiers: Modifiers::empty(),
        }
    }

    #[test]
    fn test_fifo_order() {
        let queue = EventQueue::new();
        queue.enqueue(mv(1, 0));
        queue.enqueue(mv(2, 0));
        queue.enqueue(mv(3, 0));

        let drained = queue.drain_frame();
        let xs: Vec<i32> = drained.iter().filter_map(|e| e.position()).map(|p| p.x).collect();
        assert_eq!(xs, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_takes_snapshot() {
        let queue = EventQueue::new();
        queue.enqueue(mv(1, 0));
        let first = queue.drain_frame();
        assert_eq!(first.len(), 1);

        // Events arriving after a drain wait for the next one
        queue.enqueue(mv(2, 0));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_cross_thread_enqueue() {
        let queue = EventQueue::new();
        let producer = queue.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..100 {
                producer.enqueue(mv(i, 0));
            }
        });
        handle.join().unwrap();
        assert_eq!(queue.drain_frame().len(), 100);
    }
}
