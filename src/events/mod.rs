//! Input events, their queue, and the routing core

pub mod dispatch;
pub mod event;
pub mod hit_testing;
pub mod queue;

pub use dispatch::{DispatchConfig, Dispatcher, UnhandledKeySink};
pub use event::{InputEvent, KeyCode, Modifiers, PointerButton, SpecialKey};
pub use hit_testing::{HitTestStats, HitTester};
pub use queue::EventQueue;
