//! Verve — an event dispatch and timed-effect engine for retained-mode
//! desktop UIs.
//!
//! The crate covers the two subsystems every retained-mode toolkit is
//! built around: routing input events to the right on-screen target
//! (hit testing, focus and modal scoping, drag/click disambiguation,
//! hot-key bubbling, popup auto-dismissal) and advancing timed effects
//! frame by frame (looping timers, easing curves, sequencing and
//! forking, property interpolation). Rendering, layout, and raw input
//! polling stay on the host's side of the [`platform`] boundary.

pub mod component;
pub mod effects;
pub mod events;
pub mod geometry;
pub mod platform;
pub mod runtime;

/// Version of the engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export of common types for convenience
pub mod prelude {
    pub use crate::component::{
        target_handle, ComponentId, ComponentNode, ComponentTree, DispatchContext, DragSurrogate,
        EventTarget, TargetHandle,
    };
    pub use crate::effects::{
        DelayEffect, Effect, EffectContext, EffectFork, EffectHandle, EffectScheduler,
        EffectSequence, FadeEffect, MoveEffect, ResizeEffect, TimedEffectDriver, TimedHooks,
    };
    pub use crate::events::{
        DispatchConfig, Dispatcher, EventQueue, InputEvent, KeyCode, Modifiers, PointerButton,
        SpecialKey,
    };
    pub use crate::geometry::{Point, Rect, Size};
    pub use crate::platform::PlatformAdapter;
    pub use crate::runtime::Runtime;
}

/// Errors surfaced by the engine.
///
/// The dispatch and effect state machines themselves signal ordinary
/// termination through boolean returns; only structural misuse (tree
/// edits, curve construction) produces an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("component tree error: {0}")]
    Tree(#[from] component::TreeError),

    #[error("time curve error: {0}")]
    Curve(#[from] effects::timed::CurveError),
}
