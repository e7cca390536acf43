//! Typed input events
//!
//! One [`InputEvent`] records one input occurrence, created by the
//! platform adapter and consumed exactly once by dispatch. Events are
//! plain, immutable data; the enum tag replaces the original engine's
//! class-per-event-kind hierarchy.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

bitflags::bitflags! {
    /// Two generic option-modifier bits. The platform adapter decides
    /// what they mean (typically shift and ctrl).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Modifiers: u8 {
        const OPTION_1 = 0b01;
        const OPTION_2 = 0b10;
    }
}

/// Platform-neutral key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub u16);

/// Non-character control keys delivered as special events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialKey {
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
}

/// Pointer buttons the dispatch core distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    /// The button that drives press/click/drag gestures
    Primary,
    /// Context-menu button
    Secondary,
    Middle,
}

/// One input occurrence, owned by the event queue until dispatched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// A key press; `repeats` > 1 fans out into that many handler calls
    Key {
        code: KeyCode,
        repeats: u16,
        modifiers: Modifiers,
    },
    /// A translated character
    Character { ch: char, modifiers: Modifiers },
    /// An accelerator press, matched against component hot keys
    HotKey { ch: char, modifiers: Modifiers },
    /// A control key (arrows, enter, escape, ...)
    Special {
        key: SpecialKey,
        modifiers: Modifiers,
    },
    /// A raw make/break key stroke, below translation
    KeyStroke {
        code: KeyCode,
        pressed: bool,
        modifiers: Modifiers,
    },
    /// A pointer button transition at an absolute desktop position
    PointerButton {
        button: PointerButton,
        pressed: bool,
        position: Point,
        modifiers: Modifiers,
    },
    /// Pointer motion to an absolute desktop position
    PointerMove {
        position: Point,
        modifiers: Modifiers,
    },
    /// Wheel rotation; routed by pointer position, not focus
    PointerWheel {
        delta: i32,
        position: Point,
        modifiers: Modifiers,
    },
}

impl InputEvent {
    /// Whether this event routes through the keyboard scope (focus chain
    /// and modal/popup scoping) rather than hit testing.
    pub fn is_keyboard(&self) -> bool {
        matches!(
            self,
            Self::Key { .. }
                | Self::Character { .. }
                | Self::Special { .. }
                | Self::KeyStroke { .. }
        )
    }

    /// The pointer position carried by pointer events
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerButton { position, .. }
            | Self::PointerMove { position, .. }
            | Self::PointerWheel { position, .. } => Some(*position),
            _ => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::Key { modifiers, .. }
            | Self::Character { modifiers, .. }
            | Self::HotKey { modifiers, .. }
            | Self::Special { modifiers, .. }
            | Self::KeyStroke { modifiers, .. }
            | Self::PointerButton { modifiers, .. }
            | Self::PointerMove { modifiers, .. }
            | Self::PointerWheel { modifiers, .. } => *modifiers,
        }
    }

    /// Short tag for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Key { .. } => "key",
            Self::Character { .. } => "character",
            Self::HotKey { .. } => "hot-key",
            Self::Special { .. } => "special",
            Self::KeyStroke { .. } => "key-stroke",
            Self::PointerButton { .. } => "pointer-button",
            Self::PointerMove { .. } => "pointer-move",
            Self::PointerWheel { .. } => "pointer-wheel",
        }
    }
}
