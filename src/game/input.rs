//! Input Events
//!
//! Raw host input reduced to the few events the orchestrator reacts to:
//! the first touch (switches the launch to touch controls) and the pause
//! keys.

use serde::{Deserialize, Serialize};

/// Keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Escape.
    Escape,
    /// The `P` key.
    P,
    /// Any other printable key.
    Other(char),
}

impl Key {
    /// Map a key name as reported by the host (`"Escape"`, `"p"`, `"P"`).
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            "p" | "P" => Key::P,
            other => Key::Other(other.chars().next().unwrap_or('\0')),
        }
    }

    /// Whether this key toggles pause.
    pub fn toggles_pause(&self) -> bool {
        matches!(self, Key::Escape | Key::P)
    }
}

/// Input forwarded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    /// A touch began anywhere on the surface.
    TouchStart,
    /// A key was pressed.
    KeyDown(Key),
    /// A pointer was pressed.
    PointerDown {
        /// Whether the pointer is a touch contact.
        touch: bool,
    },
}

impl InputEvent {
    /// Whether this event proves a touch device.
    pub fn is_touch(&self) -> bool {
        matches!(
            self,
            InputEvent::TouchStart | InputEvent::PointerDown { touch: true }
        )
    }

    /// Whether this event toggles pause.
    pub fn toggles_pause(&self) -> bool {
        match self {
            InputEvent::KeyDown(key) => key.toggles_pause(),
            _ => false,
        }
    }
}
