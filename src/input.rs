//! Input model: map modes, modifier keys, mouse buttons, touches, and the
//! pointer gesture tracked between pointer-down and pointer-up.
//!
//! `MapMode` and `Modifiers` capture the operator's intent at the time of an
//! event. `Gesture` is the engine-level interpretation of the active pointer
//! press: a click candidate that may turn into a pan, or a vertex drag. The
//! viewport keeps its own pan/pinch state; see [`crate::viewport`].

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;

/// What the map surface is being used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    /// Marker browsing: clicks select markers or expand clusters.
    #[default]
    Browse,
    /// License-area editing: clicks capture polygon vertices.
    Edit,
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

impl Button {
    /// Map a DOM `MouseEvent.button` code.
    #[must_use]
    pub fn from_dom(code: i16) -> Self {
        match code {
            1 => Self::Middle,
            2 => Self::Secondary,
            _ => Self::Primary,
        }
    }
}

/// A keyboard key.
///
/// The inner string holds the key name as reported by the browser (e.g. `"Enter"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key(pub String);

impl Key {
    /// Case-insensitive comparison against a key name.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down, i.e. zoom out).
    pub dy: f64,
}

/// One active touch contact in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Browser-assigned identifier, stable for the life of the contact.
    pub id: i32,
    pub x: f64,
    pub y: f64,
}

impl TouchPoint {
    #[must_use]
    pub fn point(self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Engine-level interpretation of the active pointer press.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    /// No button held.
    #[default]
    Idle,
    /// Button held, pointer has not yet travelled past the click slop.
    Pressed {
        /// Screen position of the pointer-down.
        origin: Point,
    },
    /// Button held on a grabbable vertex, still within the click slop.
    /// Moving further grabs the vertex; releasing is a click.
    PressedOnVertex {
        origin: Point,
        polygon: usize,
        vertex: usize,
    },
    /// The press turned into a viewport drag.
    Panning,
    /// A vertex of a finished polygon is being dragged.
    DraggingVertex {
        polygon: usize,
        vertex: usize,
    },
}
