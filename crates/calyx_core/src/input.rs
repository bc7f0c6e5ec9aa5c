//! Per-frame input snapshots
//!
//! The host loop samples the platform once per frame and hands the UI an
//! immutable [`UiInputData`]. Button edges (pressed / released this frame)
//! are derived from the previous and current raw states so that every
//! element sees the same transitions during one update pass.
//!
//! ```
//! use calyx_core::input::{MouseState, UiInputData};
//! use calyx_core::geometry::Point;
//!
//! let previous = MouseState::default();
//! let current = MouseState { position: Point::new(10, 10), left: true, ..Default::default() };
//!
//! let input = UiInputData::from_states(&previous, &current);
//! assert!(input.left.pressed);
//! assert!(input.left.down);
//! ```

use smallvec::SmallVec;

use crate::geometry::Point;

/// Raw pointer state as sampled from the platform
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MouseState {
    pub position: Point,
    pub left: bool,
    pub right: bool,
    /// Accumulated wheel value (platform units)
    pub scroll: i32,
}

/// State of one mouse button for the current frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// Held down this frame
    pub down: bool,
    /// Went down this frame
    pub pressed: bool,
    /// Went up this frame
    pub released: bool,
}

impl ButtonState {
    fn from_edges(previous: bool, current: bool) -> Self {
        Self {
            down: current,
            pressed: current && !previous,
            released: !current && previous,
        }
    }
}

/// Keys the UI reacts to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Backspace,
    Enter,
    Tab,
    Escape,
    Left,
    Right,
    Up,
    Down,
    Other(u32),
}

/// Keys held down this frame
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyboardState {
    pressed: SmallVec<[Key; 8]>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            pressed: keys.into_iter().collect(),
        }
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    pub fn keys(&self) -> &[Key] {
        &self.pressed
    }
}

/// Immutable input snapshot for one frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UiInputData {
    pub mouse_position: Point,
    pub left: ButtonState,
    pub right: ButtonState,
    /// Wheel delta since the previous frame
    pub scroll_delta: i32,
    pub keyboard: Option<KeyboardState>,
}

impl UiInputData {
    /// Derive a snapshot from the previous and current raw pointer states
    pub fn from_states(previous: &MouseState, current: &MouseState) -> Self {
        Self {
            mouse_position: current.position,
            left: ButtonState::from_edges(previous.left, current.left),
            right: ButtonState::from_edges(previous.right, current.right),
            scroll_delta: current.scroll - previous.scroll,
            keyboard: None,
        }
    }

    /// Snapshot with the pointer at `position` and no buttons held
    pub fn at(position: Point) -> Self {
        Self {
            mouse_position: position,
            ..Default::default()
        }
    }

    pub fn with_keyboard(mut self, keyboard: KeyboardState) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// A text-entry event delivered to the focused element
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextInput {
    pub character: char,
    pub key: Option<Key>,
}

impl TextInput {
    pub fn char(character: char) -> Self {
        Self {
            character,
            key: None,
        }
    }

    pub fn key(key: Key) -> Self {
        let character = match key {
            Key::Backspace => '\u{8}',
            Key::Enter => '\r',
            Key::Tab => '\t',
            Key::Escape => '\u{1b}',
            _ => '\0',
        };
        Self {
            character,
            key: Some(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_edges() {
        let up = MouseState::default();
        let down = MouseState {
            left: true,
            ..Default::default()
        };

        let press = UiInputData::from_states(&up, &down);
        assert!(press.left.pressed && press.left.down && !press.left.released);

        let hold = UiInputData::from_states(&down, &down);
        assert!(!hold.left.pressed && hold.left.down);

        let release = UiInputData::from_states(&down, &up);
        assert!(release.left.released && !release.left.down);
    }

    #[test]
    fn test_scroll_delta() {
        let a = MouseState {
            scroll: 120,
            ..Default::default()
        };
        let b = MouseState {
            scroll: 360,
            ..Default::default()
        };
        assert_eq!(UiInputData::from_states(&a, &b).scroll_delta, 240);
    }

    #[test]
    fn test_keyboard_state() {
        let kb = KeyboardState::with_keys([Key::Enter, Key::Left]);
        assert!(kb.is_down(Key::Enter));
        assert!(!kb.is_down(Key::Backspace));
        assert_eq!(kb.keys().len(), 2);
    }
}
