//! Keyboard input.
//!
//! `Input` keeps the held keys plus the keys pressed since the last frame;
//! the runtime feeds it winit keyboard events and clears the per-frame part
//! after each frame.

use std::collections::HashSet;

use tessera_engine::coords::Vec2;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keys the studio reacts to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Tab,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    C,
    Digit(u8),
    Other,
}

impl Key {
    pub fn from_physical(key: PhysicalKey) -> Key {
        let PhysicalKey::Code(code) = key else {
            return Key::Other;
        };
        match code {
            KeyCode::Escape => Key::Escape,
            KeyCode::Tab => Key::Tab,
            KeyCode::ArrowUp => Key::ArrowUp,
            KeyCode::ArrowDown => Key::ArrowDown,
            KeyCode::ArrowLeft => Key::ArrowLeft,
            KeyCode::ArrowRight => Key::ArrowRight,
            KeyCode::KeyC => Key::C,
            KeyCode::Digit0 | KeyCode::Numpad0 => Key::Digit(0),
            KeyCode::Digit1 | KeyCode::Numpad1 => Key::Digit(1),
            KeyCode::Digit2 | KeyCode::Numpad2 => Key::Digit(2),
            KeyCode::Digit3 | KeyCode::Numpad3 => Key::Digit(3),
            KeyCode::Digit4 | KeyCode::Numpad4 => Key::Digit(4),
            KeyCode::Digit5 | KeyCode::Numpad5 => Key::Digit(5),
            KeyCode::Digit6 | KeyCode::Numpad6 => Key::Digit(6),
            KeyCode::Digit7 | KeyCode::Numpad7 => Key::Digit(7),
            KeyCode::Digit8 | KeyCode::Numpad8 => Key::Digit(8),
            KeyCode::Digit9 | KeyCode::Numpad9 => Key::Digit(9),
            _ => Key::Other,
        }
    }
}

#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<Key>,
    keys_pressed: HashSet<Key>,
}

impl Input {
    /// Applies a winit keyboard event.
    pub fn key_event(&mut self, event: &KeyEvent) {
        let key = Key::from_physical(event.physical_key);
        self.set_key(key, event.state == ElementState::Pressed);
    }

    /// Records a press or release. Auto-repeat presses do not count as new presses.
    pub fn set_key(&mut self, key: Key, pressed: bool) {
        if pressed {
            if self.keys_down.insert(key) {
                self.keys_pressed.insert(key);
            }
        } else {
            self.keys_down.remove(&key);
        }
    }

    /// Drops held keys; releases that happen while unfocused are never seen.
    pub fn focus_lost(&mut self) {
        self.keys_down.clear();
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    /// Whether `key` went down since the last `end_frame`.
    pub fn was_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// The digit pressed this frame, if any (lowest wins).
    pub fn pressed_digit(&self) -> Option<u8> {
        self.keys_pressed
            .iter()
            .filter_map(|k| match k {
                Key::Digit(d) => Some(*d),
                _ => None,
            })
            .min()
    }

    /// Direction of the held arrow keys, +y up.
    pub fn arrows(&self) -> Vec2 {
        let axis = |neg: Key, pos: Key| {
            (self.is_down(pos) as i32 - self.is_down(neg) as i32) as f32
        };
        Vec2::new(
            axis(Key::ArrowLeft, Key::ArrowRight),
            axis(Key::ArrowDown, Key::ArrowUp),
        )
    }

    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_reported_for_one_frame() {
        let mut input = Input::default();
        input.set_key(Key::Tab, true);
        assert!(input.was_pressed(Key::Tab));
        input.end_frame();
        assert!(!input.was_pressed(Key::Tab));
        assert!(input.is_down(Key::Tab));
    }

    #[test]
    fn repeat_does_not_press_again() {
        let mut input = Input::default();
        input.set_key(Key::C, true);
        input.end_frame();
        input.set_key(Key::C, true);
        assert!(!input.was_pressed(Key::C));
    }

    #[test]
    fn opposite_arrows_cancel() {
        let mut input = Input::default();
        input.set_key(Key::ArrowLeft, true);
        input.set_key(Key::ArrowRight, true);
        input.set_key(Key::ArrowUp, true);
        assert_eq!(input.arrows(), Vec2::new(0.0, 1.0));
        input.focus_lost();
        assert_eq!(input.arrows(), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn digits_map_from_both_rows() {
        assert_eq!(
            Key::from_physical(PhysicalKey::Code(KeyCode::Numpad4)),
            Key::Digit(4)
        );
        let mut input = Input::default();
        input.set_key(Key::Digit(5), true);
        input.set_key(Key::Digit(2), true);
        assert_eq!(input.pressed_digit(), Some(2));
    }
}
