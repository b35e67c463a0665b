use std::collections::HashSet;

use super::types::{ButtonState, InputEvent, Key, KeyState, MouseButton};

/// Held keys/buttons and the last pointer position for the window.
#[derive(Debug, Default)]
pub struct InputState {
    pub focused: bool,

    /// Pointer position in logical pixels; `None` while outside the window.
    pub pointer_pos: Option<(f32, f32)>,

    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    pub fn apply_event(&mut self, ev: &InputEvent) {
        match ev {
            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Releases can be lost while unfocused.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => {
                self.pointer_pos = Some((*x, *y));
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    self.keys_down.insert(*key);
                }
                KeyState::Released => {
                    self.keys_down.remove(key);
                }
            },

            InputEvent::PointerButton {
                button,
                state,
                x,
                y,
            } => {
                self.pointer_pos = Some((*x, *y));
                match state {
                    ButtonState::Pressed => {
                        self.buttons_down.insert(*button);
                    }
                    ButtonState::Released => {
                        self.buttons_down.remove(button);
                    }
                }
            }
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(button: MouseButton) -> InputEvent {
        InputEvent::PointerButton {
            button,
            state: ButtonState::Pressed,
            x: 4.0,
            y: 5.0,
        }
    }

    #[test]
    fn button_press_and_release_track_held_set() {
        let mut s = InputState::default();
        s.apply_event(&press(MouseButton::Left));
        assert!(s.button_down(MouseButton::Left));
        assert_eq!(s.pointer_pos, Some((4.0, 5.0)));

        s.apply_event(&InputEvent::PointerButton {
            button: MouseButton::Left,
            state: ButtonState::Released,
            x: 6.0,
            y: 7.0,
        });
        assert!(!s.button_down(MouseButton::Left));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut s = InputState::default();
        s.apply_event(&press(MouseButton::Left));
        s.apply_event(&InputEvent::Key {
            key: Key::Q,
            state: KeyState::Pressed,
            repeat: false,
        });
        s.apply_event(&InputEvent::Focused(false));
        assert!(!s.button_down(MouseButton::Left));
        assert!(!s.key_down(Key::Q));
    }

    #[test]
    fn pointer_leave_forgets_position() {
        let mut s = InputState::default();
        s.apply_event(&InputEvent::PointerMoved { x: 1.0, y: 2.0 });
        s.apply_event(&InputEvent::PointerLeft);
        assert_eq!(s.pointer_pos, None);
    }
}
