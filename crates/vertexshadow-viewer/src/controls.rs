//! Keyboard and pointer stand-ins for the drag surface, the three light
//! sliders and the technique radio.

use vertexshadow_engine::input::{ButtonState, InputEvent, InputState, Key, KeyState, MouseButton};
use vertexshadow_engine::render::{InteractionState, LightAxis};

use crate::config::SliderConfig;

/// What a single input event asks the viewer to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    DragStart { x: f32, y: f32 },
    DragMove { x: f32, y: f32 },
    DragEnd,
    /// Step the slider for `axis` up (`+1`) or down (`-1`).
    StepSlider { axis: LightAxis, direction: i8 },
    Radio(u8),
    Exit,
}

/// Maps one event to a viewer command. `input` already includes `event`.
pub fn map_event(event: &InputEvent, input: &InputState) -> Option<Command> {
    match *event {
        InputEvent::PointerButton {
            button: MouseButton::Left,
            state,
            x,
            y,
        } => Some(match state {
            ButtonState::Pressed => Command::DragStart { x, y },
            ButtonState::Released => Command::DragEnd,
        }),

        InputEvent::PointerMoved { x, y } if input.button_down(MouseButton::Left) => {
            Some(Command::DragMove { x, y })
        }

        // The release may never arrive once focus is gone.
        InputEvent::Focused(false) => Some(Command::DragEnd),

        InputEvent::Key {
            key,
            state: KeyState::Pressed,
            repeat,
        } => map_key(key, repeat),

        _ => None,
    }
}

fn map_key(key: Key, repeat: bool) -> Option<Command> {
    let step = |axis, direction| Some(Command::StepSlider { axis, direction });
    match key {
        Key::Q => step(LightAxis::X, 1),
        Key::A => step(LightAxis::X, -1),
        Key::W => step(LightAxis::Y, 1),
        Key::S => step(LightAxis::Y, -1),
        Key::E => step(LightAxis::Z, 1),
        Key::D => step(LightAxis::Z, -1),

        // Radio and exit ignore auto-repeat.
        _ if repeat => None,
        Key::Digit1 => Some(Command::Radio(0)),
        Key::Digit2 => Some(Command::Radio(1)),
        Key::Escape => Some(Command::Exit),
        _ => None,
    }
}

/// Current values of the three light sliders.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderBank {
    config: SliderConfig,
    values: [f32; 3],
}

impl SliderBank {
    /// Starts each slider at the matching light component, clamped to range.
    pub fn from_state(config: SliderConfig, state: &InteractionState) -> Self {
        let values = LightAxis::ALL.map(|axis| {
            state
                .light_component(axis)
                .clamp(config.min, config.max)
        });
        Self { config, values }
    }

    pub fn value(&self, axis: LightAxis) -> f32 {
        self.values[index(axis)]
    }

    /// Light components in `state` that disagree with the sliders, paired
    /// with the slider value that should replace them.
    pub fn corrections(&self, state: &InteractionState) -> Vec<(LightAxis, f32)> {
        LightAxis::ALL
            .into_iter()
            .map(|axis| (axis, self.value(axis)))
            .filter(|&(axis, value)| state.light_component(axis) != value)
            .collect()
    }

    /// Moves one slider by a step. Returns the new value, or `None` when the
    /// slider already sits at the end of its range.
    pub fn step(&mut self, axis: LightAxis, direction: i8) -> Option<f32> {
        let slot = &mut self.values[index(axis)];
        let next = (*slot + f32::from(direction.signum()) * self.config.step)
            .clamp(self.config.min, self.config.max);
        if next == *slot {
            return None;
        }
        *slot = next;
        Some(next)
    }
}

fn index(axis: LightAxis) -> usize {
    match axis {
        LightAxis::X => 0,
        LightAxis::Y => 1,
        LightAxis::Z => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pressed(key: Key) -> InputEvent {
        InputEvent::Key {
            key,
            state: KeyState::Pressed,
            repeat: false,
        }
    }

    fn left(state: ButtonState, x: f32, y: f32) -> InputEvent {
        InputEvent::PointerButton {
            button: MouseButton::Left,
            state,
            x,
            y,
        }
    }

    /// Applies the event to `input` the way the runtime does, then maps it.
    fn feed(input: &mut InputState, event: InputEvent) -> Option<Command> {
        input.apply_event(&event);
        map_event(&event, input)
    }

    // ── pointer ──────────────────────────────────────────────────────────

    #[test]
    fn left_button_drives_a_drag() {
        let mut input = InputState::default();
        assert_eq!(
            feed(&mut input, left(ButtonState::Pressed, 10.0, 20.0)),
            Some(Command::DragStart { x: 10.0, y: 20.0 })
        );
        assert_eq!(
            feed(&mut input, InputEvent::PointerMoved { x: 12.0, y: 25.0 }),
            Some(Command::DragMove { x: 12.0, y: 25.0 })
        );
        assert_eq!(
            feed(&mut input, left(ButtonState::Released, 12.0, 25.0)),
            Some(Command::DragEnd)
        );
        assert_eq!(
            feed(&mut input, InputEvent::PointerMoved { x: 30.0, y: 30.0 }),
            None
        );
    }

    #[test]
    fn right_button_does_not_drag() {
        let mut input = InputState::default();
        let ev = InputEvent::PointerButton {
            button: MouseButton::Right,
            state: ButtonState::Pressed,
            x: 0.0,
            y: 0.0,
        };
        assert_eq!(feed(&mut input, ev), None);
        assert_eq!(
            feed(&mut input, InputEvent::PointerMoved { x: 5.0, y: 5.0 }),
            None
        );
    }

    #[test]
    fn focus_loss_ends_drag() {
        let mut input = InputState::default();
        feed(&mut input, left(ButtonState::Pressed, 0.0, 0.0));
        assert_eq!(
            feed(&mut input, InputEvent::Focused(false)),
            Some(Command::DragEnd)
        );
    }

    // ── keys ─────────────────────────────────────────────────────────────

    #[test]
    fn slider_keys_map_to_axes() {
        let input = InputState::default();
        assert_eq!(
            map_event(&pressed(Key::Q), &input),
            Some(Command::StepSlider { axis: LightAxis::X, direction: 1 })
        );
        assert_eq!(
            map_event(&pressed(Key::S), &input),
            Some(Command::StepSlider { axis: LightAxis::Y, direction: -1 })
        );
        assert_eq!(
            map_event(&pressed(Key::E), &input),
            Some(Command::StepSlider { axis: LightAxis::Z, direction: 1 })
        );
    }

    #[test]
    fn digits_select_radio_values() {
        let input = InputState::default();
        assert_eq!(map_event(&pressed(Key::Digit1), &input), Some(Command::Radio(0)));
        assert_eq!(map_event(&pressed(Key::Digit2), &input), Some(Command::Radio(1)));
        assert_eq!(map_event(&pressed(Key::Digit3), &input), None);
    }

    #[test]
    fn repeat_steps_sliders_but_not_radio() {
        let input = InputState::default();
        let repeat = |key| InputEvent::Key {
            key,
            state: KeyState::Pressed,
            repeat: true,
        };
        assert!(map_event(&repeat(Key::W), &input).is_some());
        assert_eq!(map_event(&repeat(Key::Digit2), &input), None);
        assert_eq!(map_event(&repeat(Key::Escape), &input), None);
    }

    #[test]
    fn releases_are_ignored() {
        let input = InputState::default();
        let ev = InputEvent::Key {
            key: Key::Escape,
            state: KeyState::Released,
            repeat: false,
        };
        assert_eq!(map_event(&ev, &input), None);
    }

    // ── sliders ──────────────────────────────────────────────────────────

    #[test]
    fn sliders_start_at_default_light() {
        let bank = SliderBank::from_state(SliderConfig::default(), &InteractionState::default());
        assert_eq!(bank.value(LightAxis::X), 0.0);
        assert_eq!(bank.value(LightAxis::Y), 3.0);
        assert_eq!(bank.value(LightAxis::Z), 3.0);
    }

    #[test]
    fn step_moves_by_configured_amount() {
        let mut bank =
            SliderBank::from_state(SliderConfig::default(), &InteractionState::default());
        assert_eq!(bank.step(LightAxis::Y, 1), Some(3.5));
        assert_eq!(bank.step(LightAxis::Y, -1), Some(3.0));
        assert_eq!(bank.value(LightAxis::X), 0.0);
    }

    #[test]
    fn step_stops_at_range_end() {
        let config = SliderConfig {
            min: -1.0,
            max: 1.0,
            step: 0.75,
        };
        let mut bank = SliderBank::from_state(config, &InteractionState::default());
        // Y starts clamped to 1.0.
        assert_eq!(bank.value(LightAxis::Y), 1.0);
        assert_eq!(bank.step(LightAxis::Y, 1), None);
        assert_eq!(bank.step(LightAxis::X, 1), Some(0.75));
        assert_eq!(bank.step(LightAxis::X, 1), Some(1.0));
        assert_eq!(bank.step(LightAxis::X, 1), None);
    }

    #[test]
    fn in_range_start_needs_no_correction() {
        let state = InteractionState::default();
        let bank = SliderBank::from_state(SliderConfig::default(), &state);
        assert!(bank.corrections(&state).is_empty());
    }

    #[test]
    fn clamped_start_is_pushed_back_into_the_light() {
        let config = SliderConfig {
            min: -1.0,
            max: 1.0,
            step: 0.5,
        };
        let mut state = InteractionState::default();
        let bank = SliderBank::from_state(config, &state);
        let corrections = bank.corrections(&state);
        assert_eq!(corrections, vec![(LightAxis::Y, 1.0), (LightAxis::Z, 1.0)]);

        for (axis, value) in corrections {
            state.set_light_component(axis, value);
        }
        for axis in LightAxis::ALL {
            assert_eq!(state.light_component(axis), bank.value(axis));
        }
        assert!(bank.corrections(&state).is_empty());
    }
}
