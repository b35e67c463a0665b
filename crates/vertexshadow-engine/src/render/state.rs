//! User-controlled scene state: model orientation, light position and the
//! selected shadow technique.

use glam::Vec4;

pub const DEFAULT_PITCH: f32 = 45.0;
pub const DEFAULT_YAW: f32 = -45.0;
pub const DEFAULT_LIGHT_POSITION: Vec4 = Vec4::new(0.0, 3.0, 3.0, 1.0);

/// Pitch stays within ±this many degrees.
pub const PITCH_LIMIT: f32 = 90.0;

/// Model rotation in degrees. Yaw is unbounded.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Orientation {
    pub pitch: f32,
    pub yaw: f32,
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            pitch: DEFAULT_PITCH,
            yaw: DEFAULT_YAW,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Technique {
    #[default]
    TotalShadow,
    DiffuseShadow,
}

impl Technique {
    /// Maps a radio-button value: 0 selects total shadow, 1 diffuse shadow.
    pub fn from_radio(value: u8) -> Option<Self> {
        match value {
            0 => Some(Technique::TotalShadow),
            1 => Some(Technique::DiffuseShadow),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LightAxis {
    X,
    Y,
    Z,
}

impl LightAxis {
    pub const ALL: [LightAxis; 3] = [LightAxis::X, LightAxis::Y, LightAxis::Z];
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionState {
    orientation: Orientation,
    light_position: Vec4,
    technique: Technique,
    /// Last pointer position while a drag is active.
    drag: Option<(f32, f32)>,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            orientation: Orientation::default(),
            light_position: DEFAULT_LIGHT_POSITION,
            technique: Technique::default(),
            drag: None,
        }
    }
}

impl InteractionState {
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn light_position(&self) -> Vec4 {
        self.light_position
    }

    pub fn technique(&self) -> Technique {
        self.technique
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn begin_drag(&mut self, x: f32, y: f32) {
        self.drag = Some((x, y));
    }

    /// Rotates by the pointer delta since the last sample: horizontal motion
    /// drives yaw, vertical motion drives pitch. Returns `false` (and changes
    /// nothing) when no drag is active.
    pub fn drag_to(&mut self, x: f32, y: f32) -> bool {
        let Some((last_x, last_y)) = self.drag else {
            return false;
        };
        self.drag = Some((x, y));
        self.rotate_by(x - last_x, y - last_y);
        true
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Adds `dx` degrees of yaw and `dy` degrees of pitch, clamping pitch.
    pub fn rotate_by(&mut self, dx: f32, dy: f32) {
        self.orientation.yaw += dx;
        self.orientation.pitch = (self.orientation.pitch + dy).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Sets one light coordinate; w stays 1.
    pub fn set_light_component(&mut self, axis: LightAxis, value: f32) {
        match axis {
            LightAxis::X => self.light_position.x = value,
            LightAxis::Y => self.light_position.y = value,
            LightAxis::Z => self.light_position.z = value,
        }
    }

    pub fn light_component(&self, axis: LightAxis) -> f32 {
        match axis {
            LightAxis::X => self.light_position.x,
            LightAxis::Y => self.light_position.y,
            LightAxis::Z => self.light_position.z,
        }
    }

    pub fn select_technique(&mut self, technique: Technique) {
        self.technique = technique;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults ──

    #[test]
    fn initial_state_matches_startup_scene() {
        let s = InteractionState::default();
        assert_eq!(s.orientation(), Orientation { pitch: 45.0, yaw: -45.0 });
        assert_eq!(s.light_position(), Vec4::new(0.0, 3.0, 3.0, 1.0));
        assert_eq!(s.technique(), Technique::TotalShadow);
        assert!(!s.is_dragging());
    }

    // ── dragging ──

    #[test]
    fn drag_maps_horizontal_to_yaw_and_vertical_to_pitch() {
        let mut s = InteractionState::default();
        s.begin_drag(100.0, 100.0);
        assert!(s.drag_to(110.0, 95.0));
        assert_eq!(s.orientation(), Orientation { pitch: 40.0, yaw: -35.0 });

        assert!(s.drag_to(120.0, 95.0));
        assert_eq!(s.orientation().yaw, -25.0);
    }

    #[test]
    fn pitch_clamps_at_upper_limit() {
        let mut s = InteractionState::default();
        s.begin_drag(0.0, 0.0);
        s.drag_to(0.0, 50.0);
        assert_eq!(s.orientation().pitch, 90.0);
        s.drag_to(0.0, 300.0);
        assert_eq!(s.orientation().pitch, 90.0);
    }

    #[test]
    fn pitch_clamps_at_lower_limit() {
        let mut s = InteractionState::default();
        s.rotate_by(0.0, -1000.0);
        assert_eq!(s.orientation().pitch, -90.0);
    }

    #[test]
    fn yaw_accumulates_without_wrapping() {
        let mut s = InteractionState::default();
        s.begin_drag(0.0, 0.0);
        s.drag_to(400.0, 0.0);
        assert_eq!(s.orientation().yaw, 355.0);
    }

    #[test]
    fn moves_without_drag_are_ignored() {
        let mut s = InteractionState::default();
        assert!(!s.drag_to(50.0, 50.0));
        s.begin_drag(0.0, 0.0);
        s.end_drag();
        assert!(!s.drag_to(50.0, 50.0));
        assert_eq!(s.orientation(), Orientation::default());
    }

    #[test]
    fn new_drag_starts_from_new_press_point() {
        let mut s = InteractionState::default();
        s.begin_drag(0.0, 0.0);
        s.drag_to(10.0, 0.0);
        s.end_drag();
        s.begin_drag(500.0, 500.0);
        s.drag_to(505.0, 500.0);
        assert_eq!(s.orientation().yaw, -45.0 + 15.0);
    }

    // ── light and technique ──

    #[test]
    fn light_components_update_independently_and_keep_w() {
        let mut s = InteractionState::default();
        s.set_light_component(LightAxis::Y, 7.5);
        s.set_light_component(LightAxis::X, -2.0);
        assert_eq!(s.light_position(), Vec4::new(-2.0, 7.5, 3.0, 1.0));
        assert_eq!(s.light_component(LightAxis::Z), 3.0);
    }

    #[test]
    fn radio_values_map_to_techniques() {
        assert_eq!(Technique::from_radio(0), Some(Technique::TotalShadow));
        assert_eq!(Technique::from_radio(1), Some(Technique::DiffuseShadow));
        assert_eq!(Technique::from_radio(2), None);
    }
}
