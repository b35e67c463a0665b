//! Projection, view and model matrices for one frame.
//!
//! Matrices follow GL conventions (right-handed, clip depth in [-w, w]);
//! the vertex shaders remap depth for wgpu.

use glam::{Mat4, Vec3};

use super::state::Orientation;

pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
pub const ASPECT_RATIO: f32 = 1.0;
pub const NEAR_PLANE: f32 = 1.0;
pub const FAR_PLANE: f32 = 10.0;

/// Camera sits five units back along +z, looking down -z.
pub const CAMERA_TRANSLATION: Vec3 = Vec3::new(0.0, 0.0, -5.0);

/// Model is lifted one unit so it floats above the shadow plane.
pub const MODEL_TRANSLATION: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Shadows are drawn just above y = 0.
pub const SHADOW_GROUND_Y: f32 = 0.001;

/// A vertex must sit at least this far below the light to cast onto the
/// ground.
pub const SHADOW_MIN_DROP: f32 = 0.0001;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transforms {
    pub projection: Mat4,
    pub view: Mat4,
    pub model: Mat4,
}

/// Builds the frame's matrices. The view applies pitch about x after yaw
/// about y, both in degrees.
pub fn compute(orientation: Orientation, model_translation: Vec3) -> Transforms {
    let projection = Mat4::perspective_rh_gl(
        FIELD_OF_VIEW_DEGREES.to_radians(),
        ASPECT_RATIO,
        NEAR_PLANE,
        FAR_PLANE,
    );

    let view = Mat4::from_translation(CAMERA_TRANSLATION)
        * Mat4::from_rotation_x(orientation.pitch.to_radians())
        * Mat4::from_rotation_y(orientation.yaw.to_radians());

    let model = Mat4::from_translation(model_translation);

    Transforms {
        projection,
        view,
        model,
    }
}

/// Where the ray from `light` through the world-space vertex meets the
/// shadow plane. `None` when the vertex is level with or above the light;
/// the shadow shaders discard every triangle touching such a vertex.
pub fn shadow_ground_point(light: Vec3, world: Vec3) -> Option<Vec3> {
    let below_light = light.y - world.y;
    if below_light <= SHADOW_MIN_DROP {
        return None;
    }
    let t = light.y / below_light;
    let mut ground = light + (world - light) * t;
    ground.y = SHADOW_GROUND_Y;
    Some(ground)
}
