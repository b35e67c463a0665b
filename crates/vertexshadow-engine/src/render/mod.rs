//! Rendering core.
//!
//! Everything here is generic over [`GraphicsApi`](crate::gl::GraphicsApi):
//! the same code drives the wgpu backend at runtime and the recording
//! backend in tests.
//!
//! Frame flow: input mutates [`InteractionState`], which requests a redraw
//! from the [`RedrawScheduler`]; the host then calls
//! [`RendererState::render`] once, which computes [`Transforms`] and draws
//! the textured pass followed by one shadow pass.

mod geometry;
mod mesh;
mod renderer;
mod schedule;
mod shader;
mod state;
mod texture;
mod transform;

pub use geometry::GeometryStore;
pub use mesh::{AssetError, MeshData};
pub use renderer::{CLEAR_COLOR, FrameRenderer, RendererState, ShadingSources};
pub use schedule::RedrawScheduler;
pub use shader::{ProgramBindings, ProgramKind, ProgramSource, ShaderProgram};
pub use state::{InteractionState, LightAxis, Orientation, PITCH_LIMIT, Technique};
pub use texture::{
    PendingTexture, TextureEvent, TextureLoadError, TextureResource, load_image, request_load,
};
pub use transform::{
    SHADOW_GROUND_Y, SHADOW_MIN_DROP, Transforms, compute as compute_transforms, shadow_ground_point,
};
