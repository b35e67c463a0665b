//! Stateful, GL-style graphics seam.
//!
//! The rendering core talks to the GPU through [`GraphicsApi`]: a small
//! bind-then-draw interface with a current program, a current array buffer,
//! a set of enabled vertex attributes and a current texture. Programs are
//! written in WGSL with `vs_main`/`fs_main` entry points; attribute and
//! uniform names are resolved by reflection (see [`reflect`]).
//!
//! Two backends exist:
//! - [`WgpuGl`] records draws and replays them into a wgpu render pass.
//! - [`recording::RecordingGl`] keeps a call log for headless tests.

use std::fmt;

use glam::{Mat4, Vec4};
use image::RgbaImage;

pub mod recording;
pub mod reflect;
mod wgpu_backend;

pub use wgpu_backend::{BufferId, ProgramId, TextureId, UniformSlot, WgpuGl};

/// Pipeline stage a shader source belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Program build failure. Carries the diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{diagnostic}")]
    Compile {
        stage: ShaderStage,
        diagnostic: String,
    },

    #[error("program failed to link: {diagnostic}")]
    Link { diagnostic: String },
}

impl ShaderError {
    pub(crate) fn link(diagnostic: impl Into<String>) -> Self {
        ShaderError::Link {
            diagnostic: diagnostic.into(),
        }
    }
}

/// How a float vertex attribute is read from the bound array buffer.
///
/// Stride 0 means tightly packed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AttribLayout {
    pub components: u8,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
}

impl AttribLayout {
    /// Tightly packed, non-normalized float attribute.
    pub const fn packed(components: u8) -> Self {
        Self {
            components,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    /// Distance in bytes between consecutive elements.
    pub fn effective_stride(&self) -> u32 {
        if self.stride == 0 {
            u32::from(self.components) * 4
        } else {
            self.stride
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// GL-style immediate interface used by the rendering core.
///
/// Every method acts on implicit binding state, mirroring the classic
/// bind-then-draw model. Passing `None` as a uniform location is a no-op, the
/// same way a `-1` location is ignored in GL.
pub trait GraphicsApi {
    type Buffer: Clone;
    type Program: Clone;
    type Texture: Clone;
    type UniformLocation: Clone;

    fn create_array_buffer(&mut self, label: &str, data: &[f32]) -> Self::Buffer;
    fn create_element_buffer(&mut self, label: &str, data: &[u16]) -> Self::Buffer;

    /// Compiles both stages and links them. Compile failures are reported
    /// before link failures.
    fn create_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self::Program, ShaderError>;

    /// Location of a named vertex input, `None` when the program does not use it.
    fn attrib_location(&self, program: &Self::Program, name: &str) -> Option<u32>;

    /// Location of a named uniform, `None` when the program does not declare it.
    fn uniform_location(&self, program: &Self::Program, name: &str)
    -> Option<Self::UniformLocation>;

    fn use_program(&mut self, program: &Self::Program);

    /// Uploads a column-major 4×4 matrix to the current program.
    fn uniform_matrix4(&mut self, location: Option<&Self::UniformLocation>, value: &Mat4);
    fn uniform_vec4(&mut self, location: Option<&Self::UniformLocation>, value: Vec4);

    fn bind_array_buffer(&mut self, buffer: &Self::Buffer);

    /// Points `location` at the currently bound array buffer.
    fn vertex_attrib_pointer(&mut self, location: u32, layout: AttribLayout);
    fn enable_vertex_attrib(&mut self, location: u32);
    fn disable_vertex_attrib(&mut self, location: u32);

    fn bind_element_buffer(&mut self, buffer: &Self::Buffer);

    /// Draws `index_count` u16 indices from the bound element buffer as a
    /// triangle list.
    fn draw_triangles(&mut self, index_count: u32);

    /// Largest width or height `tex_image_2d` accepts.
    fn max_texture_dimension(&self) -> u32;

    fn create_texture(&mut self, label: &str) -> Self::Texture;
    fn bind_texture(&mut self, texture: Option<&Self::Texture>);

    /// Replaces level 0 of the bound texture. Rows are taken top to bottom as
    /// stored in `image`.
    fn tex_image_2d(&mut self, image: &RgbaImage);

    /// Builds the full mip chain of the bound texture from level 0.
    fn generate_mipmap(&mut self);

    fn tex_filter(&mut self, mag: TextureFilter, min: TextureFilter);

    /// Clears colour and depth of the frame being recorded.
    fn clear(&mut self, color: [f32; 4]);
    fn enable_depth_test(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_layout_stride_follows_components() {
        assert_eq!(AttribLayout::packed(3).effective_stride(), 12);
        assert_eq!(AttribLayout::packed(2).effective_stride(), 8);

        let strided = AttribLayout {
            stride: 32,
            ..AttribLayout::packed(3)
        };
        assert_eq!(strided.effective_stride(), 32);
    }

    #[test]
    fn shader_error_messages_name_the_stage() {
        let err = ShaderError::Compile {
            stage: ShaderStage::Fragment,
            diagnostic: "expected `;`".into(),
        };
        assert!(err.to_string().starts_with("fragment shader failed to compile"));
        assert!(ShaderError::link("no vs_main").to_string().contains("no vs_main"));
    }
}
