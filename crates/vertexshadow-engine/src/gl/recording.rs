//! Headless [`GraphicsApi`] that records every call.
//!
//! Programs go through the same WGSL front end as the wgpu backend, so
//! attribute/uniform resolution and shader failures behave identically.
//! Binding state is tracked the GL way: enabled attributes persist across
//! draws until explicitly disabled.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::{Mat4, Vec4};
use image::RgbaImage;

use super::reflect::ProgramLayout;
use super::{AttribLayout, GraphicsApi, ShaderError, TextureFilter};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordedBuffer(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordedProgram(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordedTexture(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordedUniform {
    pub program: RecordedProgram,
    pub name: String,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec4(Vec4),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferKind {
    Array,
    Element,
}

/// Snapshot of the binding state at a draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: Option<RecordedProgram>,
    pub index_count: u32,
    pub element_buffer: Option<RecordedBuffer>,
    /// Enabled attribute locations with the buffer they point at.
    pub attributes: BTreeMap<u32, Option<RecordedBuffer>>,
    pub texture: Option<RecordedTexture>,
    pub depth_test: bool,
}

impl DrawRecord {
    pub fn enabled_locations(&self) -> Vec<u32> {
        self.attributes.keys().copied().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateBuffer { buffer: RecordedBuffer, kind: BufferKind, len: usize },
    CreateProgram { program: RecordedProgram, label: String },
    UseProgram(RecordedProgram),
    Uniform { uniform: RecordedUniform, value: UniformValue },
    BindArrayBuffer(RecordedBuffer),
    VertexAttribPointer { location: u32, layout: AttribLayout },
    EnableVertexAttrib(u32),
    DisableVertexAttrib(u32),
    BindElementBuffer(RecordedBuffer),
    Draw(DrawRecord),
    CreateTexture(RecordedTexture),
    BindTexture(Option<RecordedTexture>),
    TexImage2d { width: u32, height: u32, first_pixel: [u8; 4] },
    GenerateMipmap,
    TexFilter { mag: TextureFilter, min: TextureFilter },
    Clear([f32; 4]),
    EnableDepthTest,
}

#[derive(Debug, Default)]
pub struct RecordingGl {
    calls: Vec<GlCall>,
    programs: Vec<ProgramLayout>,
    buffer_count: u32,
    texture_count: u32,

    current_program: Option<RecordedProgram>,
    array_buffer: Option<RecordedBuffer>,
    element_buffer: Option<RecordedBuffer>,
    texture: Option<RecordedTexture>,
    pointers: HashMap<u32, RecordedBuffer>,
    enabled: BTreeSet<u32>,
    depth_test: bool,
    uniforms: HashMap<RecordedUniform, UniformValue>,
    max_texture_dimension: Option<u32>,
}

/// wgpu's default `max_texture_dimension_2d`.
pub const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 8192;

impl RecordingGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports `max` as the texture size limit instead of the wgpu default.
    pub fn with_max_texture_dimension(mut self, max: u32) -> Self {
        self.max_texture_dimension = Some(max);
        self
    }

    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    /// Forgets recorded calls but keeps resources and binding state.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn draws(&self) -> Vec<&DrawRecord> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                GlCall::Draw(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Attribute locations enabled right now.
    pub fn enabled_attributes(&self) -> Vec<u32> {
        self.enabled.iter().copied().collect()
    }

    pub fn current_program(&self) -> Option<RecordedProgram> {
        self.current_program
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Last value uploaded to a named uniform of `program`.
    pub fn uniform(&self, program: RecordedProgram, name: &str) -> Option<UniformValue> {
        self.uniforms
            .get(&RecordedUniform {
                program,
                name: name.to_string(),
            })
            .copied()
    }

    fn layout(&self, program: &RecordedProgram) -> Option<&ProgramLayout> {
        self.programs.get(program.0 as usize)
    }

    fn upload(&mut self, location: Option<&RecordedUniform>, value: UniformValue) {
        let Some(location) = location else {
            return;
        };
        if self.current_program != Some(location.program) {
            log::warn!("uniform `{}` set while another program is current", location.name);
            return;
        }
        self.uniforms.insert(location.clone(), value);
        self.calls.push(GlCall::Uniform {
            uniform: location.clone(),
            value,
        });
    }

    fn create_buffer(&mut self, kind: BufferKind, len: usize) -> RecordedBuffer {
        let buffer = RecordedBuffer(self.buffer_count);
        self.buffer_count += 1;
        self.calls.push(GlCall::CreateBuffer { buffer, kind, len });
        buffer
    }
}

impl GraphicsApi for RecordingGl {
    type Buffer = RecordedBuffer;
    type Program = RecordedProgram;
    type Texture = RecordedTexture;
    type UniformLocation = RecordedUniform;

    fn create_array_buffer(&mut self, _label: &str, data: &[f32]) -> RecordedBuffer {
        self.create_buffer(BufferKind::Array, data.len())
    }

    fn create_element_buffer(&mut self, _label: &str, data: &[u16]) -> RecordedBuffer {
        self.create_buffer(BufferKind::Element, data.len())
    }

    fn create_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<RecordedProgram, ShaderError> {
        let layout = ProgramLayout::from_wgsl(vertex_source, fragment_source)?;
        let program = RecordedProgram(self.programs.len() as u32);
        self.programs.push(layout);
        self.calls.push(GlCall::CreateProgram {
            program,
            label: label.to_string(),
        });
        Ok(program)
    }

    fn attrib_location(&self, program: &RecordedProgram, name: &str) -> Option<u32> {
        self.layout(program)?.attribute(name).map(|a| a.location)
    }

    fn uniform_location(&self, program: &RecordedProgram, name: &str) -> Option<RecordedUniform> {
        self.layout(program)?.uniform(name)?;
        Some(RecordedUniform {
            program: *program,
            name: name.to_string(),
        })
    }

    fn use_program(&mut self, program: &RecordedProgram) {
        self.current_program = Some(*program);
        self.calls.push(GlCall::UseProgram(*program));
    }

    fn uniform_matrix4(&mut self, location: Option<&RecordedUniform>, value: &Mat4) {
        self.upload(location, UniformValue::Mat4(*value));
    }

    fn uniform_vec4(&mut self, location: Option<&RecordedUniform>, value: Vec4) {
        self.upload(location, UniformValue::Vec4(value));
    }

    fn bind_array_buffer(&mut self, buffer: &RecordedBuffer) {
        self.array_buffer = Some(*buffer);
        self.calls.push(GlCall::BindArrayBuffer(*buffer));
    }

    fn vertex_attrib_pointer(&mut self, location: u32, layout: AttribLayout) {
        if let Some(buffer) = self.array_buffer {
            self.pointers.insert(location, buffer);
        }
        self.calls.push(GlCall::VertexAttribPointer { location, layout });
    }

    fn enable_vertex_attrib(&mut self, location: u32) {
        self.enabled.insert(location);
        self.calls.push(GlCall::EnableVertexAttrib(location));
    }

    fn disable_vertex_attrib(&mut self, location: u32) {
        self.enabled.remove(&location);
        self.calls.push(GlCall::DisableVertexAttrib(location));
    }

    fn bind_element_buffer(&mut self, buffer: &RecordedBuffer) {
        self.element_buffer = Some(*buffer);
        self.calls.push(GlCall::BindElementBuffer(*buffer));
    }

    fn draw_triangles(&mut self, index_count: u32) {
        let attributes = self
            .enabled
            .iter()
            .map(|loc| (*loc, self.pointers.get(loc).copied()))
            .collect();
        self.calls.push(GlCall::Draw(DrawRecord {
            program: self.current_program,
            index_count,
            element_buffer: self.element_buffer,
            attributes,
            texture: self.texture,
            depth_test: self.depth_test,
        }));
    }

    fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension.unwrap_or(DEFAULT_MAX_TEXTURE_DIMENSION)
    }

    fn create_texture(&mut self, _label: &str) -> RecordedTexture {
        let texture = RecordedTexture(self.texture_count);
        self.texture_count += 1;
        self.calls.push(GlCall::CreateTexture(texture));
        texture
    }

    fn bind_texture(&mut self, texture: Option<&RecordedTexture>) {
        self.texture = texture.copied();
        self.calls.push(GlCall::BindTexture(self.texture));
    }

    fn tex_image_2d(&mut self, image: &RgbaImage) {
        let first_pixel = image.pixels().next().map(|p| p.0).unwrap_or_default();
        self.calls.push(GlCall::TexImage2d {
            width: image.width(),
            height: image.height(),
            first_pixel,
        });
    }

    fn generate_mipmap(&mut self) {
        self.calls.push(GlCall::GenerateMipmap);
    }

    fn tex_filter(&mut self, mag: TextureFilter, min: TextureFilter) {
        self.calls.push(GlCall::TexFilter { mag, min });
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(GlCall::Clear(color));
    }

    fn enable_depth_test(&mut self) {
        self.depth_test = true;
        self.calls.push(GlCall::EnableDepthTest);
    }
}
