//! Shader programs and their resolved attribute/uniform bindings.

use glam::{Mat4, Vec4};

use crate::gl::{GraphicsApi, ShaderError};

pub const PROJECTION_MATRIX: &str = "projection_matrix";
pub const VIEW_MATRIX: &str = "view_matrix";
pub const MODEL_MATRIX: &str = "model_matrix";
pub const LIGHT_POSITION: &str = "light_position";

pub const VERTEX_POSITION: &str = "vertex_position";
pub const VERTEX_NORMAL: &str = "vertex_normal";
pub const VERTEX_TEX_COORD: &str = "vertex_tex_coord";

/// Labelled WGSL source pair.
#[derive(Debug, Copy, Clone)]
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
}

impl<'a> From<(&'a str, &'a str, &'a str)> for ProgramSource<'a> {
    fn from((label, vertex, fragment): (&'a str, &'a str, &'a str)) -> Self {
        Self {
            label,
            vertex,
            fragment,
        }
    }
}

/// The three built-in programs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Lambert-lit, texture-mapped model.
    Textured,
    /// Projected shadow shaded by how squarely the occluding face meets the light.
    DiffuseShadow,
    /// Projected shadow in one flat colour.
    TotalShadow,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 3] = [
        ProgramKind::Textured,
        ProgramKind::DiffuseShadow,
        ProgramKind::TotalShadow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProgramKind::Textured => "textured",
            ProgramKind::DiffuseShadow => "diffuse shadow",
            ProgramKind::TotalShadow => "total shadow",
        }
    }

    pub fn sources(self) -> ProgramSource<'static> {
        let (vertex, fragment) = match self {
            ProgramKind::Textured => (
                include_str!("shaders/textured.vert.wgsl"),
                include_str!("shaders/textured.frag.wgsl"),
            ),
            ProgramKind::DiffuseShadow => (
                include_str!("shaders/diffuse_shadow.vert.wgsl"),
                include_str!("shaders/diffuse_shadow.frag.wgsl"),
            ),
            ProgramKind::TotalShadow => (
                include_str!("shaders/total_shadow.vert.wgsl"),
                include_str!("shaders/total_shadow.frag.wgsl"),
            ),
        };
        ProgramSource {
            label: self.label(),
            vertex,
            fragment,
        }
    }
}

/// Locations resolved once at link time. `None` means the program does not
/// use that input and every upload or enable for it is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramBindings<U> {
    pub projection_matrix: Option<U>,
    pub view_matrix: Option<U>,
    pub model_matrix: Option<U>,
    pub light_position: Option<U>,
    pub vertex_position: Option<u32>,
    pub vertex_normal: Option<u32>,
    pub vertex_tex_coord: Option<u32>,
}

pub struct ShaderProgram<G: GraphicsApi> {
    label: String,
    program: G::Program,
    bindings: ProgramBindings<G::UniformLocation>,
}

impl<G: GraphicsApi> ShaderProgram<G> {
    /// Builds the program and resolves its bindings. A failed program leaves
    /// nothing behind.
    pub fn compile_and_link<'a>(
        gl: &mut G,
        source: impl Into<ProgramSource<'a>>,
    ) -> Result<Self, ShaderError> {
        let source = source.into();
        let program = gl.create_program(source.label, source.vertex, source.fragment)?;
        let bindings = Self::resolve_bindings(gl, &program);
        log::debug!("program `{}` linked: {:?}", source.label, DebugLocations(&bindings));

        Ok(Self {
            label: source.label.to_string(),
            program,
            bindings,
        })
    }

    /// Looks up the fixed uniform and attribute names.
    pub fn resolve_bindings(gl: &G, program: &G::Program) -> ProgramBindings<G::UniformLocation> {
        ProgramBindings {
            projection_matrix: gl.uniform_location(program, PROJECTION_MATRIX),
            view_matrix: gl.uniform_location(program, VIEW_MATRIX),
            model_matrix: gl.uniform_location(program, MODEL_MATRIX),
            light_position: gl.uniform_location(program, LIGHT_POSITION),
            vertex_position: gl.attrib_location(program, VERTEX_POSITION),
            vertex_normal: gl.attrib_location(program, VERTEX_NORMAL),
            vertex_tex_coord: gl.attrib_location(program, VERTEX_TEX_COORD),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn handle(&self) -> &G::Program {
        &self.program
    }

    pub fn bindings(&self) -> &ProgramBindings<G::UniformLocation> {
        &self.bindings
    }

    /// Activates the program and uploads the three transforms.
    pub fn apply_transforms(&self, gl: &mut G, projection: &Mat4, view: &Mat4, model: &Mat4) {
        gl.use_program(&self.program);
        gl.uniform_matrix4(self.bindings.projection_matrix.as_ref(), projection);
        gl.uniform_matrix4(self.bindings.view_matrix.as_ref(), view);
        gl.uniform_matrix4(self.bindings.model_matrix.as_ref(), model);
    }

    /// Activates the program and uploads the light position.
    pub fn set_light_position(&self, gl: &mut G, light: Vec4) {
        gl.use_program(&self.program);
        gl.uniform_vec4(self.bindings.light_position.as_ref(), light);
    }
}

/// Logs which names resolved without requiring `Debug` on backend handles.
struct DebugLocations<'a, U>(&'a ProgramBindings<U>);

impl<U> std::fmt::Debug for DebugLocations<'_, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = self.0;
        f.debug_struct("bindings")
            .field("position", &b.vertex_position)
            .field("normal", &b.vertex_normal)
            .field("tex_coord", &b.vertex_tex_coord)
            .field("light", &b.light_position.is_some())
            .finish()
    }
}
