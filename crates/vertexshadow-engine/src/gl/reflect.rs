//! WGSL front end shared by every backend.
//!
//! Parses and validates both stages with naga, then derives the GL-style view
//! of the program: named vertex inputs with their locations, and named members
//! of the uniform block with their byte offsets. Interface mismatches between
//! the two stages are reported as link failures.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Handle, ImageClass, ImageDimension, Module, ScalarKind, Type, TypeInner, VectorSize};

use super::{ShaderError, ShaderStage};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Largest uniform block a program may declare, in bytes.
pub const MAX_UNIFORM_BLOCK: u32 = 256;

/// Bind group holding the uniform block.
pub const UNIFORM_GROUP: u32 = 0;
/// Bind group holding the sampled texture (binding 0) and its sampler (binding 1).
pub const TEXTURE_GROUP: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,
    pub location: u32,
    pub components: u8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    Vec4,
    Other,
}

impl UniformKind {
    pub fn byte_len(self) -> usize {
        match self {
            UniformKind::Mat4 => 64,
            UniformKind::Vec4 => 16,
            UniformKind::Other => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    pub name: String,
    pub offset: u32,
    pub kind: UniformKind,
}

/// Linked view of a vertex/fragment pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramLayout {
    pub attributes: Vec<AttributeInfo>,
    pub uniforms: Vec<UniformInfo>,
    pub uniform_block_size: u32,
    pub samples_texture: bool,
}

impl ProgramLayout {
    /// Compiles and links a program from WGSL sources.
    pub fn from_wgsl(vertex_source: &str, fragment_source: &str) -> Result<Self, ShaderError> {
        let vertex = compile(vertex_source, ShaderStage::Vertex)?;
        let fragment = compile(fragment_source, ShaderStage::Fragment)?;
        link(&vertex, &fragment)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformInfo> {
        self.uniforms.iter().find(|u| u.name == name)
    }
}

fn compile(source: &str, stage: ShaderStage) -> Result<Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        diagnostic: e.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| ShaderError::Compile {
            stage,
            diagnostic: e.emit_to_string(source),
        })?;

    Ok(module)
}

fn link(vertex: &Module, fragment: &Module) -> Result<ProgramLayout, ShaderError> {
    let vs = entry_point(vertex, naga::ShaderStage::Vertex, VERTEX_ENTRY)?;
    let fs = entry_point(fragment, naga::ShaderStage::Fragment, FRAGMENT_ENTRY)?;

    let mut attributes = Vec::new();
    for (name, location, ty) in location_inputs(vertex, vs) {
        let components = float_components(vertex, ty).ok_or_else(|| {
            ShaderError::link(format!("vertex input `{name}` must be an f32 scalar or vector"))
        })?;
        attributes.push(AttributeInfo {
            name,
            location,
            components,
        });
    }
    attributes.sort_by_key(|a| a.location);

    let outputs = location_outputs(vertex, vs);
    for (name, location, ty) in location_inputs(fragment, fs) {
        let Some((_, out_ty)) = outputs.iter().find(|(l, _)| *l == location) else {
            return Err(ShaderError::link(format!(
                "fragment input `{name}` at location {location} is not written by the vertex stage"
            )));
        };
        if vertex.types[*out_ty].inner != fragment.types[ty].inner {
            return Err(ShaderError::link(format!(
                "fragment input `{name}` at location {location} does not match the vertex output type"
            )));
        }
    }

    let mut uniforms: Vec<UniformInfo> = Vec::new();
    let mut uniform_block_size = 0;
    let mut samples_texture = false;
    for module in [vertex, fragment] {
        let (members, span) = uniform_block(module)?;
        uniform_block_size = uniform_block_size.max(span);
        for member in members {
            match uniforms.iter().find(|u| u.name == member.name) {
                Some(existing) if existing.offset != member.offset || existing.kind != member.kind => {
                    return Err(ShaderError::link(format!(
                        "uniform `{}` is declared differently in the two stages",
                        member.name
                    )));
                }
                Some(_) => {}
                None => uniforms.push(member),
            }
        }
        samples_texture |= check_resources(module)?;
    }

    if uniform_block_size > MAX_UNIFORM_BLOCK {
        return Err(ShaderError::link(format!(
            "uniform block is {uniform_block_size} bytes, limit is {MAX_UNIFORM_BLOCK}"
        )));
    }

    Ok(ProgramLayout {
        attributes,
        uniforms,
        uniform_block_size,
        samples_texture,
    })
}

fn entry_point<'m>(
    module: &'m Module,
    stage: naga::ShaderStage,
    name: &str,
) -> Result<&'m naga::EntryPoint, ShaderError> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage && ep.name == name)
        .ok_or_else(|| ShaderError::link(format!("missing {stage:?} entry point `{name}`")))
}

/// `@location` inputs of an entry point, flattening struct arguments.
fn location_inputs(module: &Module, ep: &naga::EntryPoint) -> Vec<(String, u32, Handle<Type>)> {
    let mut out = Vec::new();
    for arg in &ep.function.arguments {
        match (&arg.binding, &module.types[arg.ty].inner) {
            (Some(Binding::Location { location, .. }), _) => {
                out.push((arg.name.clone().unwrap_or_default(), *location, arg.ty));
            }
            (None, TypeInner::Struct { members, .. }) => {
                for m in members {
                    if let Some(Binding::Location { location, .. }) = m.binding {
                        out.push((m.name.clone().unwrap_or_default(), location, m.ty));
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn location_outputs(module: &Module, ep: &naga::EntryPoint) -> Vec<(u32, Handle<Type>)> {
    let Some(result) = &ep.function.result else {
        return Vec::new();
    };
    match (&result.binding, &module.types[result.ty].inner) {
        (Some(Binding::Location { location, .. }), _) => vec![(*location, result.ty)],
        (None, TypeInner::Struct { members, .. }) => members
            .iter()
            .filter_map(|m| match m.binding {
                Some(Binding::Location { location, .. }) => Some((location, m.ty)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn float_components(module: &Module, ty: Handle<Type>) -> Option<u8> {
    match module.types[ty].inner {
        TypeInner::Scalar(s) if s.kind == ScalarKind::Float && s.width == 4 => Some(1),
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float && scalar.width == 4 => {
            Some(size as u8)
        }
        _ => None,
    }
}

fn uniform_kind(inner: &TypeInner) -> UniformKind {
    match inner {
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar.kind == ScalarKind::Float => UniformKind::Mat4,
        TypeInner::Vector {
            size: VectorSize::Quad,
            scalar,
        } if scalar.kind == ScalarKind::Float => UniformKind::Vec4,
        _ => UniformKind::Other,
    }
}

/// Members of the single uniform block at `@group(0) @binding(0)` plus its size.
fn uniform_block(module: &Module) -> Result<(Vec<UniformInfo>, u32), ShaderError> {
    let mut found = None;
    for (_, var) in module.global_variables.iter() {
        if var.space != AddressSpace::Uniform {
            continue;
        }
        let at_block = var
            .binding
            .as_ref()
            .is_some_and(|b| b.group == UNIFORM_GROUP && b.binding == 0);
        if !at_block {
            return Err(ShaderError::link(format!(
                "uniform `{}` must live at @group({UNIFORM_GROUP}) @binding(0)",
                var.name.as_deref().unwrap_or("?")
            )));
        }
        found = Some(var);
    }

    let Some(var) = found else {
        return Ok((Vec::new(), 0));
    };

    let ty = &module.types[var.ty];
    match &ty.inner {
        TypeInner::Struct { members, span } => {
            let members = members
                .iter()
                .filter_map(|m| {
                    Some(UniformInfo {
                        name: m.name.clone()?,
                        offset: m.offset,
                        kind: uniform_kind(&module.types[m.ty].inner),
                    })
                })
                .collect();
            Ok((members, *span))
        }
        inner => {
            let kind = uniform_kind(inner);
            let info = UniformInfo {
                name: var.name.clone().unwrap_or_default(),
                offset: 0,
                kind,
            };
            Ok((vec![info], kind.byte_len() as u32))
        }
    }
}

/// Checks that sampled resources sit where the backends bind them.
/// Returns whether a texture is declared.
fn check_resources(module: &Module) -> Result<bool, ShaderError> {
    let mut has_texture = false;
    for (_, var) in module.global_variables.iter() {
        if var.space != AddressSpace::Handle {
            continue;
        }
        let name = var.name.as_deref().unwrap_or("?");
        let slot = var.binding.as_ref().map(|b| (b.group, b.binding));
        match (&module.types[var.ty].inner, slot) {
            (
                TypeInner::Image {
                    dim: ImageDimension::D2,
                    arrayed: false,
                    class: ImageClass::Sampled {
                        kind: ScalarKind::Float,
                        multi: false,
                    },
                },
                Some((TEXTURE_GROUP, 0)),
            ) => has_texture = true,
            (TypeInner::Sampler { comparison: false }, Some((TEXTURE_GROUP, 1))) => {}
            _ => {
                return Err(ShaderError::link(format!(
                    "resource `{name}` must be a texture_2d<f32> at @group({TEXTURE_GROUP}) @binding(0) \
                     or a sampler at @group({TEXTURE_GROUP}) @binding(1)"
                )));
            }
        }
    }
    Ok(has_texture)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r#"
struct Uniforms {
    model_matrix: mat4x4<f32>,
    tint: vec4<f32>,
};
@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) vertex_position: vec3<f32>, @location(2) vertex_tex_coord: vec2<f32>) -> VertexOut {
    var out: VertexOut;
    out.clip = u.model_matrix * vec4<f32>(vertex_position, 1.0);
    out.color = u.tint * vec4<f32>(vertex_tex_coord, 0.0, 1.0);
    return out;
}
"#;

    const FS: &str = r#"
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;

    // ── reflection ──

    #[test]
    fn reflects_attributes_by_location() {
        let layout = ProgramLayout::from_wgsl(VS, FS).unwrap();
        assert_eq!(
            layout.attributes,
            vec![
                AttributeInfo { name: "vertex_position".into(), location: 0, components: 3 },
                AttributeInfo { name: "vertex_tex_coord".into(), location: 2, components: 2 },
            ]
        );
        assert!(layout.attribute("vertex_normal").is_none());
        assert!(!layout.samples_texture);
    }

    #[test]
    fn reflects_uniform_offsets() {
        let layout = ProgramLayout::from_wgsl(VS, FS).unwrap();
        let model = layout.uniform("model_matrix").unwrap();
        assert_eq!((model.offset, model.kind), (0, UniformKind::Mat4));
        let tint = layout.uniform("tint").unwrap();
        assert_eq!((tint.offset, tint.kind), (64, UniformKind::Vec4));
        assert_eq!(layout.uniform_block_size, 80);
        assert!(layout.uniform("light_position").is_none());
    }

    #[test]
    fn detects_sampled_texture() {
        let fs = r#"
@group(1) @binding(0) var base_texture: texture_2d<f32>;
@group(1) @binding(1) var base_sampler: sampler;
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color * textureSample(base_texture, base_sampler, color.xy);
}
"#;
        let layout = ProgramLayout::from_wgsl(VS, fs).unwrap();
        assert!(layout.samples_texture);
    }

    // ── compile failures ──

    #[test]
    fn syntax_error_is_a_compile_error_for_that_stage() {
        let err = ProgramLayout::from_wgsl(VS, "fn fs_main( {").unwrap_err();
        match err {
            ShaderError::Compile { stage, diagnostic } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!diagnostic.is_empty());
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn vertex_stage_is_compiled_first() {
        let err = ProgramLayout::from_wgsl("not wgsl", "also not wgsl").unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Vertex, .. }));
    }

    #[test]
    fn type_error_is_a_compile_error() {
        let fs = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return 1.0;
}
"#;
        let err = ProgramLayout::from_wgsl(VS, fs).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Fragment, .. }));
    }

    // ── link failures ──

    #[test]
    fn missing_entry_point_is_a_link_error() {
        let fs = r#"
@fragment
fn main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;
        let err = ProgramLayout::from_wgsl(VS, fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn unmatched_fragment_input_is_a_link_error() {
        let fs = r#"
@fragment
fn fs_main(@location(3) shade: vec4<f32>) -> @location(0) vec4<f32> {
    return shade;
}
"#;
        let err = ProgramLayout::from_wgsl(VS, fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn mismatched_interface_type_is_a_link_error() {
        let fs = r#"
@fragment
fn fs_main(@location(0) color: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 0.0, 1.0);
}
"#;
        let err = ProgramLayout::from_wgsl(VS, fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn conflicting_uniform_blocks_are_a_link_error() {
        let fs = r#"
struct Uniforms {
    tint: vec4<f32>,
};
@group(0) @binding(0) var<uniform> u: Uniforms;
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color * u.tint;
}
"#;
        let err = ProgramLayout::from_wgsl(VS, fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn oversized_uniform_block_is_a_link_error() {
        let vs = r#"
struct Uniforms {
    a: mat4x4<f32>,
    b: mat4x4<f32>,
    c: mat4x4<f32>,
    d: mat4x4<f32>,
    e: vec4<f32>,
};
@group(0) @binding(0) var<uniform> u: Uniforms;
@vertex
fn vs_main(@location(0) vertex_position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return u.a * u.b * u.c * u.d * vec4<f32>(vertex_position, 1.0) + u.e;
}
"#;
        let fs = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;
        let err = ProgramLayout::from_wgsl(vs, fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }
}
