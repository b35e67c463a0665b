//! GPU-resident mesh buffers and the bind-draw-unbind sequence.

use crate::gl::{AttribLayout, GraphicsApi};

use super::mesh::{AssetError, MeshData};
use super::shader::ShaderProgram;

/// One array buffer per vertex attribute plus the element buffer.
pub struct GeometryStore<G: GraphicsApi> {
    positions: G::Buffer,
    normals: G::Buffer,
    tex_coords: G::Buffer,
    indices: G::Buffer,
    index_count: u32,
}

impl<G: GraphicsApi> GeometryStore<G> {
    /// Uploads `mesh` into four immutable buffers.
    pub fn create(gl: &mut G, mesh: &MeshData) -> Result<Self, AssetError> {
        mesh.validate()?;

        let positions = gl.create_array_buffer("mesh positions", bytemuck::cast_slice(&mesh.positions));
        let normals = gl.create_array_buffer("mesh normals", bytemuck::cast_slice(&mesh.normals));
        let tex_coords = gl.create_array_buffer("mesh tex coords", bytemuck::cast_slice(&mesh.tex_coords));
        let indices = gl.create_element_buffer("mesh indices", &mesh.indices);

        log::debug!(
            "geometry uploaded: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.indices.len() / 3
        );

        Ok(Self {
            positions,
            normals,
            tex_coords,
            indices,
            index_count: mesh.indices.len() as u32,
        })
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Activates `program`, wires every attribute the program uses to its
    /// buffer, draws the triangle list and disables exactly the attributes it
    /// enabled. Attributes the program lacks are left untouched.
    pub fn bind_and_draw(&self, gl: &mut G, program: &ShaderProgram<G>) {
        let bindings = program.bindings();
        let streams = [
            (bindings.vertex_position, &self.positions, 3),
            (bindings.vertex_normal, &self.normals, 3),
            (bindings.vertex_tex_coord, &self.tex_coords, 2),
        ];

        gl.use_program(program.handle());

        for (location, buffer, components) in &streams {
            let Some(location) = *location else { continue };
            gl.bind_array_buffer(buffer);
            gl.vertex_attrib_pointer(location, AttribLayout::packed(*components));
            gl.enable_vertex_attrib(location);
        }

        gl.bind_element_buffer(&self.indices);
        gl.draw_triangles(self.index_count);

        for (location, _, _) in &streams {
            if let Some(location) = *location {
                gl.disable_vertex_attrib(location);
            }
        }
    }
}
