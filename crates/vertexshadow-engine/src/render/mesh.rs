//! Indexed triangle mesh data and its validation.

use glam::Vec3;

/// Mesh validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("mesh has no vertices or no triangles")]
    Empty,

    #[error("{attribute} has {found} entries, expected {expected} (one per vertex)")]
    LengthMismatch {
        attribute: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("index list length {0} is not a multiple of 3")]
    IncompleteTriangle(usize),

    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        position: usize,
        index: u16,
        vertex_count: usize,
    },

    #[error("mesh has {0} vertices; 16-bit indices address at most 65536")]
    TooManyVertices(usize),

    #[error("{attribute} of vertex {vertex} is not finite")]
    NonFinite {
        attribute: &'static str,
        vertex: usize,
    },
}

/// Vertex attributes in parallel arrays plus a flat u16 triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u16>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Checks that every attribute has one entry per vertex and that every
    /// index addresses an existing vertex.
    pub fn validate(&self) -> Result<(), AssetError> {
        let vertex_count = self.positions.len();
        if vertex_count == 0 || self.indices.is_empty() {
            return Err(AssetError::Empty);
        }
        if vertex_count > usize::from(u16::MAX) + 1 {
            return Err(AssetError::TooManyVertices(vertex_count));
        }

        for (attribute, found) in [("normals", self.normals.len()), ("tex_coords", self.tex_coords.len())] {
            if found != vertex_count {
                return Err(AssetError::LengthMismatch {
                    attribute,
                    expected: vertex_count,
                    found,
                });
            }
        }

        if self.indices.len() % 3 != 0 {
            return Err(AssetError::IncompleteTriangle(self.indices.len()));
        }

        if let Some((position, &index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|(_, i)| usize::from(**i) >= vertex_count)
        {
            return Err(AssetError::IndexOutOfRange {
                position,
                index,
                vertex_count,
            });
        }

        check_finite("positions", self.positions.iter().map(|p| p.as_slice()))?;
        check_finite("normals", self.normals.iter().map(|n| n.as_slice()))?;
        check_finite("tex_coords", self.tex_coords.iter().map(|t| t.as_slice()))?;

        Ok(())
    }

    /// Cube of side 1 centred at the origin with per-face normals and a full
    /// texture on every face.
    pub fn unit_cube() -> Self {
        // (outward normal, u axis, v axis) with u × v = normal
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];

        let mut mesh = MeshData::default();
        for (normal, u, v) in faces {
            let base = mesh.positions.len() as u16;
            for (s, t) in corners {
                let p = normal * 0.5 + u * (s - 0.5) + v * (t - 0.5);
                mesh.positions.push(p.to_array());
                mesh.normals.push(normal.to_array());
                mesh.tex_coords.push([s, t]);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }
}

fn check_finite<'a>(
    attribute: &'static str,
    values: impl Iterator<Item = &'a [f32]>,
) -> Result<(), AssetError> {
    for (vertex, v) in values.enumerate() {
        if v.iter().any(|c| !c.is_finite()) {
            return Err(AssetError::NonFinite { attribute, vertex });
        }
    }
    Ok(())
}
