//! Mesh source: a JSON file in the asset-script layout, or the built-in cube.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use vertexshadow_engine::render::MeshData;

/// On-disk mesh layout. Attributes are per-vertex tuples and `triangles`
/// holds index triples.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshFile {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub triangles: Vec<[u32; 3]>,
}

impl MeshFile {
    /// Flattens the triangle list and validates the result.
    pub fn into_mesh(self) -> Result<MeshData> {
        let mut indices = Vec::with_capacity(self.triangles.len() * 3);
        for (t, tri) in self.triangles.iter().enumerate() {
            for &i in tri {
                let i = u16::try_from(i)
                    .with_context(|| format!("triangle {t} index {i} exceeds 16 bits"))?;
                indices.push(i);
            }
        }

        let mesh = MeshData {
            positions: self.positions,
            normals: self.normals,
            tex_coords: self.tex_coords,
            indices,
        };
        mesh.validate()?;
        Ok(mesh)
    }
}

pub fn parse_mesh(json: &str) -> Result<MeshData> {
    let file: MeshFile = serde_json::from_str(json).context("malformed mesh JSON")?;
    file.into_mesh()
}

/// Loads the mesh at `path`, or the unit cube when no path is given.
pub fn load_mesh(path: Option<&Path>) -> Result<MeshData> {
    let Some(path) = path else {
        log::info!("no mesh given; using the built-in cube");
        return Ok(MeshData::unit_cube());
    };

    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let parsed: MeshFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("malformed mesh JSON in {}", path.display()))?;
    parsed
        .into_mesh()
        .with_context(|| format!("invalid mesh in {}", path.display()))
}
