use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Indexed triangle mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Unit cube centred on the origin, used for light markers, the sky box
    /// and objects without a mesh file.
    pub fn unit_cube() -> Self {
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // normal, u axis, v axis
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ];
        let mut mesh = MeshData::default();
        for (normal, u, v) in FACES {
            let (n, u, v) = (Vec3::from(normal), Vec3::from(u), Vec3::from(v));
            let base = mesh.vertices.len() as u32;
            for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
                mesh.vertices.push(Vertex {
                    position: (n * 0.5 + u * su + v * sv).to_array(),
                    normal,
                });
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// Triangles transformed by `model`, for CPU-side shadow checks.
    pub fn triangles(&self, model: Mat4) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |tri| {
            [tri[0], tri[1], tri[2]].map(|index| {
                model.transform_point3(Vec3::from(self.vertices[index as usize].position))
            })
        })
    }
}

pub fn load_obj_file(path: impl AsRef<Path>) -> Result<MeshData> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read {}", path.display()))?;
    load_obj_from_str(&contents).with_context(|| format!("failed to parse OBJ {}", path.display()))
}

/// Parses an OBJ file from memory. Polygons are fan-triangulated and
/// missing normals are rebuilt from face geometry.
pub fn load_obj_from_str(data: &str) -> Result<MeshData> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut corners: Vec<Corner> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        let line_no = line_no + 1;
        match tag {
            "v" => positions.push(
                parse_vec3(parts).with_context(|| format!("invalid vertex on line {line_no}"))?,
            ),
            "vn" => normals.push(
                parse_vec3(parts).with_context(|| format!("invalid normal on line {line_no}"))?,
            ),
            "f" => {
                let polygon = parts
                    .map(parse_corner)
                    .collect::<Result<Vec<_>>>()
                    .with_context(|| format!("invalid face on line {line_no}"))?;
                if polygon.len() < 3 {
                    return Err(anyhow!("face on line {line_no} has fewer than 3 vertices"));
                }
                for i in 1..polygon.len() - 1 {
                    corners.extend_from_slice(&[polygon[0], polygon[i], polygon[i + 1]]);
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }

    let mut mesh = MeshData::default();
    let mut lookup: HashMap<(usize, Option<usize>), u32> = HashMap::new();
    let mut missing_normals = false;
    for corner in corners {
        let position = resolve_index(corner.position, positions.len())
            .ok_or_else(|| anyhow!("vertex index {} out of range", corner.position))?;
        let normal = corner
            .normal
            .and_then(|index| resolve_index(index, normals.len()));
        missing_normals |= normal.is_none();
        let next = mesh.vertices.len() as u32;
        let index = *lookup.entry((position, normal)).or_insert_with(|| {
            mesh.vertices.push(Vertex {
                position: positions[position].to_array(),
                normal: normal.map(|n| normals[n]).unwrap_or(Vec3::ZERO).to_array(),
            });
            next
        });
        mesh.indices.push(index);
    }

    if missing_normals {
        rebuild_normals(&mut mesh);
    }
    Ok(mesh)
}

#[derive(Debug, Clone, Copy)]
struct Corner {
    position: i64,
    normal: Option<i64>,
}

fn parse_corner(token: &str) -> Result<Corner> {
    let mut fields = token.split('/');
    let position = fields
        .next()
        .ok_or_else(|| anyhow!("missing vertex index"))?
        .parse::<i64>()?;
    let _texcoord = fields.next();
    let normal = match fields.next() {
        Some(field) if !field.is_empty() => Some(field.parse::<i64>()?),
        _ => None,
    };
    Ok(Corner { position, normal })
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut next = || -> Result<f32> {
        Ok(parts
            .next()
            .ok_or_else(|| anyhow!("missing vector component"))?
            .parse::<f32>()?)
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

/// OBJ indices are 1-based; negative values count back from the end.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => len + i,
        _ => return None,
    };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

fn rebuild_normals(mesh: &mut MeshData) {
    let mut accum = vec![Vec3::ZERO; mesh.vertices.len()];
    for tri in mesh.indices.chunks_exact(3) {
        let [a, b, c] =
            [tri[0], tri[1], tri[2]].map(|i| Vec3::from(mesh.vertices[i as usize].position));
        if let Some(normal) = (b - a).cross(c - a).try_normalize() {
            for &i in tri {
                accum[i as usize] += normal;
            }
        }
    }
    for (vertex, normal) in mesh.vertices.iter_mut().zip(accum) {
        if Vec3::from(vertex.normal) == Vec3::ZERO {
            vertex.normal = normal.normalize_or_zero().to_array();
        }
    }
}
